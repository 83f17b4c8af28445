//! # Branchflow
//!
//! Composable pipelines of plain callables with automatic argument wiring.
//!
//! A [`Branch`](branch::Branch) is an ordered list of operations and nested
//! branches. The result of each node becomes the input stream of the next,
//! and Branchflow binds that stream to the callee's parameters for you:
//!
//! - **Argument binding**: positional and keyword directives pull values
//!   from the stream, from shared state, or from defaults
//! - **Shared state**: write-once and read-write bags travel with the stream
//!   and can be addressed by dotted paths
//! - **Distribution**: feed a stream to the following nodes item by item,
//!   buffering their results until `stop_distribution` releases them together
//! - **Parallel dispatch**: run independent branches on a bounded pool
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use branchflow::prelude::*;
//!
//! let branch = Branch::new("totals")
//!     .node(Call::function(parse).arg(m()))
//!     .node(Operation::new(Call::function(price).arg(m())).distribute_input_data())
//!     .node(Call::function(sum).arg(m().seq()));
//!
//! let total = branch.run(Some(Value::from("3,4,5")))?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod binder;
pub mod branch;
pub mod core;
pub mod directives;
pub mod errors;
pub mod observability;
pub mod operation;
pub mod parallel;
pub mod reflect;
pub mod state;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::branch::{Branch, ExecutorConfig, Node};
    pub use crate::core::{Class, Instance, Object, ObjectRef, TypeTag, Value};
    pub use crate::directives::{m, opt, Arg, Directive};
    pub use crate::errors::{FlowError, FlowResult};
    pub use crate::observability::{
        init_tracing, CollectingLogger, FlowLogger, LogFormat, NoOpLogger, TracingLogger,
    };
    pub use crate::operation::{Call, CallTarget, Function, Operation};
    pub use crate::parallel::{Dispatcher, DispatcherConfig, Workers};
    pub use crate::reflect::{Arguments, Signature};
    pub use crate::state::{ReadWriteBag, StateMap, WriteOnceBag};
}
