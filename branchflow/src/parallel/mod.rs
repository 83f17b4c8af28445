//! Parallel dispatch of independent branches.
//!
//! Branches never share a worker and never share state: the [`Dispatcher`]
//! deep-copies each branch and its input, runs it to completion on a
//! blocking worker, and joins the results in submission order.
//!
//! # Example
//!
//! ```rust,ignore
//! use branchflow::prelude::*;
//!
//! let dispatcher = Dispatcher::new(DispatcherConfig::default().with_workers("2".parse()?));
//! let results = dispatcher
//!     .run_job("trusted_to_enriched", table_branches, None, &[table_ids])
//!     .await?;
//! ```

mod dispatcher;
mod sequences;

pub use dispatcher::{Dispatcher, DispatcherConfig, Workers};
pub use sequences::{
    add_sequences, check_sequence_lengths, create_init_data_sequence, update_branch_names,
};
