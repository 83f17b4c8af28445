//! Core domain model types for branchflow.
//!
//! This module contains the fundamental types used throughout the framework:
//! - The dynamic [`Value`] passed between operations
//! - Type tags for checking values
//! - The object model backing shared state and class instances

mod instance;
mod object;
mod types;
mod value;

pub use instance::{Class, Instance};
pub use object::{Method, Object, ObjectRef};
pub use types::{CheckStrategy, TypeTag};
pub use value::{Value, NOT_EXPANDED, STOP_MARKER};
