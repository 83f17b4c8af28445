//! Testing utilities for branchflow pipelines.
//!
//! This module provides:
//! - Sample functions and classes
//! - Recording callables
//! - Assertions for results and errors

mod assertions;
pub mod fixtures;
mod mocks;

pub use assertions::{
    assert_error_contains, assert_failed, assert_stream, assert_succeeded, assert_user_error,
};
pub use mocks::RecordingFunction;
