//! Test assertions for branch results and errors.

use crate::core::Value;
use crate::errors::{FlowError, FlowResult};

/// Asserts that a result is a tuple holding exactly `expected`.
pub fn assert_stream(value: &Value, expected: &[Value]) {
    match value {
        Value::Tuple(items) => assert_eq!(
            items.as_slice(),
            expected,
            "Expected stream {expected:?}, got {items:?}"
        ),
        other => panic!("Expected a tuple stream, got {other:?}"),
    }
}

/// Asserts that a run succeeded and returns its value.
pub fn assert_succeeded<T: std::fmt::Debug>(result: FlowResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected success, got error:\n{err}"),
    }
}

/// Asserts that a run failed and returns the error.
pub fn assert_failed<T: std::fmt::Debug>(result: FlowResult<T>) -> FlowError {
    match result {
        Ok(value) => panic!("Expected an error, got {value:?}"),
        Err(err) => err,
    }
}

/// Asserts that an error message contains `needle`.
pub fn assert_error_contains(err: &FlowError, needle: &str) {
    let message = err.to_string();
    assert!(
        message.contains(needle),
        "Expected error containing {needle:?}, got:\n{message}"
    );
}

/// Asserts that a run failed inside a user callable with error type `E`.
pub fn assert_user_error<T, E>(result: FlowResult<T>) -> FlowError
where
    T: std::fmt::Debug,
    E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
{
    let err = assert_failed(result);
    match &err {
        FlowError::Callable(callable) => assert!(
            callable.downcast_ref::<E>().is_some(),
            "Expected user error of type {}, got {}",
            std::any::type_name::<E>(),
            callable.source_error()
        ),
        other => panic!("Expected a callable error, got {other}"),
    }
    err
}
