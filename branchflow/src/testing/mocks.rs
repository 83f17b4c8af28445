//! Recording callables for testing.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::core::Value;
use crate::operation::Function;
use crate::reflect::{Arguments, Signature};

/// A function that records every call and returns a configurable value.
#[derive(Debug, Clone)]
pub struct RecordingFunction {
    name: String,
    signature: Signature,
    output: Arc<Mutex<Value>>,
    calls: Arc<Mutex<Vec<Arguments>>>,
}

impl RecordingFunction {
    /// Creates a recorder returning `Value::None`.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            signature,
            output: Arc::new(Mutex::new(Value::None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sets the value returned by later calls.
    #[must_use]
    pub fn returning(self, value: impl Into<Value>) -> Self {
        *self.output.lock() = value.into();
        self
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the arguments of every call.
    #[must_use]
    pub fn recorded_calls(&self) -> Vec<Arguments> {
        self.calls.lock().clone()
    }

    /// Builds the callable sharing this recorder's log.
    #[must_use]
    pub fn function(&self) -> Function {
        let output = Arc::clone(&self.output);
        let calls = Arc::clone(&self.calls);
        Function::new(self.name.clone(), self.signature.clone(), move |args| {
            calls.lock().push(args.clone());
            Ok(output.lock().clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_function() {
        let recorder = RecordingFunction::new("rec", Signature::new().param("x")).returning(7);
        let function = recorder.function();

        let args = Signature::new()
            .param("x")
            .arrange(vec![Value::Int(1)], Default::default())
            .unwrap();
        assert_eq!(function.call(&args).unwrap(), Value::Int(7));
        assert_eq!(recorder.call_count(), 1);
        assert_eq!(recorder.recorded_calls()[0].get("x"), Some(&Value::Int(1)));
    }
}
