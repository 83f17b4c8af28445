//! Separates scope objects and the stop marker from a result stream.

use super::scope::StateMap;
use crate::core::Value;

/// A stream after scope objects have been taken out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedData {
    /// Elements that remain data.
    pub data: Vec<Value>,
    /// Whether the stop marker was present.
    pub stop: bool,
}

/// Sorts result streams between data and shared state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultParser;

impl ResultParser {
    /// Removes every object whose type is registered in `scope` and
    /// re-registers it under the alias holding that type.
    ///
    /// Objects of unknown types stay in the data.
    pub fn sort(stream: Vec<Value>, scope: &mut StateMap) -> SortedData {
        let mut data = Vec::with_capacity(stream.len());
        let mut stop = false;

        for item in stream {
            match item {
                Value::Stop => stop = true,
                Value::Object(obj) => {
                    let alias = scope
                        .iter()
                        .find(|(_, held)| held.type_name() == obj.type_name())
                        .map(|(alias, _)| alias.to_string());
                    match alias {
                        Some(alias) => scope.insert(alias, obj),
                        None => data.push(Value::Object(obj)),
                    }
                }
                other => data.push(other),
            }
        }

        SortedData { data, stop }
    }
}
