//! Thread-safe state bags shared by the operations of a branch.

use crate::core::{Object, ObjectRef, Value};
use crate::errors::StateError;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;

/// A bag whose fields are written once and then only read.
///
/// Only immutable scalars and tuples of them are accepted, so a stored
/// value can never change behind a reader's back.
#[derive(Debug, Default)]
pub struct WriteOnceBag {
    data: RwLock<BTreeMap<String, Value>>,
}

impl WriteOnceBag {
    /// Type name used for scope identity.
    pub const TYPE_NAME: &'static str = "WriteOnceBag";

    /// Creates a new empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.data.read().get(field).cloned()
    }

    /// Checks if a field exists.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.data.read().contains_key(field)
    }

    /// Writes a field.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Overwrite` if the field is already set and
    /// `StateError::MutableValue` for values other than immutable scalars.
    pub fn set(&self, field: impl Into<String>, value: Value) -> Result<(), StateError> {
        let field = field.into();
        if !is_immutable(&value) {
            return Err(StateError::MutableValue {
                field,
                kind: value.type_name().to_string(),
            });
        }

        let mut data = self.data.write();
        if data.contains_key(&field) {
            return Err(StateError::Overwrite { field });
        }

        data.insert(field, value);
        Ok(())
    }

    /// Returns a copy of all fields.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.data.read().clone()
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

fn is_immutable(value: &Value) -> bool {
    match value {
        Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) | Value::Bytes(_) => true,
        Value::Tuple(items) => items.iter().all(is_immutable),
        _ => false,
    }
}

impl Clone for WriteOnceBag {
    fn clone(&self) -> Self {
        Self {
            data: RwLock::new(self.data.read().clone()),
        }
    }
}

impl Object for WriteOnceBag {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<(), StateError> {
        self.set(name, value)
    }

    fn fork(&self) -> Option<ObjectRef> {
        Some(ObjectRef::new(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A bag with unrestricted reads and writes.
#[derive(Debug, Default)]
pub struct ReadWriteBag {
    data: RwLock<BTreeMap<String, Value>>,
}

impl ReadWriteBag {
    /// Type name used for scope identity.
    pub const TYPE_NAME: &'static str = "ReadWriteBag";

    /// Creates a new empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.data.read().get(field).cloned()
    }

    /// Writes a field, replacing any previous value.
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        self.data.write().insert(field.into(), value.into());
    }

    /// Removes a field.
    pub fn remove(&self, field: &str) -> Option<Value> {
        self.data.write().remove(field)
    }

    /// Returns a copy of all fields.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.data.read().clone()
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Clone for ReadWriteBag {
    fn clone(&self) -> Self {
        let data = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.deep_copy()))
            .collect();
        Self {
            data: RwLock::new(data),
        }
    }
}

impl Object for ReadWriteBag {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<(), StateError> {
        self.set(name, value);
        Ok(())
    }

    fn fork(&self) -> Option<ObjectRef> {
        Some(ObjectRef::new(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Whether the object is one of the two default bags.
pub fn is_default_bag(obj: &ObjectRef) -> bool {
    matches!(
        obj.type_name(),
        WriteOnceBag::TYPE_NAME | ReadWriteBag::TYPE_NAME
    )
}
