//! Alias-to-object scopes and their merge rules.

use super::bags::{is_default_bag, ReadWriteBag, WriteOnceBag};
use crate::core::{Object, ObjectRef, Value};
use crate::errors::StateError;

/// Alias the default [`WriteOnceBag`] is registered under.
pub const DEFAULT_WRITE_ONCE_ALIAS: &str = "val";
/// Alias the default [`ReadWriteBag`] is registered under.
pub const DEFAULT_READ_WRITE_ALIAS: &str = "var";

/// An ordered mapping from aliases to shared objects.
///
/// Within a merged scope every object type appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateMap {
    entries: Vec<(String, ObjectRef)>,
}

impl StateMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object under an alias.
    #[must_use]
    pub fn with(mut self, alias: impl Into<String>, object: impl Object) -> Self {
        self.insert(alias, ObjectRef::new(object));
        self
    }

    /// Adds a shared handle under an alias.
    #[must_use]
    pub fn with_ref(mut self, alias: impl Into<String>, object: ObjectRef) -> Self {
        self.insert(alias, object);
        self
    }

    /// Inserts or replaces an alias, keeping its position.
    pub fn insert(&mut self, alias: impl Into<String>, object: ObjectRef) {
        let alias = alias.into();
        match self.entries.iter_mut().find(|(a, _)| *a == alias) {
            Some(entry) => entry.1 = object,
            None => self.entries.push((alias, object)),
        }
    }

    /// Looks up an alias.
    pub fn get(&self, alias: &str) -> Option<&ObjectRef> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, obj)| obj)
    }

    /// All aliases in order.
    pub fn aliases(&self) -> Vec<String> {
        self.entries.iter().map(|(a, _)| a.clone()).collect()
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObjectRef)> {
        self.entries.iter().map(|(a, obj)| (a.as_str(), obj))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an object of this type is registered.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.entries.iter().any(|(_, obj)| obj.type_name() == type_name)
    }

    fn entries_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a (String, ObjectRef)> {
        self.entries
            .iter()
            .filter(move |(_, obj)| obj.type_name() == type_name)
    }

    /// The default write-once bag, if present.
    pub fn write_once(&self) -> Option<&WriteOnceBag> {
        self.entries
            .iter()
            .find_map(|(_, obj)| obj.downcast_ref::<WriteOnceBag>())
    }

    /// The default read-write bag, if present.
    pub fn read_write(&self) -> Option<&ReadWriteBag> {
        self.entries
            .iter()
            .find_map(|(_, obj)| obj.downcast_ref::<ReadWriteBag>())
    }

    /// Checks the map as an overlay: valid aliases and unique types.
    pub fn validate(&self) -> Result<(), StateError> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.entries.len());
        for (alias, obj) in &self.entries {
            if alias.is_empty() || alias.contains('.') {
                return Err(StateError::InvalidAlias {
                    alias: alias.clone(),
                });
            }
            let type_name = obj.type_name();
            if seen.contains(&type_name) {
                return Err(StateError::DuplicateType {
                    type_name: type_name.to_string(),
                });
            }
            seen.push(type_name);
        }
        Ok(())
    }

    /// Merges an overlay into the current scope.
    ///
    /// For each type the overlay's entries win. Missing default bags are
    /// created. An overlay that is present but empty keeps only the
    /// default bags.
    pub fn merged(
        stack: &str,
        current: Option<&StateMap>,
        overlay: Option<&StateMap>,
    ) -> Result<StateMap, StateError> {
        if let Some(overlay) = overlay {
            overlay.validate().map_err(|e| e.scoped(stack))?;
        }

        let empty = Self::new();
        let current = current.unwrap_or(&empty);
        let option = overlay.unwrap_or(&empty);

        let mut result = Self::new();
        for (_, obj) in current.entries.iter().chain(&option.entries) {
            let type_name = obj.type_name();
            if result.has_type(type_name) {
                continue;
            }
            let source = if option.has_type(type_name) { option } else { current };
            for (alias, obj) in source.entries_of(type_name) {
                result.insert(alias.clone(), obj.clone());
            }
        }

        if !result.has_type(WriteOnceBag::TYPE_NAME) {
            result.insert(DEFAULT_WRITE_ONCE_ALIAS, ObjectRef::new(WriteOnceBag::new()));
        }
        if !result.has_type(ReadWriteBag::TYPE_NAME) {
            result.insert(DEFAULT_READ_WRITE_ALIAS, ObjectRef::new(ReadWriteBag::new()));
        }
        if overlay.is_some_and(Self::is_empty) {
            result.entries.retain(|(_, obj)| is_default_bag(obj));
        }

        Ok(result)
    }

    /// Replaces the default bags with independent copies.
    ///
    /// Used on entering a nested branch, so the child's writes stay local.
    #[must_use]
    pub fn renewed(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(alias, obj)| {
                let obj = if is_default_bag(obj) {
                    obj.deep_copy()
                } else {
                    obj.clone()
                };
                (alias.clone(), obj)
            })
            .collect();
        Self { entries }
    }

    /// Forks every object that supports it.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(alias, obj)| (alias.clone(), obj.deep_copy()))
                .collect(),
        }
    }

    /// Resolves a dotted path `alias.field[.field...]`.
    ///
    /// Returns `Ok(None)` when the alias is not registered.
    pub fn resolve(&self, path: &str) -> Result<Option<Value>, StateError> {
        let mut parts = path.split('.');
        let alias = parts.next().unwrap_or_default();
        let Some(root) = self.get(alias) else {
            return Ok(None);
        };

        let mut current = Value::Object(root.clone());
        for field in parts {
            current = match &current {
                Value::Object(obj) => obj.get_attr(field),
                Value::Map(map) => map.get(field).cloned(),
                _ => None,
            }
            .ok_or_else(|| StateError::MissingAttribute {
                alias: alias.to_string(),
                type_name: current.type_name().to_string(),
                field: field.to_string(),
            })?;
        }
        Ok(Some(current))
    }
}
