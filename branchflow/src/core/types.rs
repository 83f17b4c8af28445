//! Expected-type tags checked by typed directives.

use super::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How container contents are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CheckStrategy {
    /// Every element must match.
    #[default]
    AllItems,
    /// Only the first element is checked.
    FirstItem,
}

impl CheckStrategy {
    /// Maps the `check_type_strategy_all` flag onto a strategy.
    pub fn from_flag(all: bool) -> Self {
        if all {
            Self::AllItems
        } else {
            Self::FirstItem
        }
    }
}

/// A structural type a value can be checked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Matches anything.
    Any,
    /// Matches only [`Value::None`].
    NoneType,
    /// `bool`.
    Bool,
    /// `int`.
    Int,
    /// `float`.
    Float,
    /// `str`.
    Str,
    /// `bytes`.
    Bytes,
    /// A list whose items match the inner tag.
    List(Box<TypeTag>),
    /// A tuple whose items match the inner tag.
    Tuple(Box<TypeTag>),
    /// A map whose values match the inner tag.
    Map(Box<TypeTag>),
    /// An object with the given type name.
    Instance(String),
    /// Any of the listed tags.
    Union(Vec<TypeTag>),
}

impl TypeTag {
    /// `list[inner]`.
    pub fn list(inner: TypeTag) -> Self {
        Self::List(Box::new(inner))
    }

    /// `tuple[inner, ...]`.
    pub fn tuple(inner: TypeTag) -> Self {
        Self::Tuple(Box::new(inner))
    }

    /// `map[str, inner]`.
    pub fn map(inner: TypeTag) -> Self {
        Self::Map(Box::new(inner))
    }

    /// An object type by name.
    pub fn instance(name: impl Into<String>) -> Self {
        Self::Instance(name.into())
    }

    /// A union of tags.
    pub fn union(tags: impl IntoIterator<Item = TypeTag>) -> Self {
        Self::Union(tags.into_iter().collect())
    }

    /// Checks a value against this tag.
    pub fn matches(&self, value: &Value, strategy: CheckStrategy) -> bool {
        match (self, value) {
            (Self::Any, _)
            | (Self::NoneType, Value::None)
            | (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::Str, Value::Str(_))
            | (Self::Bytes, Value::Bytes(_)) => true,
            (Self::List(inner), Value::List(items)) | (Self::Tuple(inner), Value::Tuple(items)) => {
                Self::items_match(inner, items.iter(), strategy)
            }
            (Self::Map(inner), Value::Map(map)) => Self::items_match(inner, map.values(), strategy),
            (Self::Instance(name), Value::Object(obj)) => obj.type_name() == name,
            (Self::Union(tags), v) => tags.iter().any(|tag| tag.matches(v, strategy)),
            _ => false,
        }
    }

    fn items_match<'a>(
        inner: &TypeTag,
        mut items: impl Iterator<Item = &'a Value>,
        strategy: CheckStrategy,
    ) -> bool {
        match strategy {
            CheckStrategy::AllItems => items.all(|item| inner.matches(item, strategy)),
            CheckStrategy::FirstItem => items
                .next()
                .map_or(true, |first| inner.matches(first, strategy)),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::NoneType => f.write_str("None"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Bytes => f.write_str("bytes"),
            Self::List(inner) => write!(f, "list[{inner}]"),
            Self::Tuple(inner) => write!(f, "tuple[{inner}, ...]"),
            Self::Map(inner) => write!(f, "map[str, {inner}]"),
            Self::Instance(name) => f.write_str(name),
            Self::Union(tags) => {
                let names: Vec<String> = tags.iter().map(ToString::to_string).collect();
                write!(f, "Union[{}]", names.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert!(TypeTag::Int.matches(&Value::Int(1), CheckStrategy::AllItems));
        assert!(!TypeTag::Int.matches(&Value::Float(1.0), CheckStrategy::AllItems));
        assert!(TypeTag::Any.matches(&Value::None, CheckStrategy::AllItems));
    }

    #[test]
    fn test_container_strategies() {
        let tag = TypeTag::list(TypeTag::Int);
        let value = Value::list([Value::Int(1), Value::Int(2), Value::from("3")]);
        assert!(tag.matches(&value, CheckStrategy::FirstItem));
        assert!(!tag.matches(&value, CheckStrategy::AllItems));
        assert!(tag.matches(&Value::List(Vec::new()), CheckStrategy::AllItems));
    }

    #[test]
    fn test_union() {
        let tag = TypeTag::union([TypeTag::Int, TypeTag::Str]);
        assert!(tag.matches(&Value::from("a"), CheckStrategy::AllItems));
        assert!(!tag.matches(&Value::Bool(true), CheckStrategy::AllItems));
        assert_eq!(tag.to_string(), "Union[int, str]");
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeTag::list(TypeTag::Int).to_string(), "list[int]");
        assert_eq!(TypeTag::map(TypeTag::Str).to_string(), "map[str, str]");
    }
}
