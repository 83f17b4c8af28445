//! Argument directives.
//!
//! A directive is a declarative placeholder standing in for an argument:
//! it says whether the value is required, where it comes from, and which
//! type it must have. [`m`] and [`opt`] start mandatory and optional
//! directives; builders refine them.
//!
//! ```rust,ignore
//! use branchflow::prelude::*;
//!
//! let first_int = m().of(TypeTag::Int);
//! let third = opt().at(3);
//! let from_state = m().link("val.user_id");
//! let rest = opt().of(TypeTag::Str).seq();
//! ```

use crate::core::{ObjectRef, TypeTag, Value};
use std::fmt;

/// Whether a directive must be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Missing data is an error.
    Mandatory,
    /// Missing data falls back to the parameter default.
    Optional,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mandatory => f.write_str("mandatory"),
            Self::Optional => f.write_str("optional"),
        }
    }
}

/// Where a directive draws its value from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// The next unconsumed stream element.
    NextInStream,
    /// A one-based index into the incoming stream.
    FixedPosition(usize),
    /// A dotted path into shared state.
    StateLink(String),
}

/// A placeholder argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    requirement: Requirement,
    source: Source,
    expected: Vec<TypeTag>,
    sequence: bool,
}

/// Starts a mandatory directive.
pub fn m() -> Directive {
    Directive::new(Requirement::Mandatory)
}

/// Starts an optional directive.
pub fn opt() -> Directive {
    Directive::new(Requirement::Optional)
}

impl Directive {
    /// Creates an untyped directive reading the next stream element.
    pub fn new(requirement: Requirement) -> Self {
        Self {
            requirement,
            source: Source::NextInStream,
            expected: Vec::new(),
            sequence: false,
        }
    }

    /// Expects a single type.
    #[must_use]
    pub fn of(mut self, tag: TypeTag) -> Self {
        self.expected = vec![tag];
        self
    }

    /// Expects several types, one stream element each.
    #[must_use]
    pub fn of_many(mut self, tags: impl IntoIterator<Item = TypeTag>) -> Self {
        self.expected = tags.into_iter().collect();
        self
    }

    /// Reads the element at a one-based stream position.
    #[must_use]
    pub fn at(mut self, position: usize) -> Self {
        self.source = Source::FixedPosition(position);
        self
    }

    /// Reads a dotted path from shared state.
    #[must_use]
    pub fn link(mut self, path: impl Into<String>) -> Self {
        self.source = Source::StateLink(path.into());
        self
    }

    /// Absorbs a run of stream elements into a variadic slot.
    #[must_use]
    pub fn seq(mut self) -> Self {
        self.sequence = true;
        self
    }

    /// Requirement level.
    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    /// Value source.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Expected types.
    pub fn expected(&self) -> &[TypeTag] {
        &self.expected
    }

    /// The single expected type, if exactly one is declared.
    pub fn expected_type(&self) -> Option<&TypeTag> {
        match self.expected.as_slice() {
            [tag] => Some(tag),
            _ => None,
        }
    }

    /// Whether the directive absorbs a run of elements.
    pub fn is_sequence(&self) -> bool {
        self.sequence
    }

    /// Whether the directive is optional.
    pub fn is_optional(&self) -> bool {
        self.requirement == Requirement::Optional
    }

    /// Whether the value comes from the incoming stream.
    pub fn draws_from_stream(&self) -> bool {
        matches!(self.source, Source::NextInStream | Source::FixedPosition(_))
    }

    /// Checks constraints that hold regardless of the slot.
    ///
    /// Returns the reason the directive is malformed.
    pub fn validate(&self) -> Option<String> {
        match (&self.source, self.sequence) {
            (Source::FixedPosition(0), _) => {
                Some("the position should start from 1".to_string())
            }
            (Source::FixedPosition(_), true) => {
                Some("a sequence cannot be combined with a fixed position".to_string())
            }
            (Source::StateLink(path), _) if path.is_empty() => {
                Some("the link must be a non-empty path".to_string())
            }
            (Source::StateLink(_), true) => {
                Some("a sequence cannot be combined with a link".to_string())
            }
            _ => None,
        }
    }

    /// Checks constraints for a keyword slot.
    pub fn validate_for_keyword(&self) -> Option<String> {
        self.validate().or_else(|| {
            if self.sequence {
                Some("a sequence is not allowed for keyword arguments".to_string())
            } else if self.expected.len() > 1 {
                Some("multiple types are not allowed for keyword arguments".to_string())
            } else {
                None
            }
        })
    }

    /// Returns a copy expecting exactly `tag`, keeping other settings.
    #[must_use]
    pub(crate) fn narrowed(&self, tag: &TypeTag) -> Self {
        Self {
            expected: vec![tag.clone()],
            sequence: false,
            ..self.clone()
        }
    }
}

/// A declared argument: a literal or a directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Passed as is, except a string naming a scope alias.
    Literal(Value),
    /// Filled by the binder.
    Directive(Directive),
}

impl Arg {
    /// Kind label for error messages.
    pub fn type_label(&self) -> String {
        match self {
            Self::Literal(value) => value.type_name().to_string(),
            Self::Directive(d) => format!("{} directive", d.requirement()),
        }
    }

    /// The directive, if any.
    pub fn as_directive(&self) -> Option<&Directive> {
        match self {
            Self::Directive(d) => Some(d),
            Self::Literal(_) => None,
        }
    }
}

impl From<Directive> for Arg {
    fn from(d: Directive) -> Self {
        Self::Directive(d)
    }
}

macro_rules! literal_arg {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Self::Literal(Value::from(v))
                }
            }
        )+
    };
}

literal_arg!(Value, bool, i64, i32, f64, &str, String, ObjectRef, ());

/// Positional and keyword arguments declared on a call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgList {
    /// Positional arguments in order.
    pub args: Vec<Arg>,
    /// Keyword arguments in declaration order.
    pub kwargs: Vec<(String, Arg)>,
}

impl ArgList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, arg: impl Into<Arg>) -> Self {
        self.kwargs.push((name.into(), arg.into()));
        self
    }

    /// Whether no argument is declared.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    /// Every directive with its keyword name, positional ones first.
    pub fn directives(&self) -> impl Iterator<Item = (Option<&str>, &Directive)> {
        self.args
            .iter()
            .filter_map(|a| a.as_directive().map(|d| (None, d)))
            .chain(
                self.kwargs
                    .iter()
                    .filter_map(|(n, a)| a.as_directive().map(|d| (Some(n.as_str()), d))),
            )
    }
}
