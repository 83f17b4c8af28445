//! Parameter reflection.
//!
//! Callables registered with the engine declare a [`Signature`]: an ordered
//! list of parameter descriptors in the five classic kinds. The binder
//! reads it through [`ParameterReflector`], and the same signature later
//! arranges the bound values into named [`Arguments`] for the callable.

use crate::core::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// How a parameter accepts its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Only by position.
    PositionalOnly,
    /// By position or by name.
    PositionalOrKeyword,
    /// Collects remaining positional values.
    VarPositional,
    /// Only by name.
    KeywordOnly,
    /// Collects remaining named values.
    VarKeyword,
}

impl ParamKind {
    /// Whether the parameter takes a single positional value.
    pub fn is_positional(self) -> bool {
        matches!(self, Self::PositionalOnly | Self::PositionalOrKeyword)
    }

    /// Whether the parameter collects many values.
    pub fn is_variadic(self) -> bool {
        matches!(self, Self::VarPositional | Self::VarKeyword)
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    name: String,
    kind: ParamKind,
    default: Option<Value>,
}

impl ParameterDescriptor {
    /// Creates a descriptor without a default.
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter kind.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Default value, if declared.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether a default is declared.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// An ordered parameter list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<ParameterDescriptor>,
}

impl Signature {
    /// Creates an empty signature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor.
    #[must_use]
    pub fn push(mut self, descriptor: ParameterDescriptor) -> Self {
        self.params.push(descriptor);
        self
    }

    /// Appends a positional-only parameter.
    #[must_use]
    pub fn positional_only(self, name: impl Into<String>) -> Self {
        self.push(ParameterDescriptor::new(name, ParamKind::PositionalOnly))
    }

    /// Appends a positional-or-keyword parameter.
    #[must_use]
    pub fn param(self, name: impl Into<String>) -> Self {
        self.push(ParameterDescriptor::new(name, ParamKind::PositionalOrKeyword))
    }

    /// Appends a positional-or-keyword parameter with a default.
    #[must_use]
    pub fn param_with_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.push(ParameterDescriptor::new(name, ParamKind::PositionalOrKeyword).with_default(default))
    }

    /// Appends the variadic positional parameter.
    #[must_use]
    pub fn var_positional(self, name: impl Into<String>) -> Self {
        self.push(ParameterDescriptor::new(name, ParamKind::VarPositional))
    }

    /// Appends a keyword-only parameter.
    #[must_use]
    pub fn keyword_only(self, name: impl Into<String>) -> Self {
        self.push(ParameterDescriptor::new(name, ParamKind::KeywordOnly))
    }

    /// Appends a keyword-only parameter with a default.
    #[must_use]
    pub fn keyword_only_with_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.push(ParameterDescriptor::new(name, ParamKind::KeywordOnly).with_default(default))
    }

    /// Appends the variadic keyword parameter.
    #[must_use]
    pub fn var_keyword(self, name: impl Into<String>) -> Self {
        self.push(ParameterDescriptor::new(name, ParamKind::VarKeyword))
    }

    /// Prepends a `self` receiver.
    #[must_use]
    pub fn with_receiver(mut self) -> Self {
        self.params
            .insert(0, ParameterDescriptor::new("self", ParamKind::PositionalOnly));
        self
    }

    /// Returns the signature without its first parameter.
    #[must_use]
    pub fn without_first(&self) -> Self {
        Self {
            params: self.params.iter().skip(1).cloned().collect(),
        }
    }

    /// The declared parameters.
    pub fn params(&self) -> &[ParameterDescriptor] {
        &self.params
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Distributes call values over the parameters.
    pub fn arrange(
        &self,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> Result<Arguments, ArrangeError> {
        let mut values = BTreeMap::new();
        let mut positional = args.into_iter();

        for param in &self.params {
            match param.kind {
                ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword => {
                    if let Some(value) = positional.next() {
                        values.insert(param.name.clone(), value);
                    }
                }
                ParamKind::VarPositional => {
                    values.insert(param.name.clone(), Value::Tuple(positional.by_ref().collect()));
                }
                ParamKind::KeywordOnly | ParamKind::VarKeyword => {}
            }
        }

        let surplus = positional.count();
        if surplus > 0 {
            return Err(ArrangeError::TooManyPositional { surplus });
        }

        let var_keyword = self
            .params
            .iter()
            .find(|p| p.kind == ParamKind::VarKeyword)
            .map(|p| p.name.clone());
        let mut extra = BTreeMap::new();

        for (name, value) in kwargs {
            match self.get(&name) {
                Some(param) if !param.kind.is_variadic() => {
                    if values.contains_key(&name) {
                        return Err(ArrangeError::Duplicate { name });
                    }
                    values.insert(name, value);
                }
                _ if var_keyword.is_some() => {
                    extra.insert(name, value);
                }
                _ => return Err(ArrangeError::UnexpectedKeyword { name }),
            }
        }

        if let Some(name) = var_keyword {
            values.insert(name, Value::Map(extra));
        }

        for param in &self.params {
            if values.contains_key(&param.name) || param.kind.is_variadic() {
                continue;
            }
            match &param.default {
                Some(default) => {
                    values.insert(param.name.clone(), default.clone());
                }
                None => {
                    return Err(ArrangeError::Missing {
                        name: param.name.clone(),
                    })
                }
            }
        }

        Ok(Arguments { values })
    }
}

/// Why call values could not be arranged over a signature.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArrangeError {
    /// More positional values than positional parameters.
    #[error("{surplus} positional value(s) left without a parameter")]
    TooManyPositional {
        /// Count of unplaced values.
        surplus: usize,
    },
    /// A parameter received a value twice.
    #[error("the parameter \"{name}\" received multiple values")]
    Duplicate {
        /// Parameter name.
        name: String,
    },
    /// A keyword matches no parameter.
    #[error("unexpected keyword argument \"{name}\"")]
    UnexpectedKeyword {
        /// Keyword name.
        name: String,
    },
    /// A parameter without default received nothing.
    #[error("missing value for the parameter \"{name}\"")]
    Missing {
        /// Parameter name.
        name: String,
    },
}

/// Values arranged by parameter name, as seen by a callable body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: BTreeMap<String, Value>,
}

impl Arguments {
    /// Returns a value by parameter name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns a value, failing when the parameter is absent.
    pub fn value(&self, name: &str) -> anyhow::Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("no argument named \"{name}\""))
    }

    /// Returns an integer argument.
    pub fn int(&self, name: &str) -> anyhow::Result<i64> {
        let value = self.value(name)?;
        value
            .as_int()
            .ok_or_else(|| anyhow::anyhow!("argument \"{name}\" is {}, not int", value.type_name()))
    }

    /// Returns a float argument, widening integers.
    pub fn float(&self, name: &str) -> anyhow::Result<f64> {
        let value = self.value(name)?;
        value
            .as_float()
            .ok_or_else(|| anyhow::anyhow!("argument \"{name}\" is {}, not float", value.type_name()))
    }

    /// Returns a boolean argument.
    pub fn boolean(&self, name: &str) -> anyhow::Result<bool> {
        let value = self.value(name)?;
        value
            .as_bool()
            .ok_or_else(|| anyhow::anyhow!("argument \"{name}\" is {}, not bool", value.type_name()))
    }

    /// Returns a string argument.
    pub fn str(&self, name: &str) -> anyhow::Result<&str> {
        let value = self.value(name)?;
        value
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("argument \"{name}\" is {}, not str", value.type_name()))
    }

    /// Returns the items of a tuple or list argument.
    pub fn items(&self, name: &str) -> anyhow::Result<&[Value]> {
        let value = self.value(name)?;
        value
            .as_items()
            .ok_or_else(|| anyhow::anyhow!("argument \"{name}\" is {}, not a sequence", value.type_name()))
    }

    /// Returns a map argument.
    pub fn map(&self, name: &str) -> anyhow::Result<&BTreeMap<String, Value>> {
        let value = self.value(name)?;
        value
            .as_map()
            .ok_or_else(|| anyhow::anyhow!("argument \"{name}\" is {}, not map", value.type_name()))
    }

    /// Iterates over all arranged values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// Something that can describe its parameters.
pub trait Reflect {
    /// The declared signature, or `None` when the callable is opaque.
    fn signature(&self) -> Option<&Signature>;
}

/// Reads parameter lists from callables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterReflector;

impl ParameterReflector {
    /// Returns the parameters of `target`, optionally dropping the first one.
    ///
    /// Returns `None` when the target is not introspectable.
    pub fn reflect(target: &dyn Reflect, drop_first: bool) -> Option<Signature> {
        let signature = target.signature()?;
        Some(if drop_first {
            signature.without_first()
        } else {
            signature.clone()
        })
    }
}
