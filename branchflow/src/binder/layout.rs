//! Static planning: which declared argument lands in which slot.
//!
//! Everything here depends only on the signature and the declared
//! arguments, so it can run before a branch starts.

use crate::core::Value;
use crate::directives::{Arg, ArgList, Directive, Requirement};
use crate::errors::{BindingError, SlotName};
use crate::reflect::{ParamKind, ParameterDescriptor};

/// One slot of the call, with the argument declared for it.
#[derive(Debug, Clone)]
pub(crate) struct SlotPlan<'a> {
    pub name: SlotName,
    pub variadic: bool,
    pub default: Option<&'a Value>,
    pub arg: Option<&'a Arg>,
}

impl SlotPlan<'_> {
    fn directive(&self) -> Option<&Directive> {
        self.arg.and_then(Arg::as_directive)
    }
}

/// Positional slots (named, then variadic) and keyword slots.
#[derive(Debug, Clone)]
pub(crate) struct Layout<'a> {
    pub args: Vec<SlotPlan<'a>>,
    pub kwargs: Vec<SlotPlan<'a>>,
}

impl<'a> Layout<'a> {
    /// Aligns declared arguments to parameters and runs the static checks.
    pub fn plan(
        stack: &str,
        params: &'a [ParameterDescriptor],
        call: &'a ArgList,
    ) -> Result<Self, BindingError> {
        let kinds = enrich(params, call);
        check_kwargs(stack, params, &kinds, call)?;
        check_args(stack, params, &kinds, call)?;

        let layout = Self::align(params, &kinds, call);
        layout.check_containers(stack)?;
        layout.check_order(stack)?;
        Ok(layout)
    }

    fn align(params: &'a [ParameterDescriptor], kinds: &[ParamKind], call: &'a ArgList) -> Self {
        let mut declared = call.args.iter();
        let mut args = Vec::new();

        for (param, kind) in params.iter().zip(kinds) {
            if kind.is_positional() {
                args.push(SlotPlan {
                    name: SlotName::named(param.name()),
                    variadic: false,
                    default: param.default(),
                    arg: declared.next(),
                });
            } else if *kind == ParamKind::VarPositional && !names_kwarg(call, param.name()) {
                for (index, arg) in declared.by_ref().enumerate() {
                    args.push(SlotPlan {
                        name: SlotName::Variadic(index + 1),
                        variadic: true,
                        default: None,
                        arg: Some(arg),
                    });
                }
            }
        }

        let mut kwargs: Vec<SlotPlan<'a>> = call
            .kwargs
            .iter()
            .map(|(name, arg)| {
                let param = params.iter().find(|p| p.name() == name);
                SlotPlan {
                    name: SlotName::named(name),
                    variadic: param.map_or(true, |p| p.kind().is_variadic()),
                    default: param.and_then(ParameterDescriptor::default),
                    arg: Some(arg),
                }
            })
            .collect();

        kwargs.extend(
            params
                .iter()
                .zip(kinds)
                .filter(|(p, k)| **k == ParamKind::KeywordOnly && !names_kwarg(call, p.name()))
                .map(|(p, _)| SlotPlan {
                    name: SlotName::named(p.name()),
                    variadic: false,
                    default: p.default(),
                    arg: None,
                }),
        );

        Self { args, kwargs }
    }

    fn check_containers(&self, stack: &str) -> Result<(), BindingError> {
        let mut invalid = Vec::new();
        for slot in &self.args {
            let Some(directive) = slot.directive() else {
                continue;
            };
            let reason = directive.validate().or_else(|| {
                let several = directive.expected().len() > 1;
                match (slot.variadic, directive.is_sequence()) {
                    (false, true) => Some(
                        "a sequence is allowed only for the variadic positional parameter".to_string(),
                    ),
                    (false, false) if several => Some(
                        "multiple types are allowed only for the variadic positional parameter"
                            .to_string(),
                    ),
                    (true, true) if several => {
                        Some("a sequence accepts a single expected type".to_string())
                    }
                    _ => None,
                }
            });
            if let Some(reason) = reason {
                invalid.push((slot.name.clone(), reason));
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(BindingError::InvalidContainers {
                stack: stack.to_string(),
                slots: invalid,
            })
        }
    }

    fn check_order(&self, stack: &str) -> Result<(), BindingError> {
        let mut optional_seen = false;
        let mut offending = Vec::new();

        for slot in self.args.iter().chain(&self.kwargs) {
            let Some(directive) = slot.directive() else {
                continue;
            };
            if !directive.draws_from_stream() {
                continue;
            }
            match directive.requirement() {
                Requirement::Optional => optional_seen = true,
                Requirement::Mandatory if optional_seen => offending.push(slot.name.clone()),
                Requirement::Mandatory => {}
            }
        }

        if offending.is_empty() {
            Ok(())
        } else {
            Err(BindingError::MandatoryAfterOptional {
                stack: stack.to_string(),
                slots: offending,
            })
        }
    }
}

fn names_kwarg(call: &ArgList, name: &str) -> bool {
    call.kwargs.iter().any(|(n, _)| n == name)
}

/// Once a parameter is supplied by keyword, every later positional
/// parameter can only be supplied by keyword too.
fn enrich(params: &[ParameterDescriptor], call: &ArgList) -> Vec<ParamKind> {
    let mut keyword_seen = false;
    params
        .iter()
        .map(|param| {
            keyword_seen |= names_kwarg(call, param.name());
            if keyword_seen && param.kind().is_positional() {
                ParamKind::KeywordOnly
            } else {
                param.kind()
            }
        })
        .collect()
}

fn check_kwargs(
    stack: &str,
    params: &[ParameterDescriptor],
    kinds: &[ParamKind],
    call: &ArgList,
) -> Result<(), BindingError> {
    let invalid: Vec<(SlotName, String)> = call
        .kwargs
        .iter()
        .filter_map(|(name, arg)| {
            arg.as_directive()
                .and_then(Directive::validate_for_keyword)
                .map(|reason| (SlotName::named(name), reason))
        })
        .collect();
    if !invalid.is_empty() {
        return Err(BindingError::IncorrectKwargs {
            stack: stack.to_string(),
            slots: invalid,
        });
    }

    if !kinds.contains(&ParamKind::VarKeyword) {
        let unused: Vec<(String, String)> = call
            .kwargs
            .iter()
            .filter(|(name, _)| !params.iter().any(|p| p.name() == name))
            .map(|(name, arg)| (name.clone(), arg.type_label()))
            .collect();
        if !unused.is_empty() {
            return Err(BindingError::UnusedKwargs {
                stack: stack.to_string(),
                kwargs: unused,
            });
        }
    }

    let missing: Vec<String> = params
        .iter()
        .zip(kinds)
        .filter(|(p, k)| {
            **k == ParamKind::KeywordOnly && !p.has_default() && !names_kwarg(call, p.name())
        })
        .map(|(p, _)| p.name().to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(BindingError::MissingKwargs {
            stack: stack.to_string(),
            names: missing,
        })
    }
}

fn check_args(
    stack: &str,
    params: &[ParameterDescriptor],
    kinds: &[ParamKind],
    call: &ArgList,
) -> Result<(), BindingError> {
    let mut remaining = call.args.len();
    let mut missing = Vec::new();

    for (param, kind) in params.iter().zip(kinds) {
        if !kind.is_positional() {
            continue;
        }
        if remaining == 0 {
            if !param.has_default() {
                missing.push(param.name().to_string());
            }
        } else {
            remaining -= 1;
        }
    }

    let var_positional = params
        .iter()
        .zip(kinds)
        .any(|(p, k)| *k == ParamKind::VarPositional && !names_kwarg(call, p.name()));
    if remaining > 0 && !var_positional {
        return Err(BindingError::UnusedArgs {
            stack: stack.to_string(),
            types: call.args[call.args.len() - remaining..]
                .iter()
                .map(Arg::type_label)
                .collect(),
        });
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(BindingError::MissingArgs {
            stack: stack.to_string(),
            names: missing,
        })
    }
}
