//! Argument binding.
//!
//! The binder takes a callable's signature, the arguments declared on the
//! call (literals and directives), the incoming data stream and the scope,
//! and produces the final positional values, keyword values and the
//! unconsumed rest of the stream.
//!
//! Binding runs in two phases. Planning aligns declared arguments to
//! parameters and rejects malformed declarations; it needs no data and is
//! also used to validate a branch before it runs. Filling then reads fixed
//! positions and links, draws the remaining directives from the stream in
//! order (positional slots first, keyword slots after), applies defaults
//! and checks types.

mod layout;
#[cfg(test)]
mod binder_tests;

use crate::core::{CheckStrategy, TypeTag, Value, NOT_EXPANDED};
use crate::directives::{Arg, ArgList, Directive, Requirement, Source};
use crate::errors::{BindingError, FlowResult, SlotName};
use crate::reflect::Signature;
use crate::state::StateMap;
use layout::{Layout, SlotPlan};
use std::collections::{BTreeMap, VecDeque};

/// Everything the binder needs for one call.
#[derive(Debug)]
pub struct BindRequest<'a> {
    /// Operation stack used in errors and logs.
    pub stack: &'a str,
    /// Parameters of the callable.
    pub signature: &'a Signature,
    /// Declared arguments.
    pub call: &'a ArgList,
    /// Incoming data stream.
    pub stream: Vec<Value>,
    /// Scope for links and alias literals.
    pub state: &'a StateMap,
    /// How typed containers are checked.
    pub strategy: CheckStrategy,
}

/// The outcome of binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundCall {
    /// Positional values in call order.
    pub args: Vec<Value>,
    /// Keyword values.
    pub kwargs: BTreeMap<String, Value>,
    /// Unconsumed stream elements, `None` when everything was used.
    pub leftover: Option<Vec<Value>>,
}

impl BoundCall {
    /// Describes the call for the operation log.
    pub fn describe(&self, stack: &str, hide_details: bool) -> String {
        let mut message = format!("Operation: {stack}");
        if hide_details {
            return message;
        }

        let args = self
            .args
            .iter()
            .map(Value::type_name)
            .collect::<Vec<_>>()
            .join(", ");
        let kwargs = self
            .kwargs
            .iter()
            .map(|(k, v)| format!("{k}: {}", v.type_name()))
            .collect::<Vec<_>>()
            .join(", ");

        message.push_str(&match (self.args.is_empty(), self.kwargs.is_empty()) {
            (true, true) => {
                "\nThe call will be made without positional or keyword arguments.".to_string()
            }
            (false, true) => format!(
                "\nThe call will be made with positional arguments: ({args}) and without keyword arguments."
            ),
            (true, false) => format!(
                "\nThe call will be made with keyword arguments: {{{kwargs}}} and without positional arguments."
            ),
            (false, false) => format!(
                "\nThe call will be made with positional arguments: ({args}) and keyword arguments: {{{kwargs}}}."
            ),
        });
        message
    }
}

#[derive(Debug, Clone)]
enum Entry {
    /// Nothing declared; the parameter default applies.
    Default,
    /// A literal value.
    Ready(Value),
    /// Waiting for the next stream element.
    Pending(Directive),
    /// Filled from a position, a link or the stream.
    Resolved {
        directive: Directive,
        value: Option<Value>,
    },
}

#[derive(Debug, Clone)]
struct Slot {
    name: SlotName,
    variadic: bool,
    default: Option<Value>,
    entry: Entry,
}

impl Slot {
    fn draw(self, stream: &mut VecDeque<Value>) -> Self {
        match self.entry {
            Entry::Pending(directive) => Self {
                entry: Entry::Resolved {
                    directive,
                    value: stream.pop_front(),
                },
                ..self
            },
            _ => self,
        }
    }

    fn outcome(self) -> Outcome {
        match self.entry {
            Entry::Default => self
                .default
                .map_or(Outcome::Missing(Requirement::Mandatory), |v| Outcome::Value(v, None)),
            Entry::Ready(value) => Outcome::Value(value, None),
            Entry::Resolved {
                directive,
                value: Some(value),
            } => Outcome::Value(value, directive.expected_type().cloned()),
            Entry::Resolved {
                directive,
                value: None,
            }
            | Entry::Pending(directive) => match (directive.requirement(), self.default) {
                (Requirement::Optional, Some(default)) => Outcome::Value(default, None),
                (Requirement::Optional, None) if self.variadic => Outcome::Skip,
                (requirement, _) => Outcome::Missing(requirement),
            },
        }
    }
}

enum Outcome {
    Value(Value, Option<TypeTag>),
    Skip,
    Missing(Requirement),
}

/// Stream elements addressable by one-based position until drawing starts.
struct Positions(Vec<Option<Value>>);

impl Positions {
    fn take(&mut self, position: usize) -> Option<Value> {
        position
            .checked_sub(1)
            .and_then(|index| self.0.get_mut(index))
            .and_then(Option::take)
    }

    fn into_stream(self) -> VecDeque<Value> {
        self.0.into_iter().flatten().collect()
    }
}

/// Binds declared arguments to a callable's parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentBinder;

impl ArgumentBinder {
    /// Runs the data-independent checks only.
    pub fn check(stack: &str, signature: &Signature, call: &ArgList) -> Result<(), BindingError> {
        Layout::plan(stack, signature.params(), call).map(|_| ())
    }

    /// Binds a call.
    pub fn bind(request: BindRequest<'_>) -> FlowResult<BoundCall> {
        let BindRequest {
            stack,
            signature,
            call,
            stream,
            state,
            strategy,
        } = request;

        let layout = Layout::plan(stack, signature.params(), call)?;
        let len = stream.len();
        let mut positions = Positions(stream.into_iter().map(Some).collect());

        let arg_slots = resolve_slots(stack, layout.args, &mut positions, state)?;
        let kw_slots = resolve_slots(stack, layout.kwargs, &mut positions, state)?;

        let mut stream = positions.into_stream();
        let mut bound = Vec::with_capacity(arg_slots.len());
        let mut counter = 0;
        for slot in arg_slots {
            if !slot.variadic {
                bound.push(slot.draw(&mut stream));
                continue;
            }
            match slot.entry {
                Entry::Pending(directive) => {
                    expand_variadic(&directive, &mut stream, &mut counter, &mut bound);
                }
                entry => {
                    counter += 1;
                    bound.push(Slot {
                        name: SlotName::Variadic(counter),
                        entry,
                        ..slot
                    });
                }
            }
        }
        let kw_bound: Vec<Slot> = kw_slots.into_iter().map(|s| s.draw(&mut stream)).collect();

        let mut missing = Vec::new();
        let mut mismatches = Vec::new();
        let mut check = |name: &SlotName, value: &Value, tag: Option<TypeTag>| {
            if let Some(tag) = tag {
                if !tag.matches(value, strategy) {
                    mismatches.push((name.clone(), value.type_name().to_string(), tag.to_string()));
                }
            }
        };

        let mut args = Vec::with_capacity(bound.len());
        for slot in bound {
            let name = slot.name.clone();
            match slot.outcome() {
                Outcome::Value(value, tag) => {
                    check(&name, &value, tag);
                    args.push(value);
                }
                Outcome::Skip => {}
                Outcome::Missing(requirement) => missing.push((name, requirement.to_string())),
            }
        }

        let mut kwargs = BTreeMap::new();
        for slot in kw_bound {
            let name = slot.name.clone();
            match slot.outcome() {
                Outcome::Value(value, tag) => {
                    check(&name, &value, tag);
                    if let SlotName::Named(key) = name {
                        kwargs.insert(key, value);
                    }
                }
                Outcome::Skip => {}
                Outcome::Missing(requirement) => missing.push((name, requirement.to_string())),
            }
        }

        if !missing.is_empty() {
            return Err(BindingError::NotEnoughData {
                stack: stack.to_string(),
                len,
                slots: missing,
            }
            .into());
        }
        if !mismatches.is_empty() {
            return Err(BindingError::TypeMismatch {
                stack: stack.to_string(),
                mismatches,
            }
            .into());
        }

        let leftover = if stream.is_empty() {
            None
        } else {
            Some(stream.into_iter().collect())
        };
        Ok(BoundCall {
            args,
            kwargs,
            leftover,
        })
    }
}

fn resolve_slots(
    stack: &str,
    plans: Vec<SlotPlan<'_>>,
    positions: &mut Positions,
    state: &StateMap,
) -> FlowResult<Vec<Slot>> {
    plans
        .into_iter()
        .map(|plan| {
            Ok(Slot {
                entry: resolve_entry(stack, plan.arg, positions, state)?,
                name: plan.name,
                variadic: plan.variadic,
                default: plan.default.cloned(),
            })
        })
        .collect()
}

fn resolve_entry(
    stack: &str,
    arg: Option<&Arg>,
    positions: &mut Positions,
    state: &StateMap,
) -> FlowResult<Entry> {
    let Some(arg) = arg else {
        return Ok(Entry::Default);
    };
    let directive = match arg {
        Arg::Literal(Value::Str(alias)) => {
            return Ok(Entry::Ready(
                state
                    .get(alias)
                    .map_or_else(|| Value::Str(alias.clone()), |obj| Value::Object(obj.clone())),
            ));
        }
        Arg::Literal(value) => return Ok(Entry::Ready(value.clone())),
        Arg::Directive(directive) => directive.clone(),
    };

    let value = match directive.source() {
        Source::NextInStream => return Ok(Entry::Pending(directive)),
        Source::FixedPosition(position) => positions.take(*position),
        Source::StateLink(path) => match state.resolve(path) {
            Ok(Some(value)) => Some(value),
            Ok(None) if directive.is_optional() => Some(Value::from(NOT_EXPANDED)),
            Ok(None) => {
                return Err(BindingError::UnresolvedLink {
                    stack: stack.to_string(),
                    link: path.clone(),
                    existing: state.aliases(),
                }
                .into())
            }
            Err(err) => return Err(err.scoped(stack).into()),
        },
    };
    Ok(Entry::Resolved { directive, value })
}

fn expand_variadic(
    directive: &Directive,
    stream: &mut VecDeque<Value>,
    counter: &mut usize,
    out: &mut Vec<Slot>,
) {
    let mut push = |directive: Directive, value: Option<Value>| {
        *counter += 1;
        out.push(Slot {
            name: SlotName::Variadic(*counter),
            variadic: true,
            default: None,
            entry: Entry::Resolved { directive, value },
        });
    };

    match (directive.expected(), directive.is_sequence()) {
        ([], false) => push(directive.clone(), stream.pop_front()),
        ([], true) => {
            while let Some(value) = stream.pop_front() {
                push(directive.clone(), Some(value));
            }
        }
        (tags, false) => {
            for tag in tags {
                push(directive.narrowed(tag), stream.pop_front());
            }
        }
        ([tag, ..], true) => {
            let mut matched = false;
            while let Some(value) = stream.pop_front() {
                if tag.matches(&value, CheckStrategy::AllItems) {
                    push(directive.narrowed(tag), Some(value));
                    matched = true;
                } else {
                    stream.push_front(value);
                    break;
                }
            }
            if !matched {
                push(directive.clone(), None);
            }
        }
    }
}
