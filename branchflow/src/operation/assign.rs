//! Writing results into shared-state fields.

use crate::core::{ObjectRef, Value};
use crate::errors::{AssignmentError, FlowResult};
use crate::state::StateMap;
use regex::Regex;
use std::sync::OnceLock;

static IDENTIFIER: OnceLock<Option<Regex>> = OnceLock::new();

fn is_identifier(field: &str) -> bool {
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(field))
}

/// Writes a node's result into `alias.field[.field...]` targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct Assigner;

impl Assigner {
    /// Checks that every target is well formed and its alias exists.
    pub fn check_targets(
        stack: &str,
        targets: &[String],
        scope: &StateMap,
    ) -> Result<(), AssignmentError> {
        for target in targets {
            let mut parts = target.split('.');
            let alias = parts.next().unwrap_or_default();
            if scope.get(alias).is_none() {
                return Err(AssignmentError::MissingAlias {
                    stack: stack.to_string(),
                    alias: alias.to_string(),
                    existing: scope.aliases(),
                });
            }
        }
        for target in targets {
            let fields: Vec<&str> = target.split('.').skip(1).collect();
            if fields.is_empty() {
                return Err(AssignmentError::MissingField {
                    stack: stack.to_string(),
                    target: target.clone(),
                });
            }
            if let Some(field) = fields.iter().find(|f| !is_identifier(f)) {
                return Err(AssignmentError::InvalidField {
                    stack: stack.to_string(),
                    field: (*field).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Assigns the items of `result` to `targets` in order.
    ///
    /// Returns a tuple of the updated root objects, one per alias, which
    /// flows on as the node's result.
    pub fn assign(
        stack: &str,
        targets: &[String],
        scope: &StateMap,
        result: Value,
    ) -> FlowResult<Value> {
        Self::check_targets(stack, targets, scope)?;
        if result.is_none() {
            return Err(AssignmentError::AbsentResult {
                stack: stack.to_string(),
            }
            .into());
        }
        let values = result.into_stream();
        if values.len() != targets.len() {
            return Err(AssignmentError::ArityMismatch {
                stack: stack.to_string(),
                found: values.len(),
                expected: targets.len(),
            }
            .into());
        }

        let mut updated: Vec<ObjectRef> = Vec::new();
        for (target, value) in targets.iter().zip(values) {
            let mut parts = target.split('.');
            let alias = parts.next().unwrap_or_default();
            let fields: Vec<&str> = parts.collect();
            let Some(root) = scope.get(alias) else {
                continue;
            };

            let mut holder = root.clone();
            if let Some((last, path)) = fields.split_last() {
                for field in path {
                    holder = match holder.get_attr(field) {
                        Some(Value::Object(next)) => next,
                        other => {
                            return Err(AssignmentError::NotAnObject {
                                stack: stack.to_string(),
                                field: (*field).to_string(),
                                kind: other.unwrap_or_default().type_name().to_string(),
                            }
                            .into())
                        }
                    };
                }
                holder
                    .set_attr(last, value)
                    .map_err(|e| e.scoped(stack))?;
            }

            if !updated.iter().any(|obj| obj.ptr_eq(root)) {
                updated.push(root.clone());
            }
        }

        Ok(Value::Tuple(updated.into_iter().map(Value::Object).collect()))
    }
}
