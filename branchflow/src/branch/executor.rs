//! The branch walk and the distribution state machine.
//!
//! A branch is either flowing, where each result becomes the next node's
//! stream, or collecting, where results pile up in a held buffer and only
//! the leftovers flow on. The buffer opens at a node flagged
//! `distribute_input_data` and is released by `stop_distribution` or by
//! the last operation of the branch.

use super::{Branch, Node};
use crate::core::Value;
use crate::errors::{
    DistributionError, EmptyBranchError, EmptyDataError, FlowResult, IncorrectParameterError,
    RemainingArgsFoundError,
};
use crate::observability::FlowLogger;
use crate::operation::{Assigner, Operation, OperationContext, OptionsChecker, INITIAL_RUN};
use crate::state::{ResultParser, StateMap};

/// What a branch walk produced.
#[derive(Debug)]
pub(super) struct BranchOutcome {
    pub result: Value,
    /// Stack of the last operation that finished successfully.
    pub last_operation: String,
}

/// Options a node takes from its parent when it leaves them unset.
#[derive(Debug, Clone, Copy)]
struct Inherited {
    all_operations: bool,
    hide_logging: bool,
    check_all: bool,
}

impl Inherited {
    fn resolve(self, branch: &Branch) -> Self {
        let options = branch.options();
        Self {
            all_operations: options
                .all_operations_must_be_executed
                .unwrap_or(self.all_operations),
            hide_logging: options.hide_logging.unwrap_or(self.hide_logging),
            check_all: options.check_type_strategy_all.unwrap_or(self.check_all),
        }
    }
}

/// Where a branch is entered from.
struct Entry<'a> {
    parent_stack: Option<&'a str>,
    scope: Option<&'a StateMap>,
    data: Option<Vec<Value>>,
    inherited: Inherited,
    last_operation: String,
    distribute: bool,
}

pub(super) struct Executor<'a> {
    logger: &'a dyn FlowLogger,
}

impl<'a> Executor<'a> {
    pub fn new(logger: &'a dyn FlowLogger) -> Self {
        Self { logger }
    }

    pub fn run_root(&self, branch: &Branch, input: Option<Value>) -> FlowResult<BranchOutcome> {
        let config = branch.config();
        let inherited = Inherited {
            all_operations: config.all_operations_must_be_executed,
            hide_logging: config.hide_logging,
            check_all: config.check_type_strategy_all,
        };

        let first_has_defaults = branch
            .nodes_ref()
            .first()
            .is_some_and(|node| node.options().def_args.is_some());
        let data = match input.and_then(to_data) {
            Some(data) => Some(data),
            None => match &branch.options().def_args {
                Some(args) => Some(args.clone()),
                None if first_has_defaults => None,
                None => Some(Vec::new()),
            },
        };

        self.run_branch(
            branch,
            self.logger,
            Entry {
                parent_stack: None,
                scope: None,
                data,
                inherited,
                last_operation: INITIAL_RUN.to_string(),
                distribute: false,
            },
        )
    }

    fn run_branch(
        &self,
        branch: &Branch,
        logger: &dyn FlowLogger,
        entry: Entry<'_>,
    ) -> FlowResult<BranchOutcome> {
        let logger: &dyn FlowLogger = branch.logger.as_deref().unwrap_or(logger);
        let mut last_operation = entry.last_operation;
        OptionsChecker::check_name(branch.options().name.as_deref(), &last_operation)?;

        let stack = match entry.parent_stack {
            Some(parent) => format!("{parent} -> {}", branch.name()),
            None => branch.name().to_string(),
        };
        if branch.nodes_ref().is_empty() {
            return Err(EmptyBranchError::new(stack).into());
        }

        let settings = entry.inherited.resolve(branch);
        let mut scope = StateMap::merged(&stack, entry.scope, branch.options().state.as_ref())?;
        let mut pending_distribute = entry.distribute || branch.options().distribute_input_data;
        let mut buffer: Option<Vec<Value>> = None;
        let mut data = entry.data;
        let mut final_result = Value::None;

        tracing::debug!(
            branch = %stack,
            nodes = branch.nodes_ref().len(),
            "Entering branch"
        );

        let count = branch.nodes_ref().len();
        for (index, node) in branch.nodes_ref().iter().enumerate() {
            let is_last = index + 1 == count;
            let options = node.options();
            let node_stack = match node {
                Node::Operation(op) => op.stack(Some(&stack), None),
                Node::Branch(_) => format!("{stack}(branch)"),
            };

            let stream = match data.take() {
                Some(stream) => stream,
                None => match &options.def_args {
                    Some(args) => args.clone(),
                    None => {
                        if settings.all_operations {
                            return Err(EmptyDataError::NotAllExecuted { stack: node_stack }.into());
                        }
                        if options.raise_err_if_empty_data {
                            return Err(EmptyDataError::NoData { stack: node_stack }.into());
                        }
                        tracing::debug!(stack = %node_stack, "No data left, branch ends early");
                        return Ok(BranchOutcome {
                            result: Value::None,
                            last_operation,
                        });
                    }
                },
            };

            let sorted = ResultParser::sort(stream, &mut scope);
            if sorted.stop {
                if settings.all_operations {
                    return Err(
                        IncorrectParameterError::StopWithAllOperations { stack: node_stack }.into(),
                    );
                }
                logger.info(&format!(
                    "Operation: {node_stack}.\nThe stop marker was received, meaning a forced stop of all further operations. The branch will return this marker as a result."
                ));
                return Ok(BranchOutcome {
                    result: Value::Stop,
                    last_operation,
                });
            }

            let result = match node {
                Node::Operation(op) => {
                    let step = Step {
                        stack: &stack,
                        scope: &scope,
                        settings,
                        logger,
                        last_operation: &last_operation,
                        is_last,
                        distribute: pending_distribute,
                    };
                    let (result, op_stack) = step.run(op, &node_stack, &mut buffer, sorted.data)?;
                    last_operation = op_stack;
                    result
                }
                Node::Branch(child) => {
                    if buffer.is_some() {
                        return Err(DistributionError::NestedBranchDuringCollection {
                            stack: node_stack,
                        }
                        .into());
                    }
                    let renewed = scope.renewed();
                    let outcome = self.run_branch(
                        child,
                        logger,
                        Entry {
                            parent_stack: Some(&stack),
                            scope: Some(&renewed),
                            data: Some(sorted.data),
                            inherited: settings,
                            last_operation: last_operation.clone(),
                            distribute: pending_distribute,
                        },
                    )?;
                    last_operation = outcome.last_operation;
                    outcome.result
                }
            };
            pending_distribute = false;

            if is_last {
                final_result = result;
            } else {
                data = to_data(result);
            }
        }

        if let Some(targets) = &branch.options().assign {
            if !final_result.is_stop() {
                final_result = Assigner::assign(&stack, targets, &scope, final_result)?;
            }
        }

        Ok(BranchOutcome {
            result: final_result,
            last_operation,
        })
    }
}

/// One operation inside a branch walk.
struct Step<'a> {
    stack: &'a str,
    scope: &'a StateMap,
    settings: Inherited,
    logger: &'a dyn FlowLogger,
    last_operation: &'a str,
    is_last: bool,
    distribute: bool,
}

impl Step<'_> {
    /// Runs the operation and applies the distribution transitions.
    ///
    /// Returns what flows to the next node and the operation's stack.
    fn run(
        &self,
        op: &Operation,
        node_stack: &str,
        buffer: &mut Option<Vec<Value>>,
        stream: Vec<Value>,
    ) -> FlowResult<(Value, String)> {
        let options = op.options();
        OptionsChecker::check_burn_during_collection(node_stack, options, buffer.is_some())?;

        let context = OperationContext {
            branch_stack: Some(self.stack),
            last_operation: self.last_operation,
            state: Some(self.scope),
            hide_logging: self.settings.hide_logging,
            check_all: self.settings.check_all,
            logger: self.logger,
        };
        let output = op.execute(&context, stream)?;
        let mut result = output.result;
        let leftover = output.leftover;

        if buffer.is_some() || options.distribute_input_data || self.distribute {
            buffer.get_or_insert_with(Vec::new).extend(result.into_stream());
            result = Value::Tuple(leftover.clone().unwrap_or_default());
        }

        if options.stop_distribution || (self.is_last && buffer.is_some()) {
            let Some(mut held) = buffer.take() else {
                return Err(DistributionError::StopWithoutCollection {
                    stack: output.stack,
                }
                .into());
            };
            result = if held.len() == 1 {
                held.remove(0)
            } else {
                Value::Tuple(held)
            };
            tracing::debug!(stack = %output.stack, "Distribution released");
        }

        if let Some(rest) = leftover {
            if buffer.is_none() {
                let types = rest.iter().map(|v| v.type_name().to_string()).collect();
                return Err(RemainingArgsFoundError::new(output.stack, types).into());
            }
        }

        Ok((result, output.stack))
    }
}

/// Turns a result into the next node's stream. `Value::None` means no data.
fn to_data(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::None => None,
        other => Some(other.into_stream()),
    }
}
