//! Operations: single callable invocations.
//!
//! An [`Operation`] wraps a [`CallTarget`] together with its node options.
//! Running it merges its scope overlay, resolves alias targets, binds the
//! declared arguments against the incoming stream and calls the target.
//! Failures of the user's callable are logged and re-raised as
//! [`CallableError`] with the operation stack attached.

mod assign;
mod options;
mod target;

pub use assign::Assigner;
pub use options::{NodeOptions, OptionsChecker};
pub use target::{Call, CallTarget, Function, MethodCall};

use crate::binder::{ArgumentBinder, BindRequest};
use crate::core::{CheckStrategy, Method, ObjectRef, Value};
use crate::directives::ArgList;
use crate::errors::{BindingError, CallableError, FlowResult, StateError};
use crate::observability::{format_error, FlowLogger, TracingLogger};
use crate::reflect::{Arguments, ParameterReflector, Reflect};
use crate::state::StateMap;

/// Stack reported before any operation has finished.
pub const INITIAL_RUN: &str = "INITIAL RUN";

/// What an operation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutput {
    /// The call result, or the updated objects after an assignment.
    pub result: Value,
    /// Unconsumed stream elements.
    pub leftover: Option<Vec<Value>>,
    /// The stack the operation ran under.
    pub stack: String,
}

/// Inherited settings an operation runs with.
pub(crate) struct OperationContext<'a> {
    pub branch_stack: Option<&'a str>,
    pub last_operation: &'a str,
    pub state: Option<&'a StateMap>,
    pub hide_logging: bool,
    pub check_all: bool,
    pub logger: &'a dyn FlowLogger,
}

/// A callable node.
#[derive(Debug, Clone)]
pub struct Operation {
    target: CallTarget,
    options: NodeOptions,
}

impl Operation {
    /// Creates an operation for a call target.
    pub fn new(target: impl Into<CallTarget>) -> Self {
        Self {
            target: target.into(),
            options: NodeOptions::default(),
        }
    }

    /// Sets the node name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    /// Sets the stream used when no data arrives.
    #[must_use]
    pub fn def_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options.def_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Writes the result into shared-state fields.
    #[must_use]
    pub fn assign<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.assign = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    /// Hides the argument summary from the logs.
    #[must_use]
    pub fn hide_logging(mut self, hide: bool) -> Self {
        self.options.hide_logging = Some(hide);
        self
    }

    /// Chooses between checking every container item or only the first.
    #[must_use]
    pub fn check_type_strategy_all(mut self, all: bool) -> Self {
        self.options.check_type_strategy_all = Some(all);
        self
    }

    /// Opens a distribution buffer with this operation's result.
    #[must_use]
    pub fn distribute_input_data(mut self) -> Self {
        self.options.distribute_input_data = true;
        self
    }

    /// Closes the distribution buffer after this operation.
    #[must_use]
    pub fn stop_distribution(mut self) -> Self {
        self.options.stop_distribution = true;
        self
    }

    /// Discards whatever the call did not consume.
    #[must_use]
    pub fn burn_rem_args(mut self) -> Self {
        self.options.burn_rem_args = true;
        self
    }

    /// Fails when the operation receives no data.
    #[must_use]
    pub fn raise_err_if_empty_data(mut self) -> Self {
        self.options.raise_err_if_empty_data = true;
        self
    }

    /// Merges a shared-state overlay for this operation only.
    #[must_use]
    pub fn state(mut self, overlay: StateMap) -> Self {
        self.options.state = Some(overlay);
        self
    }

    /// The call target.
    pub fn target(&self) -> &CallTarget {
        &self.target
    }

    /// The node options.
    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    pub(crate) fn options_mut(&mut self) -> &mut NodeOptions {
        &mut self.options
    }

    /// Runs the operation on its own, logging through `tracing`.
    pub fn run(&self, stream: Vec<Value>) -> FlowResult<(Value, Option<Vec<Value>>)> {
        self.run_with_logger(stream, &TracingLogger)
    }

    /// Runs the operation on its own with the given logger.
    pub fn run_with_logger(
        &self,
        stream: Vec<Value>,
        logger: &dyn FlowLogger,
    ) -> FlowResult<(Value, Option<Vec<Value>>)> {
        let context = OperationContext {
            branch_stack: None,
            last_operation: INITIAL_RUN,
            state: None,
            hide_logging: false,
            check_all: true,
            logger,
        };
        let output = self.execute(&context, stream)?;
        Ok((output.result, output.leftover))
    }

    /// The stack this operation reports under a branch.
    pub(crate) fn stack(&self, branch_stack: Option<&str>, resolved: Option<&ObjectRef>) -> String {
        let name = self
            .options
            .name
            .clone()
            .unwrap_or_else(|| self.target.entity_name(resolved));
        match branch_stack {
            Some(branch) => format!("{branch} -> {name}"),
            None => name,
        }
    }

    /// Runs the checks that need no data: exclusive flags and every known
    /// signature against its declared arguments.
    ///
    /// Alias targets only get the flag checks; their object is only known at
    /// run time.
    pub(crate) fn check_static(&self, branch_stack: Option<&str>) -> FlowResult<()> {
        let stack = self.stack(branch_stack, None);
        OptionsChecker::check_flags(&stack, &self.options)?;
        if matches!(self.target, CallTarget::AliasPath { .. }) {
            return Ok(());
        }

        let method_signature = |owner: Option<Method>| {
            owner.and_then(|m| ParameterReflector::reflect(&m, m.is_bound()))
        };
        let checks = match &self.target {
            CallTarget::Function { function, call } => {
                vec![(ParameterReflector::reflect(function, false), call)]
            }
            CallTarget::Constructor {
                class,
                init,
                method,
            } => {
                let mut checks = vec![(ParameterReflector::reflect(class, false), init)];
                if let Some(method) = method {
                    checks.push((method_signature(class.method(&method.name).cloned()), &method.call));
                }
                checks
            }
            CallTarget::Instance { instance, method } => {
                vec![(method_signature(instance.method(&method.name)), &method.call)]
            }
            CallTarget::AliasPath { .. } => Vec::new(),
        };

        for (signature, call) in checks {
            if let Some(signature) = signature {
                ArgumentBinder::check(&stack, &signature, call)?;
            }
        }
        Ok(())
    }

    fn invoker<'a>(
        &self,
        context: &'a OperationContext<'_>,
        stack: &'a str,
        scope: &'a StateMap,
    ) -> Invoker<'a> {
        Invoker {
            stack,
            scope,
            hide_logging: self.options.hide_logging.unwrap_or(context.hide_logging),
            strategy: CheckStrategy::from_flag(
                self.options
                    .check_type_strategy_all
                    .unwrap_or(context.check_all),
            ),
            logger: context.logger,
        }
    }

    pub(crate) fn execute(
        &self,
        context: &OperationContext<'_>,
        stream: Vec<Value>,
    ) -> FlowResult<OperationOutput> {
        OptionsChecker::check_name(self.options.name.as_deref(), context.last_operation)?;

        let entry_stack = self.stack(context.branch_stack, None);
        OptionsChecker::check_flags(&entry_stack, &self.options)?;
        let scope = StateMap::merged(&entry_stack, context.state, self.options.state.as_ref())?;

        let (result, mut leftover, stack) = match &self.target {
            CallTarget::Function { function, call } => {
                let invoker = self.invoker(context, &entry_stack, &scope);
                let (args, leftover) = invoker.bind(function, false, function.name(), call, stream)?;
                let result = invoker.call("An error occurred while calling entity.", || {
                    function.call(&args)
                })?;
                (result, leftover, entry_stack)
            }
            CallTarget::Constructor {
                class,
                init,
                method,
            } => {
                let invoker = self.invoker(context, &entry_stack, &scope);
                let (args, leftover) = invoker.bind(class, false, class.name(), init, stream)?;
                let instance = invoker.call(
                    &format!(
                        "An error occurred when trying to initialize class {}",
                        class.name()
                    ),
                    || class.construct(&args),
                )?;
                context.logger.info(&format!(
                    "Operation: {entry_stack}. The class: {} has been successfully initialized.",
                    class.name()
                ));
                let (result, leftover) = match method {
                    None => (Value::Object(instance), leftover),
                    Some(method) => invoker.call_method(
                        &instance,
                        class.name(),
                        method,
                        leftover.unwrap_or_default(),
                    )?,
                };
                (result, leftover, entry_stack)
            }
            CallTarget::Instance { instance, method } => {
                let (result, leftover) = self
                    .invoker(context, &entry_stack, &scope)
                    .call_method(instance, instance.type_name(), method, stream)?;
                (result, leftover, entry_stack)
            }
            CallTarget::AliasPath { path, method } => {
                let instance = resolve_alias(&entry_stack, path, &method.name, &scope)?;
                let stack = self.stack(context.branch_stack, Some(&instance));
                let (result, leftover) = self
                    .invoker(context, &stack, &scope)
                    .call_method(&instance, path, method, stream)?;
                (result, leftover, stack)
            }
        };

        if self.options.burn_rem_args {
            leftover = None;
        }

        if let Some(targets) = &self.options.assign {
            return Ok(OperationOutput {
                result: Assigner::assign(&stack, targets, &scope, result)?,
                leftover: None,
                stack,
            });
        }

        Ok(OperationOutput {
            result,
            leftover,
            stack,
        })
    }
}

fn resolve_alias(
    stack: &str,
    path: &str,
    method: &str,
    scope: &StateMap,
) -> FlowResult<ObjectRef> {
    let alias = path.split('.').next().unwrap_or_default();
    if scope.get(alias).is_none() {
        return Err(StateError::NoSuchAlias {
            alias: alias.to_string(),
            existing: scope.aliases(),
        }
        .scoped(stack)
        .into());
    }
    match scope.resolve(path).map_err(|e| e.scoped(stack))? {
        Some(Value::Object(obj)) => Ok(obj),
        other => Err(StateError::MissingAttribute {
            alias: path.to_string(),
            type_name: other.unwrap_or_default().type_name().to_string(),
            field: method.to_string(),
        }
        .scoped(stack)
        .into()),
    }
}

/// Binds and calls on behalf of one operation run.
struct Invoker<'a> {
    stack: &'a str,
    scope: &'a StateMap,
    hide_logging: bool,
    strategy: CheckStrategy,
    logger: &'a dyn FlowLogger,
}

impl Invoker<'_> {
    fn bind(
        &self,
        target: &dyn Reflect,
        drop_first: bool,
        entity: &str,
        call: &ArgList,
        stream: Vec<Value>,
    ) -> FlowResult<(Arguments, Option<Vec<Value>>)> {
        let signature = ParameterReflector::reflect(target, drop_first).ok_or_else(|| {
            BindingError::NotIntrospectable {
                stack: self.stack.to_string(),
                entity: entity.to_string(),
            }
        })?;

        let bound = ArgumentBinder::bind(BindRequest {
            stack: self.stack,
            signature: &signature,
            call,
            stream,
            state: self.scope,
            strategy: self.strategy,
        })?;
        self.logger.info(&bound.describe(self.stack, self.hide_logging));

        let arguments = signature
            .arrange(bound.args, bound.kwargs)
            .map_err(|e| BindingError::Arrangement {
                stack: self.stack.to_string(),
                reason: e.to_string(),
            })?;
        Ok((arguments, bound.leftover))
    }

    fn call<T>(
        &self,
        context: &str,
        f: impl FnOnce() -> anyhow::Result<T>,
    ) -> FlowResult<T> {
        f().map_err(|error| {
            self.logger.error(&format_error(
                &format!("Operation: {}. {context}", self.stack),
                &error,
            ));
            CallableError::new(self.stack, context, error).into()
        })
    }

    fn call_method(
        &self,
        instance: &ObjectRef,
        owner: &str,
        method: &MethodCall,
        stream: Vec<Value>,
    ) -> FlowResult<(Value, Option<Vec<Value>>)> {
        let callable = instance.method(&method.name).ok_or_else(|| {
            StateError::MissingAttribute {
                alias: owner.to_string(),
                type_name: instance.type_name().to_string(),
                field: method.name.clone(),
            }
            .scoped(self.stack)
        })?;
        let entity = format!("{owner}.{}", method.name);
        let (args, leftover) =
            self.bind(&callable, callable.is_bound(), &entity, &method.call, stream)?;
        let result = self.call("An error occurred while calling entity.", || {
            callable.invoke(instance, &args)
        })?;
        Ok((result, leftover))
    }
}
