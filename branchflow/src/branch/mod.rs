//! Branches: ordered trees of operations.
//!
//! A [`Branch`] runs its nodes front to back. Each node's result becomes
//! the next node's stream, unless the distribution protocol is collecting
//! results. Nested branches get their own scope, built from a renewed copy
//! of the parent's default bags merged with the branch's overlay.
//!
//! # Example
//!
//! ```rust,ignore
//! use branchflow::prelude::*;
//!
//! let result = Branch::new("job")
//!     .node(Call::function(read()))
//!     .node(Operation::new(Call::function(split()).arg(m())).distribute_input_data())
//!     .node(Call::function(clean()).arg(m()))
//!     .node(Operation::new(Call::function(clean()).arg(m())).stop_distribution())
//!     .node(Call::function(write()).arg(m().seq()))
//!     .run(None)?;
//! ```

mod config;
mod executor;
#[cfg(test)]
mod branch_tests;

pub use config::ExecutorConfig;

use crate::core::Value;
use crate::errors::{EmptyBranchError, FlowResult};
use crate::observability::{FlowLogger, SpanTimer, TracingLogger};
use crate::operation::{Call, CallTarget, NodeOptions, Operation};
use crate::state::StateMap;
use executor::Executor;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Name used for branches that were not given one.
pub const UNNAMED_BRANCH: &str = "BRANCH NAME NOT DEFINED";

/// A node of a branch tree.
#[derive(Debug, Clone)]
pub enum Node {
    /// A single call.
    Operation(Operation),
    /// A nested branch.
    Branch(Branch),
}

impl Node {
    /// The node's options.
    pub fn options(&self) -> &NodeOptions {
        match self {
            Self::Operation(op) => op.options(),
            Self::Branch(branch) => &branch.options,
        }
    }

    fn deep_copy(&self) -> Self {
        match self {
            Self::Operation(op) => {
                let mut op = op.clone();
                let state = op.options().state.as_ref().map(StateMap::deep_copy);
                op.options_mut().state = state;
                Self::Operation(op)
            }
            Self::Branch(branch) => Self::Branch(branch.deep_copy()),
        }
    }
}

impl From<Operation> for Node {
    fn from(op: Operation) -> Self {
        Self::Operation(op)
    }
}

impl From<Branch> for Node {
    fn from(branch: Branch) -> Self {
        Self::Branch(branch)
    }
}

impl From<Call> for Node {
    fn from(call: Call) -> Self {
        Self::Operation(Operation::new(call))
    }
}

impl From<CallTarget> for Node {
    fn from(target: CallTarget) -> Self {
        Self::Operation(Operation::new(target))
    }
}

/// An ordered list of nodes sharing one scope.
#[derive(Clone, Default)]
pub struct Branch {
    nodes: Vec<Node>,
    options: NodeOptions,
    logger: Option<Arc<dyn FlowLogger>>,
    config: ExecutorConfig,
}

impl Branch {
    /// Creates an empty branch.
    pub fn new(name: impl Into<String>) -> Self {
        Self::default().with_name(name)
    }

    /// Renames the branch.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    /// Appends a node.
    #[must_use]
    pub fn node(mut self, node: impl Into<Node>) -> Self {
        self.nodes.push(node.into());
        self
    }

    /// Appends several nodes.
    #[must_use]
    pub fn nodes<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    /// Sets the stream used when the branch receives no data.
    ///
    /// An empty list makes the branch start with an empty stream.
    #[must_use]
    pub fn def_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options.def_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Writes the final result into shared-state fields.
    #[must_use]
    pub fn assign<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.assign = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    /// Requires every node to receive data.
    #[must_use]
    pub fn all_operations_must_be_executed(mut self, value: bool) -> Self {
        self.options.all_operations_must_be_executed = Some(value);
        self
    }

    /// Hides argument summaries of the nodes below.
    #[must_use]
    pub fn hide_logging(mut self, hide: bool) -> Self {
        self.options.hide_logging = Some(hide);
        self
    }

    /// Chooses the container check strategy for the nodes below.
    #[must_use]
    pub fn check_type_strategy_all(mut self, all: bool) -> Self {
        self.options.check_type_strategy_all = Some(all);
        self
    }

    /// Opens distribution at the branch's first node.
    #[must_use]
    pub fn distribute_input_data(mut self) -> Self {
        self.options.distribute_input_data = true;
        self
    }

    /// Fails when the branch receives no data.
    #[must_use]
    pub fn raise_err_if_empty_data(mut self) -> Self {
        self.options.raise_err_if_empty_data = true;
        self
    }

    /// Merges a shared-state overlay into the branch scope.
    #[must_use]
    pub fn state(mut self, overlay: StateMap) -> Self {
        self.options.state = Some(overlay);
        self
    }

    /// Sets the logger. Nested branches inherit it unless they set their own.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn FlowLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets the root defaults for inheritable options.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// The branch name.
    pub fn name(&self) -> &str {
        self.options.name.as_deref().unwrap_or(UNNAMED_BRANCH)
    }

    /// The nodes in order.
    pub fn nodes_ref(&self) -> &[Node] {
        &self.nodes
    }

    /// The branch options.
    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    /// The root defaults.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Copies the branch with every shared-state overlay forked.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self {
            nodes: self.nodes.iter().map(Node::deep_copy).collect(),
            options: NodeOptions {
                state: self.options.state.as_ref().map(StateMap::deep_copy),
                ..self.options.clone()
            },
            logger: self.logger.clone(),
            config: self.config,
        }
    }

    /// Checks the tree without running anything: empty branches,
    /// exclusive flags and declared arguments of every known signature.
    pub fn validate(&self) -> FlowResult<()> {
        self.validate_under(None)
    }

    fn validate_under(&self, parent: Option<&str>) -> FlowResult<()> {
        let stack = match parent {
            Some(parent) => format!("{parent} -> {}", self.name()),
            None => self.name().to_string(),
        };
        if self.nodes.is_empty() {
            return Err(EmptyBranchError::new(stack).into());
        }
        for node in &self.nodes {
            match node {
                Node::Operation(op) => op.check_static(Some(&stack))?,
                Node::Branch(child) => child.validate_under(Some(&stack))?,
            }
        }
        Ok(())
    }

    /// Runs the branch.
    ///
    /// `None` input starts the first node with its default arguments, or
    /// with an empty stream. Returns the last node's result, `Value::None`
    /// when data ran out, or `Value::Stop` when a node asked to stop.
    pub fn run(&self, input: Option<Value>) -> FlowResult<Value> {
        let run_id = Uuid::now_v7();
        let span = tracing::info_span!("branch_run", %run_id, branch = %self.name());
        let _entered = span.enter();
        let timer = SpanTimer::start(self.name());

        self.validate()?;
        let logger: &dyn FlowLogger = self.logger.as_deref().unwrap_or(&TracingLogger);
        let outcome = Executor::new(logger).run_root(self, input);

        tracing::debug!(
            elapsed_ms = timer.elapsed_ms(),
            success = outcome.is_ok(),
            "Branch run finished"
        );
        outcome.map(|outcome| outcome.result)
    }
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("name", &self.name())
            .field("nodes", &self.nodes)
            .field("options", &self.options)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
