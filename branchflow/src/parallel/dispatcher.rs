//! Bounded fan-out of independent branches.

use super::sequences::{create_init_data_sequence, update_branch_names};
use crate::branch::Branch;
use crate::core::Value;
use crate::errors::{DispatchError, FlowError, FlowResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle};
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// How many branches may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Workers {
    /// One worker per branch.
    #[default]
    Max,
    /// A fixed number of workers.
    Fixed(usize),
}

impl Workers {
    /// Number of workers for a batch of `branches`.
    pub fn count(self, branches: usize) -> usize {
        match self {
            Self::Max => branches.max(1),
            Self::Fixed(n) => n.max(1),
        }
    }
}

impl FromStr for Workers {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("max") {
            return Ok(Self::Max);
        }
        match s.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(Self::Fixed(n)),
            _ => Err(DispatchError::InvalidWorkers(s.to_string())),
        }
    }
}

impl TryFrom<String> for Workers {
    type Error = DispatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Workers> for String {
    fn from(workers: Workers) -> Self {
        workers.to_string()
    }
}

impl fmt::Display for Workers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Max => write!(f, "max"),
            Self::Fixed(n) => write!(f, "{n}"),
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Pool size.
    #[serde(default)]
    pub workers: Workers,
}

impl DispatcherConfig {
    /// Sets the pool size.
    #[must_use]
    pub fn with_workers(mut self, workers: Workers) -> Self {
        self.workers = workers;
        self
    }
}

/// Runs independent branches on a bounded pool of blocking workers.
///
/// Every branch and every input is deep-copied before it is handed to a
/// worker, so shared-state bags are never shared between workers.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Creates a dispatcher.
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Runs every branch with its input.
    ///
    /// Waits for every worker, then returns the results in submission order
    /// or the first error in submission order.
    pub async fn run(&self, branches: &[Branch], inputs: &[Option<Value>]) -> FlowResult<Vec<Value>> {
        if branches.len() != inputs.len() {
            return Err(DispatchError::UnequalLengths {
                lengths: vec![branches.len(), inputs.len()],
            }
            .into());
        }

        let workers = self.config.workers.count(branches.len());
        let semaphore = Arc::new(Semaphore::new(workers));
        tracing::info!(branches = branches.len(), workers, "Dispatching branches");

        let mut handles = Vec::with_capacity(branches.len());
        for (branch, input) in branches.iter().zip(inputs) {
            let branch = branch.deep_copy();
            let input = input.as_ref().map(Value::deep_copy);
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| DispatchError::Runtime(e.to_string()))?;
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                branch.run(input)
            }));
        }

        let joined = futures::future::join_all(handles).await;
        let mut results = Vec::with_capacity(joined.len());
        let mut first_error: Option<FlowError> = None;
        for (index, outcome) in joined.into_iter().enumerate() {
            let outcome = outcome.map_err(|e| worker_failure(index, e));
            match outcome.and_then(|result| result) {
                Ok(value) => results.push(value),
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        tracing::info!(workers, "Dispatcher finished processing");
        match first_error {
            Some(err) => Err(err),
            None => Ok(results),
        }
    }

    /// Runs a named batch: prefixes every branch name with `job` and builds
    /// each input from `for_all` and the matching items of `for_each`.
    pub async fn run_job(
        &self,
        job: &str,
        branches: Vec<Branch>,
        for_all: Option<&Value>,
        for_each: &[Vec<Value>],
    ) -> FlowResult<Vec<Value>> {
        let branches = update_branch_names(job, branches);
        let inputs: Vec<Option<Value>> = create_init_data_sequence(branches.len(), for_all, for_each)?
            .into_iter()
            .map(Some)
            .collect();
        self.run(&branches, &inputs).await
    }

    /// Runs every branch on a runtime owned by this call.
    ///
    /// Fails with [`DispatchError::InsideRuntime`] when called from async code.
    pub fn run_blocking(&self, branches: &[Branch], inputs: &[Option<Value>]) -> FlowResult<Vec<Value>> {
        if Handle::try_current().is_ok() {
            return Err(DispatchError::InsideRuntime.into());
        }
        let runtime = Builder::new_multi_thread()
            .max_blocking_threads(self.config.workers.count(branches.len()))
            .enable_all()
            .build()
            .map_err(|e| DispatchError::Runtime(e.to_string()))?;
        runtime.block_on(self.run(branches, inputs))
    }
}

fn worker_failure(index: usize, error: JoinError) -> FlowError {
    let message = if error.is_panic() {
        panic_message(error.into_panic())
    } else {
        error.to_string()
    };
    DispatchError::WorkerPanicked { index, message }.into()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
