//! Error types for the branchflow framework.
//!
//! Every failure carries the operation stack that was active when it was
//! raised, so a message always points at the node that went wrong.

use std::fmt;
use thiserror::Error;

/// Result alias used across the crate.
pub type FlowResult<T> = Result<T, FlowError>;

/// The main error type for branchflow operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// An option value is invalid.
    #[error("{0}")]
    IncorrectParameter(#[from] IncorrectParameterError),

    /// A branch has no nodes.
    #[error("{0}")]
    EmptyBranch(#[from] EmptyBranchError),

    /// A node received no data when data was required.
    #[error("{0}")]
    EmptyData(#[from] EmptyDataError),

    /// The distribution protocol was misused.
    #[error("{0}")]
    Distribution(#[from] DistributionError),

    /// Data remained after an operation and nothing could absorb it.
    #[error("{0}")]
    RemainingArgsFound(#[from] RemainingArgsFoundError),

    /// Writing a result into shared state failed.
    #[error("{0}")]
    Assignment(#[from] AssignmentError),

    /// Arguments could not be bound to a callable.
    #[error("{0}")]
    Binding(#[from] BindingError),

    /// Shared state rejected a read or a write.
    #[error("{0}")]
    State(#[from] StateError),

    /// A user callable failed.
    #[error("{0}")]
    Callable(#[from] CallableError),

    /// The parallel dispatcher failed.
    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}

impl FlowError {
    /// Whether the failure belongs to the distribution protocol.
    pub fn is_distribution_error(&self) -> bool {
        matches!(self, Self::Distribution(_) | Self::RemainingArgsFound(_))
    }

    /// Returns the user error wrapped by a [`CallableError`], if any.
    pub fn user_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Callable(err) => Some(err.source_error()),
            _ => None,
        }
    }
}

/// Identifies a binding slot in error messages.
///
/// Named slots render as `'name'`, variadic positional slots as their
/// one-based index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotName {
    /// A named parameter or keyword argument.
    Named(String),
    /// An element of the variadic positional parameter.
    Variadic(usize),
}

impl SlotName {
    /// Creates a named slot.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "'{name}'"),
            Self::Variadic(index) => write!(f, "{index}"),
        }
    }
}

fn render_pairs<K: fmt::Display, V: fmt::Display>(pairs: &[(K, V)]) -> String {
    let body = pairs
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

fn render_list<T: fmt::Display>(items: &[T]) -> String {
    let body = items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{body}]")
}

/// Invalid option values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IncorrectParameterError {
    /// A node name is empty.
    #[error(
        "The last successful operation: {last_operation}. The name passed in the option must be a non-empty string."
    )]
    InvalidName {
        /// Stack of the last operation that finished successfully.
        last_operation: String,
    },

    /// The stop marker was received while every operation must run.
    #[error(
        "Operation: {stack}.\nThe stop marker was received while all operations must be executed."
    )]
    StopWithAllOperations {
        /// Operation stack.
        stack: String,
    },
}

/// Raised when a branch without nodes is run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Operation: {stack}.\nRunning a branch without operations is impossible.")]
pub struct EmptyBranchError {
    /// Stack of the empty branch.
    pub stack: String,
}

impl EmptyBranchError {
    /// Creates a new empty branch error.
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
        }
    }
}

/// Raised when data is absent where it is required.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmptyDataError {
    /// Data ran out while every operation must run.
    #[error(
        "Operation: {stack}.\nThe data was not received when all operations were\nscheduled to be performed."
    )]
    NotAllExecuted {
        /// Operation stack.
        stack: String,
    },

    /// A node that requires data received none.
    #[error(
        "Operation: {stack}.\nNo data was received, although the raise_err_if_empty_data option is set."
    )]
    NoData {
        /// Operation stack.
        stack: String,
    },
}

/// Misuse of the distribution protocol.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DistributionError {
    /// `burn_rem_args` and `distribute_input_data` on one node.
    #[error(
        "Operation: {stack}.\nThe burn_rem_args and distribute_input_data options cannot be used together."
    )]
    BurnWhileDistributing {
        /// Operation stack.
        stack: String,
    },

    /// `stop_distribution` and `distribute_input_data` on one node.
    #[error(
        "Operation: {stack}.\nThe stop_distribution and distribute_input_data options cannot be used together."
    )]
    StopWhileDistributing {
        /// Operation stack.
        stack: String,
    },

    /// `burn_rem_args` on a node inside an open distribution.
    #[error(
        "Operation: {stack}.\nThe burn_rem_args option cannot be used while results are being collected for distribution."
    )]
    BurnDuringCollection {
        /// Operation stack.
        stack: String,
    },

    /// `stop_distribution` without an open distribution.
    #[error(
        "Operation: {stack}.\nThe stop_distribution option was received, but no distribution was started."
    )]
    StopWithoutCollection {
        /// Operation stack.
        stack: String,
    },

    /// A nested branch was reached inside an open distribution.
    #[error(
        "Operation: {stack}.\nA nested branch cannot be executed while results are being collected for distribution."
    )]
    NestedBranchDuringCollection {
        /// Operation stack.
        stack: String,
    },
}

/// Leftover data that no later node can absorb.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "Operation: {stack}.\nThe following arguments remained unused after execution: {}.\nUse burn_rem_args or distribution options to consume them.",
    render_list(.types)
)]
pub struct RemainingArgsFoundError {
    /// Operation stack.
    pub stack: String,
    /// Kinds of the leftover values.
    pub types: Vec<String>,
}

impl RemainingArgsFoundError {
    /// Creates a new remaining arguments error.
    pub fn new(stack: impl Into<String>, types: Vec<String>) -> Self {
        Self {
            stack: stack.into(),
            types,
        }
    }
}

/// Failures while writing a result into shared state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignmentError {
    /// A path segment is not a valid field name.
    #[error(
        "Operation: {stack}.\nPart of string reference to an object \"{field}\" cannot be a field name."
    )]
    InvalidField {
        /// Operation stack.
        stack: String,
        /// Offending segment.
        field: String,
    },

    /// A target names only an alias.
    #[error(
        "Operation: {stack}.\nThe assignment target \"{target}\" must contain at least one field after the alias."
    )]
    MissingField {
        /// Operation stack.
        stack: String,
        /// Offending target.
        target: String,
    },

    /// A target alias is unknown in the scope.
    #[error(
        "Operation: {stack}.\nThe alias \"{alias}\" is missing from the shared state. Existing aliases: {}.",
        render_list(.existing)
    )]
    MissingAlias {
        /// Operation stack.
        stack: String,
        /// Missing alias.
        alias: String,
        /// Aliases present in the scope.
        existing: Vec<String>,
    },

    /// The result to assign is absent.
    #[error("Operation: {stack}.\nThe result of the execution is absent, there is nothing to assign.")]
    AbsentResult {
        /// Operation stack.
        stack: String,
    },

    /// Result count differs from target count.
    #[error(
        "Operation: {stack}.\nThe number of positional arguments after the operation execution is {found} and it is not equal to the number of fields to assign, they were found {expected}"
    )]
    ArityMismatch {
        /// Operation stack.
        stack: String,
        /// Values produced.
        found: usize,
        /// Targets declared.
        expected: usize,
    },

    /// An intermediate path segment does not hold an object.
    #[error(
        "Operation: {stack}.\nThe field \"{field}\" holds a value of kind {kind}, which has no assignable attributes."
    )]
    NotAnObject {
        /// Operation stack.
        stack: String,
        /// Path segment.
        field: String,
        /// Kind of the held value.
        kind: String,
    },
}

/// Failures while binding arguments to a callable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingError {
    /// The callable exposes no parameter list.
    #[error("Operation: {stack}.\nThe entity \"{entity}\" cannot be introspected.")]
    NotIntrospectable {
        /// Operation stack.
        stack: String,
        /// Entity name.
        entity: String,
    },

    /// Keyword directives are malformed.
    #[error("Operation: {stack}.\nIncorrect kwargs: {}", render_pairs(.slots))]
    IncorrectKwargs {
        /// Operation stack.
        stack: String,
        /// Slot and reason pairs.
        slots: Vec<(SlotName, String)>,
    },

    /// Keyword arguments match no parameter.
    #[error(
        "Operation: {stack}.\nThe following keyword arguments are not used: {}",
        render_pairs(.kwargs)
    )]
    UnusedKwargs {
        /// Operation stack.
        stack: String,
        /// Name and kind pairs.
        kwargs: Vec<(String, String)>,
    },

    /// Mandatory keyword-only parameters were not supplied.
    #[error(
        "Operation: {stack}.\nThe following keyword-only arguments are missing: {}",
        render_list(.names)
    )]
    MissingKwargs {
        /// Operation stack.
        stack: String,
        /// Parameter names.
        names: Vec<String>,
    },

    /// Declared positional arguments exceed the parameters.
    #[error(
        "Operation: {stack}.\nThe following positional arguments are not used: {}",
        render_list(.types)
    )]
    UnusedArgs {
        /// Operation stack.
        stack: String,
        /// Kinds of the unused arguments.
        types: Vec<String>,
    },

    /// Positional parameters without defaults received nothing.
    #[error(
        "Operation: {stack}.\nThe following positional arguments are missing: {}",
        render_list(.names)
    )]
    MissingArgs {
        /// Operation stack.
        stack: String,
        /// Parameter names.
        names: Vec<String>,
    },

    /// Container directives used on slots that cannot hold them.
    #[error("Operation: {stack}.\nIncorrect containers: {}", render_pairs(.slots))]
    InvalidContainers {
        /// Operation stack.
        stack: String,
        /// Slot and reason pairs.
        slots: Vec<(SlotName, String)>,
    },

    /// A mandatory stream directive follows an optional one.
    #[error(
        "Operation: {stack}.\nMandatory arguments cannot follow optional ones: {}",
        render_list(.slots)
    )]
    MandatoryAfterOptional {
        /// Operation stack.
        stack: String,
        /// Offending slots.
        slots: Vec<SlotName>,
    },

    /// A mandatory link names an alias absent from the scope.
    #[error(
        "Operation: {stack}.\nThe link \"{link}\" cannot be resolved. Existing aliases: {}",
        render_list(.existing)
    )]
    UnresolvedLink {
        /// Operation stack.
        stack: String,
        /// Link path.
        link: String,
        /// Aliases present in the scope.
        existing: Vec<String>,
    },

    /// The stream ran out before every required slot was filled.
    #[error(
        "Operation: {stack}.\nNot enough data. Len: {len}, Args map: {}",
        render_pairs(.slots)
    )]
    NotEnoughData {
        /// Operation stack.
        stack: String,
        /// Length of the incoming stream.
        len: usize,
        /// Unfilled slots with their requirement.
        slots: Vec<(SlotName, String)>,
    },

    /// Values did not satisfy their expected types.
    #[error("Operation: {stack}.\nIncorrect types: {}", render_mismatches(.mismatches))]
    TypeMismatch {
        /// Operation stack.
        stack: String,
        /// Slot, actual kind and expected type.
        mismatches: Vec<(SlotName, String, String)>,
    },

    /// The bound values did not fit the callable's parameter list.
    #[error("Operation: {stack}.\n{reason}")]
    Arrangement {
        /// Operation stack.
        stack: String,
        /// Why arranging failed.
        reason: String,
    },
}

fn render_mismatches(mismatches: &[(SlotName, String, String)]) -> String {
    let pairs: Vec<(&SlotName, String)> = mismatches
        .iter()
        .map(|(slot, actual, expected)| (slot, format!("({actual}, {expected})")))
        .collect();
    render_pairs(&pairs)
}

/// Shared state rejected a read or a write.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    /// A write-once field was written twice.
    #[error(
        "The value cannot be overwritten. The field \"{field}\" of WriteOnceBag is intended for single-write and read use."
    )]
    Overwrite {
        /// Field name.
        field: String,
    },

    /// A write-once field received a mutable value.
    #[error(
        "The field \"{field}\" of WriteOnceBag accepts only immutable scalars and tuples of them, got {kind}."
    )]
    MutableValue {
        /// Field name.
        field: String,
        /// Kind of the rejected value.
        kind: String,
    },

    /// An attribute does not exist.
    #[error("The {type_name} \"{alias}\" does not have attribute \"{field}\"")]
    MissingAttribute {
        /// Alias or type the lookup started from.
        alias: String,
        /// Type of the object.
        type_name: String,
        /// Missing attribute.
        field: String,
    },

    /// An attribute cannot be written.
    #[error("The attribute \"{field}\" of {type_name} is read-only.")]
    ReadOnly {
        /// Type of the object.
        type_name: String,
        /// Attribute name.
        field: String,
    },

    /// An alias is unknown in the scope.
    #[error("No such alias \"{alias}\" in the shared state. Existing aliases: {}", render_list(.existing))]
    NoSuchAlias {
        /// Missing alias.
        alias: String,
        /// Aliases present in the scope.
        existing: Vec<String>,
    },

    /// An overlay alias is empty or contains a dot.
    #[error("All aliases must be non-empty strings without dots, got \"{alias}\".")]
    InvalidAlias {
        /// Offending alias.
        alias: String,
    },

    /// An overlay holds two objects of one type.
    #[error("All special classes must be unique. The type {type_name} is repeated.")]
    DuplicateType {
        /// Repeated type name.
        type_name: String,
    },

    /// Any of the above, tagged with the operation stack.
    #[error("Operation: {stack}.\n{source}")]
    Scoped {
        /// Operation stack.
        stack: String,
        /// Underlying error.
        source: Box<StateError>,
    },
}

impl StateError {
    /// Tags the error with an operation stack.
    #[must_use]
    pub fn scoped(self, stack: &str) -> Self {
        match self {
            Self::Scoped { .. } => self,
            other => Self::Scoped {
                stack: stack.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, stripping stack tags.
    pub fn root(&self) -> &Self {
        match self {
            Self::Scoped { source, .. } => source.root(),
            other => other,
        }
    }
}

/// A user callable failed.
///
/// The user's error is kept intact and can be recovered with
/// [`CallableError::downcast_ref`].
#[derive(Debug, Error)]
#[error("Operation: {stack}. {context}\n{error}")]
pub struct CallableError {
    /// Operation stack.
    pub stack: String,
    /// What the engine was doing.
    pub context: String,
    error: anyhow::Error,
}

impl CallableError {
    /// Creates a new callable error.
    pub fn new(stack: impl Into<String>, context: impl Into<String>, error: anyhow::Error) -> Self {
        Self {
            stack: stack.into(),
            context: context.into(),
            error,
        }
    }

    /// Returns the wrapped user error.
    pub fn source_error(&self) -> &anyhow::Error {
        &self.error
    }

    /// Downcasts the wrapped user error.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

/// Parallel dispatcher failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Sequences that must align differ in length.
    #[error("The lengths of the sequences are not equal to each other: {}", render_list(.lengths))]
    UnequalLengths {
        /// Observed lengths.
        lengths: Vec<usize>,
    },

    /// The worker count could not be parsed.
    #[error("The number of workers must be \"max\" or a positive integer, got \"{0}\".")]
    InvalidWorkers(String),

    /// A worker panicked.
    #[error("The worker for branch {index} panicked: {message}")]
    WorkerPanicked {
        /// Submission index of the branch.
        index: usize,
        /// Panic description.
        message: String,
    },

    /// A blocking run was requested from inside an async runtime.
    #[error("run_blocking cannot be called from within an async runtime; use run instead.")]
    InsideRuntime,

    /// The runtime could not be built or shut down.
    #[error("Runtime error: {0}")]
    Runtime(String),
}
