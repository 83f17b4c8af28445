//! Node options and their static checks.

use crate::core::Value;
use crate::errors::{DistributionError, IncorrectParameterError};
use crate::state::StateMap;

/// Options shared by operations and branches.
///
/// `None` on an inheritable flag means "take the parent's value".
#[derive(Debug, Clone, Default)]
pub struct NodeOptions {
    /// Node name used in the stack.
    pub name: Option<String>,
    /// Stream used when the node receives no data.
    pub def_args: Option<Vec<Value>>,
    /// Shared-state fields the result is written to.
    pub assign: Option<Vec<String>>,
    /// Suppresses the argument summary in logs.
    pub hide_logging: Option<bool>,
    /// Checks every item of typed containers instead of the first one.
    pub check_type_strategy_all: Option<bool>,
    /// Every node must receive data (branches only).
    pub all_operations_must_be_executed: Option<bool>,
    /// Opens a distribution buffer with this node's result.
    pub distribute_input_data: bool,
    /// Closes the distribution buffer after this node.
    pub stop_distribution: bool,
    /// Discards the unconsumed stream.
    pub burn_rem_args: bool,
    /// Fails when the node receives no data.
    pub raise_err_if_empty_data: bool,
    /// Shared-state overlay merged over the parent scope.
    pub state: Option<StateMap>,
}

/// Static checks on node options.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionsChecker;

impl OptionsChecker {
    /// Rejects empty names.
    pub fn check_name(
        name: Option<&str>,
        last_operation: &str,
    ) -> Result<(), IncorrectParameterError> {
        match name {
            Some("") => Err(IncorrectParameterError::InvalidName {
                last_operation: last_operation.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Rejects mutually exclusive distribution flags on one node.
    pub fn check_flags(stack: &str, options: &NodeOptions) -> Result<(), DistributionError> {
        if options.burn_rem_args && options.distribute_input_data {
            return Err(DistributionError::BurnWhileDistributing {
                stack: stack.to_string(),
            });
        }
        if options.stop_distribution && options.distribute_input_data {
            return Err(DistributionError::StopWhileDistributing {
                stack: stack.to_string(),
            });
        }
        Ok(())
    }

    /// Rejects burning leftovers that an open buffer still needs.
    pub fn check_burn_during_collection(
        stack: &str,
        options: &NodeOptions,
        collecting: bool,
    ) -> Result<(), DistributionError> {
        if options.burn_rem_args && collecting && !options.stop_distribution {
            return Err(DistributionError::BurnDuringCollection {
                stack: stack.to_string(),
            });
        }
        Ok(())
    }
}
