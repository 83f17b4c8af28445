//! Tests for branch construction, validation and the executor's edge cases.

use super::*;
use crate::core::{ObjectRef, TypeTag};
use crate::directives::{m, opt};
use crate::errors::{BindingError, DistributionError, FlowError, RemainingArgsFoundError};
use crate::observability::{CollectingLogger, LogLevel, MockFlowLogger, NoOpLogger};
use crate::reflect::Signature;
use crate::state::{ReadWriteBag, WriteOnceBag};
use crate::testing::fixtures::{add, collect, constant, double, identity, stopper};
use crate::testing::{assert_failed, assert_succeeded, RecordingFunction};
use crate::tuple;
use pretty_assertions::assert_eq;

fn quiet(branch: Branch) -> Branch {
    branch.with_logger(Arc::new(NoOpLogger))
}

#[test]
fn test_unnamed_branch() {
    let branch = Branch::default();
    assert_eq!(branch.name(), UNNAMED_BRANCH);
    assert!(branch.nodes_ref().is_empty());
}

#[test]
fn test_node_conversions() {
    let from_call: Node = Call::function(double()).into();
    let from_branch: Node = Branch::new("inner").into();
    assert!(matches!(from_call, Node::Operation(_)));
    assert!(matches!(from_branch, Node::Branch(_)));
    assert_eq!(from_branch.options().name.as_deref(), Some("inner"));
}

#[test]
fn test_empty_nested_branch_fails_validation() {
    let branch = Branch::new("root")
        .node(Call::function(constant("one", 1)))
        .node(Branch::new("empty"));

    let err = assert_failed(branch.validate());
    assert_eq!(
        err.to_string(),
        "Operation: root -> empty.\nRunning a branch without operations is impossible."
    );
}

#[test]
fn test_validation_runs_before_any_call() {
    let recorder = RecordingFunction::new("first", Signature::new());
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(recorder.function()))
            .node(Call::function(add()).arg(m()).arg(m()).arg(m())),
    );

    let err = assert_failed(branch.run(None));
    assert!(matches!(err, FlowError::Binding(BindingError::UnusedArgs { .. })));
    assert_eq!(recorder.call_count(), 0);
}

#[test]
fn test_mandatory_after_optional_fails_before_any_call() {
    let recorder = RecordingFunction::new("first", Signature::new());
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(recorder.function()))
            .node(Branch::new("inner").node(Call::function(collect()).arg(opt()).arg(m()))),
    );

    let err = assert_failed(branch.run(None));
    assert!(matches!(
        err,
        FlowError::Binding(BindingError::MandatoryAfterOptional { .. })
    ));
    assert!(err.to_string().starts_with("Operation: root -> inner -> collect."));
    assert_eq!(recorder.call_count(), 0);
}

#[test]
fn test_exclusive_flags_fail_validation() {
    let branch = Branch::new("root").node(
        Operation::new(Call::function(double()).arg(m()))
            .distribute_input_data()
            .stop_distribution(),
    );
    let err = assert_failed(branch.validate());
    assert!(matches!(
        err,
        FlowError::Distribution(DistributionError::StopWhileDistributing { .. })
    ));
}

#[test]
fn test_exclusive_flags_on_alias_target_fail_before_any_call() {
    let recorder = RecordingFunction::new("first", Signature::new());
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(recorder.function()))
            .node(
                Operation::new(Call::alias("var", "missing").arg(m()))
                    .distribute_input_data()
                    .burn_rem_args(),
            ),
    );

    let err = assert_failed(branch.run(None));
    assert!(matches!(
        err,
        FlowError::Distribution(DistributionError::BurnWhileDistributing { .. })
    ));
    assert!(err
        .to_string()
        .starts_with("Operation: root -> External instance from string: \"var\"."));
    assert_eq!(recorder.call_count(), 0);
}

#[test]
fn test_input_is_split_into_stream() {
    let branch = quiet(Branch::new("root").node(Call::function(add()).arg(m()).arg(m())));
    assert_eq!(assert_succeeded(branch.run(Some(tuple![2, 5]))), Value::Int(7));
}

#[test]
fn test_root_def_args_replace_missing_input() {
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(add()).arg(m()).arg(m()))
            .def_args([4, 6]),
    );
    assert_eq!(assert_succeeded(branch.run(None)), Value::Int(10));
    assert_eq!(assert_succeeded(branch.run(Some(tuple![1, 1]))), Value::Int(2));
}

#[test]
fn test_first_node_def_args_replace_missing_input() {
    let branch = quiet(
        Branch::new("root").node(Operation::new(Call::function(double()).arg(m())).def_args([21])),
    );
    assert_eq!(assert_succeeded(branch.run(None)), Value::Int(42));
}

#[test]
fn test_leftover_without_distribution_fails() {
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(constant("pair", tuple![1, "a"])))
            .node(Call::function(double()).arg(m().of(TypeTag::Int))),
    );

    let err = assert_failed(branch.run(None));
    assert!(err.is_distribution_error());
    let FlowError::RemainingArgsFound(RemainingArgsFoundError { stack, types }) = err else {
        panic!("expected leftover error");
    };
    assert_eq!(stack, "root -> double");
    assert_eq!(types, vec!["str".to_string()]);
}

#[test]
fn test_stop_distribution_without_buffer() {
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(constant("one", 1)))
            .node(Operation::new(Call::function(double()).arg(m())).stop_distribution())
            .node(Call::function(identity()).arg(m())),
    );

    let err = assert_failed(branch.run(None));
    assert_eq!(
        err.to_string(),
        DistributionError::StopWithoutCollection {
            stack: "root -> double".to_string()
        }
        .to_string()
    );
}

#[test]
fn test_nested_branch_during_collection() {
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(constant("pair", tuple![1, 2])))
            .node(Operation::new(Call::function(double()).arg(m())).distribute_input_data())
            .node(Branch::new("inner").node(Call::function(double()).arg(m())))
            .node(Call::function(collect()).arg(m().seq())),
    );

    let err = assert_failed(branch.run(None));
    assert_eq!(
        err.to_string(),
        DistributionError::NestedBranchDuringCollection {
            stack: "root(branch)".to_string()
        }
        .to_string()
    );
}

fn tripler(name: &str) -> Branch {
    Branch::new(name)
        .node(Call::function(double()).arg(m()))
        .node(Call::function(double()).arg(m()))
        .node(Call::function(double()).arg(m()))
}

#[test]
fn test_distribution_flag_passes_into_nested_branch() {
    let branch = quiet(
        Branch::new("root")
            .node(tripler("inner"))
            .node(Call::function(collect()).arg(m().seq()))
            .distribute_input_data(),
    );
    assert_eq!(assert_succeeded(branch.run(Some(tuple![1, 2, 3]))), tuple![2, 4, 6]);
}

#[test]
fn test_nested_branch_distributes_own_input() {
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(constant("three", tuple![1, 2, 3])))
            .node(tripler("inner").distribute_input_data())
            .node(Call::function(collect()).arg(m().seq())),
    );
    assert_eq!(assert_succeeded(branch.run(None)), tuple![2, 4, 6]);
}

#[test]
fn test_single_collected_value_is_unwrapped() {
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(constant("one", 1)))
            .node(Operation::new(Call::function(double()).arg(m())).distribute_input_data()),
    );
    assert_eq!(assert_succeeded(branch.run(None)), Value::Int(2));
}

#[test]
fn test_stop_from_first_operation() {
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(stopper()))
            .node(Call::function(double()).arg(m())),
    );
    assert_eq!(assert_succeeded(branch.run(None)), Value::Stop);
}

#[test]
fn test_branch_assign_writes_final_result() {
    let bag = ReadWriteBag::new();
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(add()).arg(m()).arg(m()))
            .assign(["out.total"])
            .state(StateMap::new().with("out", bag)),
    );

    let result = assert_succeeded(branch.run(Some(tuple![2, 3])));
    let Value::Tuple(items) = result else {
        panic!("expected the updated bags");
    };
    let out = items[0].as_object().expect("a bag");
    assert_eq!(out.type_name(), ReadWriteBag::TYPE_NAME);
    assert_eq!(out.get_attr("total"), Some(Value::Int(5)));
}

#[test]
fn test_branch_overlay_is_visible_to_nodes() {
    let bag = WriteOnceBag::new();
    bag.set("base", Value::Int(10)).expect("first write");
    let branch = quiet(
        Branch::new("root")
            .node(Call::function(add()).arg(m()).kwarg("b", m().link("cfg.base")))
            .state(StateMap::new().with("cfg", bag)),
    );

    assert_eq!(assert_succeeded(branch.run(Some(Value::Int(5)))), Value::Int(15));
}

#[test]
fn test_deep_copy_forks_overlays() {
    let bag = ObjectRef::new(ReadWriteBag::new());
    let branch = Branch::new("root")
        .node(Call::function(double()).arg(m()))
        .state(StateMap::new().with_ref("store", bag.clone()));

    let copy = branch.deep_copy();
    let copied = copy
        .options()
        .state
        .as_ref()
        .and_then(|state| state.get("store"))
        .expect("copied overlay");

    assert!(!copied.ptr_eq(&bag));
    copied.set_attr("x", Value::Int(1)).expect("writable");
    assert_eq!(bag.get_attr("x"), None);
}

#[test]
fn test_config_sets_root_defaults() {
    let logger = Arc::new(CollectingLogger::new());
    let branch = Branch::new("root")
        .node(Call::function(double()).arg(m()))
        .with_config(ExecutorConfig::default().with_hide_logging(true))
        .with_logger(logger.clone());

    assert_succeeded(branch.run(Some(Value::Int(1))));
    assert_eq!(logger.messages(LogLevel::Info), vec!["Operation: root -> double".to_string()]);

    let logger = Arc::new(CollectingLogger::new());
    let branch = branch.hide_logging(false).with_logger(logger.clone());
    assert_succeeded(branch.run(Some(Value::Int(1))));
    assert_eq!(
        logger.messages(LogLevel::Info),
        vec![
            "Operation: root -> double\nThe call will be made with positional arguments: (int) and without keyword arguments."
                .to_string()
        ]
    );
}

#[test]
fn test_nested_logger_overrides_parent() {
    let outer = Arc::new(CollectingLogger::new());
    let inner = Arc::new(CollectingLogger::new());
    let branch = Branch::new("root")
        .node(Call::function(double()).arg(m()))
        .node(
            Branch::new("inner")
                .node(Call::function(double()).arg(m()))
                .with_logger(inner.clone()),
        )
        .with_logger(outer.clone());

    assert_eq!(assert_succeeded(branch.run(Some(Value::Int(1)))), Value::Int(4));
    assert_eq!(outer.len(), 1);
    assert_eq!(inner.len(), 1);
    assert!(inner.contains("Operation: root -> inner -> double"));
}

#[test]
fn test_user_failure_logged_once() {
    let mut logger = MockFlowLogger::new();
    logger.expect_info().return_const(());
    logger
        .expect_error()
        .withf(|message| message.starts_with("Operation: root -> failing."))
        .times(1)
        .return_const(());

    let branch = Branch::new("root")
        .node(Call::function(crate::testing::fixtures::failing("bad input")).arg(m()))
        .with_logger(Arc::new(logger));

    let err = assert_failed(branch.run(Some(Value::Int(1))));
    assert!(err.user_error().is_some());
}
