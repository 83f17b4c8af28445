//! Tests for argument binding.

use super::*;
use crate::core::Instance;
use crate::core::{Class, ObjectRef};
use crate::directives::{m, opt};
use crate::errors::FlowError;
use crate::state::ReadWriteBag;
use crate::tuple;
use pretty_assertions::assert_eq;

fn bind_with(
    signature: &Signature,
    call: &ArgList,
    stream: Value,
    state: &StateMap,
    strategy: CheckStrategy,
) -> FlowResult<BoundCall> {
    ArgumentBinder::bind(BindRequest {
        stack: "op",
        signature,
        call,
        stream: stream.into_stream(),
        state,
        strategy,
    })
}

fn bind(signature: &Signature, call: &ArgList, stream: Value) -> FlowResult<BoundCall> {
    let state = StateMap::merged("op", None, None).unwrap();
    bind_with(signature, call, stream, &state, CheckStrategy::AllItems)
}

fn binding_error(result: FlowResult<BoundCall>) -> BindingError {
    match result {
        Err(FlowError::Binding(err)) => err,
        other => panic!("expected a binding error, got {other:?}"),
    }
}

fn big_signature() -> Signature {
    Signature::new()
        .param("arg1")
        .param("arg2")
        .param("arg3")
        .param("arg4")
        .param("arg5")
        .param("arg6")
        .var_positional("argss")
        .keyword_only("kwarg1")
        .keyword_only_with_default("kwarg2", "7i")
        .keyword_only("kwarg3")
        .var_keyword("kwargss")
}

fn big_stream() -> Value {
    tuple![1, "tt", "lll", "pppp", 4.0, true, true, true, "str1", "str2", 1, 2, 3, 4, "F", 13]
}

fn def_args() -> Signature {
    Signature::new()
        .param("a")
        .param_with_default("b", 1)
        .param_with_default("c", 2)
        .var_positional("args")
}

fn kwarg_after_var_pos() -> Signature {
    Signature::new()
        .param("a")
        .var_positional("args")
        .keyword_only("b")
        .var_keyword("kwargs")
}

fn kwargs_of(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[test]
fn test_two_directives_one_remaining() {
    let signature = Signature::new().param("arg1").param("arg2");
    let call = ArgList::new().arg(m().of(TypeTag::Int)).arg(m().of(TypeTag::Int));
    let bound = bind(&signature, &call, tuple![1, 2, 3]).unwrap();
    assert_eq!(bound.args, vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(bound.leftover, Some(vec![Value::Int(3)]));
}

#[test]
fn test_literals_leave_stream_untouched() {
    let signature = Signature::new().param("arg1").param("arg2");
    let call = ArgList::new().kwarg("arg1", 2).kwarg("arg2", 3);
    let bound = bind(&signature, &call, tuple![1]).unwrap();
    assert!(bound.args.is_empty());
    assert_eq!(bound.kwargs, kwargs_of(&[("arg1", Value::Int(2)), ("arg2", Value::Int(3))]));
    assert_eq!(bound.leftover, Some(vec![Value::Int(1)]));
}

#[test]
fn test_big_function() {
    let call = ArgList::new()
        .arg(Value::list([Value::None]))
        .arg(5)
        .arg(m().of(TypeTag::Int))
        .arg("uuu")
        .arg(m().of(TypeTag::Str))
        .arg(3)
        .arg(m().of(TypeTag::Float))
        .arg(m().seq().of(TypeTag::Bool))
        .arg(m().of(TypeTag::Str))
        .arg(m().of(TypeTag::Str))
        .arg(m().seq().of(TypeTag::Int))
        .arg("x5")
        .arg(m().of(TypeTag::Str))
        .kwarg("kwarg1", 9)
        .kwarg("kwarg3", m().at(3).of(TypeTag::Str))
        .kwarg("kw100", 90)
        .kwarg("kw200", m().at(4).of(TypeTag::Str));

    let bound = bind(&big_signature(), &call, big_stream()).unwrap();

    let expected_args = vec![
        Value::list([Value::None]),
        Value::Int(5),
        Value::Int(1),
        Value::from("uuu"),
        Value::from("tt"),
        Value::Int(3),
        Value::Float(4.0),
        Value::Bool(true),
        Value::Bool(true),
        Value::Bool(true),
        Value::from("str1"),
        Value::from("str2"),
        Value::Int(1),
        Value::Int(2),
        Value::Int(3),
        Value::Int(4),
        Value::from("x5"),
        Value::from("F"),
    ];
    assert_eq!(bound.args, expected_args);
    assert_eq!(
        bound.kwargs,
        kwargs_of(&[
            ("kwarg1", Value::Int(9)),
            ("kwarg2", Value::from("7i")),
            ("kwarg3", Value::from("lll")),
            ("kw100", Value::Int(90)),
            ("kw200", Value::from("pppp")),
        ])
    );
    assert_eq!(bound.leftover, Some(vec![Value::Int(13)]));
}

#[test]
fn test_untyped_sequence_absorbs_rest() {
    let call = ArgList::new()
        .arg(Value::list([Value::None]))
        .arg(5)
        .arg(m())
        .arg("uuu")
        .arg(m())
        .arg(3)
        .arg("d13")
        .arg(m().seq())
        .arg("x5")
        .kwarg("kwarg1", 9)
        .kwarg("kwarg3", m().at(3))
        .kwarg("kw100", 90)
        .kwarg("kw200", m().at(4));

    let bound = bind(&big_signature(), &call, big_stream()).unwrap();
    assert_eq!(bound.args.len(), 6 + 14);
    assert_eq!(bound.args[6], Value::from("d13"));
    assert_eq!(bound.args[19], Value::from("x5"));
    assert_eq!(bound.leftover, None);
}

#[test]
fn test_typed_sequence_stops_at_first_mismatch() {
    let call = ArgList::new()
        .arg(Value::list([Value::None]))
        .arg(5)
        .arg(m())
        .arg("uuu")
        .arg(m())
        .arg(3)
        .arg(m().of(TypeTag::Float))
        .arg(m().seq().of(TypeTag::Bool))
        .arg("O")
        .kwarg("kwarg1", 9)
        .kwarg("kwarg3", m().at(3))
        .kwarg("kw100", 90)
        .kwarg("kw200", m().at(4));

    let bound = bind(&big_signature(), &call, big_stream()).unwrap();
    assert_eq!(
        Value::Tuple(bound.args[6..].to_vec()),
        tuple![4.0, true, true, true, "O"]
    );
    assert_eq!(
        bound.leftover.map(Value::Tuple),
        Some(tuple!["str1", "str2", 1, 2, 3, 4, "F", 13])
    );
}

#[test]
fn test_not_enough_data() {
    let call = ArgList::new()
        .arg(Value::list([Value::None]))
        .arg(5)
        .arg(m().of(TypeTag::Int))
        .arg("uuu")
        .arg(m().of(TypeTag::Str))
        .arg(3)
        .arg(m().of(TypeTag::Float))
        .arg(m().seq().of(TypeTag::Bool))
        .arg(m().of(TypeTag::Str))
        .arg(m().of(TypeTag::Str))
        .arg(m().seq().of(TypeTag::Int))
        .arg("x5")
        .arg(m().of(TypeTag::Str))
        .kwarg("kwarg1", 9)
        .kwarg("kwarg3", m().at(2).of(TypeTag::Str))
        .kwarg("kw100", 90)
        .kwarg("kw200", opt().at(15).of(TypeTag::Str));

    let err = binding_error(bind(&big_signature(), &call, tuple![1, "lll"]));
    assert_eq!(
        err.to_string(),
        "Operation: op.\nNot enough data. Len: 2, Args map: {'arg5': mandatory, 1: mandatory, \
         2: mandatory, 3: mandatory, 4: mandatory, 5: mandatory, 7: mandatory}"
    );
}

#[test]
fn test_type_mismatch_reports_every_slot() {
    let signature = Signature::new().param("arg1").param("arg2");
    let call = ArgList::new()
        .arg(m().of(TypeTag::Str))
        .kwarg("arg2", m().at(2).of(TypeTag::Int));
    let err = binding_error(bind(&signature, &call, tuple![1, 2.0]));
    assert_eq!(
        err,
        BindingError::TypeMismatch {
            stack: "op".to_string(),
            mismatches: vec![
                (SlotName::named("arg1"), "int".to_string(), "str".to_string()),
                (SlotName::named("arg2"), "float".to_string(), "int".to_string()),
            ],
        }
    );
}

#[test]
fn test_check_type_strategy() {
    let signature = Signature::new().var_positional("args");
    let call = ArgList::new().arg(m().of(TypeTag::list(TypeTag::Int)));
    let state = StateMap::merged("op", None, None).unwrap();
    let value = tuple![Value::list([Value::Int(1), Value::Int(2), Value::from("3")])];

    assert!(bind_with(&signature, &call, value.clone(), &state, CheckStrategy::FirstItem).is_ok());
    let err = binding_error(bind_with(&signature, &call, value, &state, CheckStrategy::AllItems));
    assert_eq!(err.to_string(), "Operation: op.\nIncorrect types: {1: (list, list[int])}");
}

#[test]
fn test_def_args_cases() {
    let call = ArgList::new().arg(100).arg(200).arg(m().of(TypeTag::Int));
    let bound = bind(&def_args(), &call, tuple![1]).unwrap();
    assert_eq!(bound.args, vec![Value::Int(100), Value::Int(200), Value::Int(1)]);
    assert_eq!(bound.leftover, None);

    let call = ArgList::new()
        .arg(100)
        .arg(200)
        .arg(m().of(TypeTag::Int))
        .arg(m().of(TypeTag::Int));
    let bound = bind(&def_args(), &call, tuple![10, 20, "str"]).unwrap();
    assert_eq!(
        bound.args,
        vec![Value::Int(100), Value::Int(200), Value::Int(10), Value::Int(20)]
    );
    assert_eq!(bound.leftover, Some(vec![Value::from("str")]));

    let call = ArgList::new().arg(100).arg(200);
    let bound = bind(&def_args(), &call, tuple![1]).unwrap();
    assert_eq!(bound.args, vec![Value::Int(100), Value::Int(200), Value::Int(2)]);
    assert_eq!(bound.leftover, Some(vec![Value::Int(1)]));
}

#[test]
fn test_optional_rest_falls_back_to_defaults() {
    let call = ArgList::new()
        .arg(100)
        .arg(m().of(TypeTag::Int))
        .arg(opt().of(TypeTag::Int))
        .arg(opt().of(TypeTag::Int))
        .arg(opt().of(TypeTag::Int));
    let bound = bind(&def_args(), &call, tuple![20]).unwrap();
    assert_eq!(bound.args, vec![Value::Int(100), Value::Int(20), Value::Int(2)]);
}

#[test]
fn test_missing_mandatory_in_var_slot() {
    let call = ArgList::new()
        .arg(100)
        .arg(m().of(TypeTag::Int))
        .arg(m().of(TypeTag::Int))
        .arg(m().of(TypeTag::Int))
        .arg(opt().of(TypeTag::Int));
    let err = binding_error(bind(&def_args(), &call, tuple![20]));
    assert_eq!(
        err,
        BindingError::NotEnoughData {
            stack: "op".to_string(),
            len: 1,
            slots: vec![
                (SlotName::named("c"), "mandatory".to_string()),
                (SlotName::Variadic(1), "mandatory".to_string()),
            ],
        }
    );
}

#[test]
fn test_mandatory_after_optional() {
    let call = ArgList::new()
        .arg(100)
        .arg(opt().of(TypeTag::Int))
        .arg(m().of(TypeTag::Int))
        .arg(m().of(TypeTag::Int))
        .arg(opt().of(TypeTag::Int))
        .arg(m().of(TypeTag::Int));
    let err = binding_error(bind(&def_args(), &call, tuple![20]));
    assert_eq!(
        err,
        BindingError::MandatoryAfterOptional {
            stack: "op".to_string(),
            slots: vec![
                SlotName::named("c"),
                SlotName::Variadic(1),
                SlotName::Variadic(3),
            ],
        }
    );
}

#[test]
fn test_sequence_on_plain_parameter_rejected() {
    let call = ArgList::new()
        .arg(m().seq().of(TypeTag::Int))
        .arg(m().of(TypeTag::Int))
        .arg(m().of(TypeTag::Float));
    let err = binding_error(bind(&def_args(), &call, tuple![]));
    assert!(matches!(
        err,
        BindingError::InvalidContainers { ref slots, .. } if slots[0].0 == SlotName::named("a")
    ));
}

#[test]
fn test_untyped_sequence_then_literals() {
    let signature = Signature::new().var_positional("args");
    let call = ArgList::new()
        .arg(m().seq().of(TypeTag::Int))
        .arg("100i")
        .arg("200i");
    let bound = bind(&signature, &call, tuple![1, 2, 3]).unwrap();
    assert_eq!(
        Value::Tuple(bound.args),
        tuple![1, 2, 3, "100i", "200i"]
    );
}

#[test]
fn test_keyword_draws_after_positional() {
    let call = ArgList::new()
        .arg(1)
        .arg(m().of(TypeTag::Int))
        .arg(m().seq())
        .kwarg("b", m().of(TypeTag::Str));
    let err = binding_error(bind(&kwarg_after_var_pos(), &call, tuple![10, 20, 30, "aaa"]));
    assert_eq!(
        err.to_string(),
        "Operation: op.\nNot enough data. Len: 4, Args map: {'b': mandatory}"
    );

    let call = ArgList::new()
        .arg(1)
        .arg(m().of(TypeTag::Int))
        .arg(m().seq())
        .kwarg("b", m().at(4).of(TypeTag::Str))
        .kwarg("bbb", 15);
    let bound = bind(&kwarg_after_var_pos(), &call, tuple![10, 20, 30, "aaa"]).unwrap();
    assert_eq!(Value::Tuple(bound.args), tuple![1, 10, 20, 30]);
    assert_eq!(
        bound.kwargs,
        kwargs_of(&[("b", Value::from("aaa")), ("bbb", Value::Int(15))])
    );
}

#[test]
fn test_fixed_positions_index_original_stream() {
    let call = ArgList::new()
        .arg(m().at(2).of(TypeTag::Int))
        .kwarg("b", m().at(1).of(TypeTag::Int));
    let bound = bind(&kwarg_after_var_pos(), &call, tuple![10, 20, "aaa"]).unwrap();
    assert_eq!(bound.args, vec![Value::Int(20)]);
    assert_eq!(bound.kwargs, kwargs_of(&[("b", Value::Int(10))]));
    assert_eq!(bound.leftover, Some(vec![Value::from("aaa")]));

    let call = ArgList::new()
        .arg(m().at(2).of(TypeTag::Int))
        .arg(m().at(1).of(TypeTag::Int))
        .arg(m().at(3).of(TypeTag::Int))
        .kwarg("b", m().of(TypeTag::Str));
    let bound = bind(&kwarg_after_var_pos(), &call, tuple![10, 20, 30, "aaa"]).unwrap();
    assert_eq!(Value::Tuple(bound.args), tuple![20, 10, 30]);
    assert_eq!(bound.kwargs, kwargs_of(&[("b", Value::from("aaa"))]));
    assert_eq!(bound.leftover, None);
}

#[test]
fn test_position_zero_rejected() {
    let signature = Signature::new().param("a");
    let call = ArgList::new().kwarg("a", m().at(0));
    let err = binding_error(bind(&signature, &call, tuple![1]));
    assert!(matches!(err, BindingError::IncorrectKwargs { .. }));
}

#[test]
fn test_kwarg_checks() {
    let signature = Signature::new().param("a").keyword_only("k");
    let call = ArgList::new().arg(1).kwarg("k", 2).kwarg("zzz", 3);
    assert!(matches!(
        binding_error(bind(&signature, &call, tuple![])),
        BindingError::UnusedKwargs { .. }
    ));

    let call = ArgList::new().arg(1);
    assert_eq!(
        binding_error(bind(&signature, &call, tuple![])),
        BindingError::MissingKwargs {
            stack: "op".to_string(),
            names: vec!["k".to_string()],
        }
    );

    let call = ArgList::new().kwarg("k", m().seq());
    assert!(matches!(
        binding_error(bind(&signature, &call, tuple![])),
        BindingError::IncorrectKwargs { .. }
    ));
}

#[test]
fn test_arg_checks() {
    let signature = Signature::new().param("a");
    let call = ArgList::new().arg(1).arg("x");
    assert_eq!(
        binding_error(bind(&signature, &call, tuple![])),
        BindingError::UnusedArgs {
            stack: "op".to_string(),
            types: vec!["str".to_string()],
        }
    );

    let signature = Signature::new().param("a").param("b");
    let call = ArgList::new().arg(1);
    assert_eq!(
        binding_error(bind(&signature, &call, tuple![])),
        BindingError::MissingArgs {
            stack: "op".to_string(),
            names: vec!["b".to_string()],
        }
    );
}

#[test]
fn test_keyword_turns_later_params_keyword_only() {
    let signature = Signature::new().param("a").param("b").param("c");
    let call = ArgList::new().kwarg("a", 1).kwarg("c", 3);
    assert_eq!(
        binding_error(bind(&signature, &call, tuple![2])),
        BindingError::MissingKwargs {
            stack: "op".to_string(),
            names: vec!["b".to_string()],
        }
    );
}

#[test]
fn test_links_and_alias_literals() {
    let state = StateMap::merged("op", None, None).unwrap();
    let bag = state.read_write().unwrap();
    bag.set("user", "ann");
    let holder = Instance::new(Class::new("Holder"));
    holder.set("inner", 7);
    let state = state.with("h", holder);

    let signature = Signature::new().param("a").param("b").param("c").param("d");
    let call = ArgList::new()
        .arg(m().link("var.user"))
        .arg(m().link("h.inner").of(TypeTag::Int))
        .arg(opt().link("nope.x"))
        .arg("var");
    let bound = bind_with(&signature, &call, tuple![], &state, CheckStrategy::AllItems).unwrap();
    assert_eq!(bound.args[0], Value::from("ann"));
    assert_eq!(bound.args[1], Value::Int(7));
    assert_eq!(bound.args[2], Value::from(NOT_EXPANDED));
    assert!(matches!(&bound.args[3], Value::Object(obj) if obj.downcast_ref::<ReadWriteBag>().is_some()));

    let call = ArgList::new()
        .arg(m().link("nope.x"))
        .arg(1)
        .arg(2)
        .arg(3);
    assert!(matches!(
        binding_error(bind_with(&signature, &call, tuple![], &state, CheckStrategy::AllItems)),
        BindingError::UnresolvedLink { .. }
    ));

    let call = ArgList::new().arg(m().link("h.missing")).arg(1).arg(2).arg(3);
    let err = bind_with(&signature, &call, tuple![], &state, CheckStrategy::AllItems).unwrap_err();
    assert!(matches!(err, FlowError::State(_)));
}

#[test]
fn test_multiple_types_in_var_slot() {
    let signature = Signature::new().var_positional("args");
    let call = ArgList::new().arg(m().of_many([TypeTag::Int, TypeTag::Str]));
    let bound = bind(&signature, &call, tuple![1, "a", 2]).unwrap();
    assert_eq!(bound.args, vec![Value::Int(1), Value::from("a")]);
    assert_eq!(bound.leftover, Some(vec![Value::Int(2)]));

    let err = binding_error(bind(&signature, &call, tuple!["a", 1]));
    assert!(matches!(err, BindingError::TypeMismatch { ref mismatches, .. } if mismatches.len() == 2));
}

#[test]
fn test_object_in_stream() {
    let signature = Signature::new().param("obj");
    let obj = ObjectRef::new(Instance::new(Class::new("Thing")));
    let call = ArgList::new().arg(m().of(TypeTag::instance("Thing")));
    let bound = bind(&signature, &call, tuple![obj.clone()]).unwrap();
    assert_eq!(bound.args, vec![Value::Object(obj)]);
}

#[test]
fn test_describe_call() {
    let bound = BoundCall {
        args: vec![Value::Int(1), Value::from("a")],
        kwargs: kwargs_of(&[("k", Value::Bool(true))]),
        leftover: None,
    };
    assert_eq!(
        bound.describe("br -> op", false),
        "Operation: br -> op\nThe call will be made with positional arguments: (int, str) \
         and keyword arguments: {k: bool}."
    );
    assert_eq!(bound.describe("br -> op", true), "Operation: br -> op");
    assert_eq!(
        BoundCall::default().describe("x", false),
        "Operation: x\nThe call will be made without positional or keyword arguments."
    );
}

#[test]
fn test_static_check_needs_no_data() {
    let call = ArgList::new().arg(opt()).arg(m());
    let signature = Signature::new().param("a").param("b");
    assert!(ArgumentBinder::check("op", &signature, &call).is_err());
    let call = ArgList::new().arg(m()).arg(opt());
    assert!(ArgumentBinder::check("op", &signature, &call).is_ok());
}
