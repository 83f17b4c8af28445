//! Sample callables and classes for branch tests.

use crate::core::{Class, Instance, Method, Value};
use crate::operation::Function;
use crate::reflect::Signature;

/// `add(a, b) -> a + b` over integers.
pub fn add() -> Function {
    Function::new("add", Signature::new().param("a").param("b"), |args| {
        Ok(Value::Int(args.int("a")? + args.int("b")?))
    })
}

/// `double(x) -> 2 * x`.
pub fn double() -> Function {
    Function::new("double", Signature::new().param("x"), |args| {
        Ok(Value::Int(args.int("x")? * 2))
    })
}

/// `identity(x) -> x`.
pub fn identity() -> Function {
    Function::new("identity", Signature::new().param("x"), |args| {
        Ok(args.value("x")?.clone())
    })
}

/// A function without parameters returning `value`.
pub fn constant(name: &str, value: impl Into<Value>) -> Function {
    let value = value.into();
    Function::new(name, Signature::new(), move |_| Ok(value.clone()))
}

/// `collect(*items) -> (items...)`.
pub fn collect() -> Function {
    Function::new("collect", Signature::new().var_positional("items"), |args| {
        Ok(args.value("items")?.clone())
    })
}

/// `sum_all(*items) -> sum` over integers.
pub fn sum_all() -> Function {
    Function::new("sum_all", Signature::new().var_positional("items"), |args| {
        let total = args
            .items("items")?
            .iter()
            .map(|v| v.as_int().ok_or_else(|| anyhow::anyhow!("{} is not an int", v.type_name())))
            .sum::<anyhow::Result<i64>>()?;
        Ok(Value::Int(total))
    })
}

/// A function that takes one argument and always fails with `message`.
pub fn failing(message: &'static str) -> Function {
    Function::new("failing", Signature::new().param("x"), move |_| {
        Err(anyhow::anyhow!(message))
    })
}

/// A function that returns the stop marker.
pub fn stopper() -> Function {
    Function::new("stopper", Signature::new(), |_| Ok(Value::Stop))
}

/// `Point(x, y)` with bound methods `sum()` and `scale(k) -> (x*k, y*k)`.
pub fn point_class() -> Class {
    Class::new("Point")
        .with_init(Signature::new().param("x").param("y"), |this, args| {
            this.set("x", args.int("x")?);
            this.set("y", args.int("y")?);
            Ok(())
        })
        .with_method(
            "sum",
            Method::bound(Signature::new(), |this, _| {
                let x = this.get_attr("x").and_then(|v| v.as_int()).unwrap_or_default();
                let y = this.get_attr("y").and_then(|v| v.as_int()).unwrap_or_default();
                Ok(Value::Int(x + y))
            }),
        )
        .with_method(
            "scale",
            Method::bound(Signature::new().param("k"), |this, args| {
                let k = args.int("k")?;
                let x = this.get_attr("x").and_then(|v| v.as_int()).unwrap_or_default();
                let y = this.get_attr("y").and_then(|v| v.as_int()).unwrap_or_default();
                Ok(Value::tuple([x * k, y * k]))
            }),
        )
}

/// `Counter()` with a bound `incr()` returning the new count.
pub fn counter_class() -> Class {
    Class::new("Counter")
        .with_init(Signature::new(), |this, _| {
            this.set("count", 0);
            Ok(())
        })
        .with_method(
            "incr",
            Method::bound(Signature::new(), |this, _| {
                let count = this
                    .get_attr("count")
                    .and_then(|v| v.as_int())
                    .unwrap_or_default()
                    + 1;
                this.set_attr("count", Value::Int(count))?;
                Ok(Value::Int(count))
            }),
        )
}

/// A fresh `Counter` instance.
pub fn counter() -> Instance {
    let instance = Instance::new(counter_class());
    instance.set("count", 0);
    instance
}
