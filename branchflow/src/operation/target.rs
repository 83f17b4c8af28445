//! What an operation calls.

use crate::core::{Class, ObjectRef, Value};
use crate::directives::{Arg, ArgList};
use crate::reflect::{Arguments, Reflect, Signature};
use std::fmt;
use std::sync::Arc;

type FunctionBody = dyn Fn(&Arguments) -> anyhow::Result<Value> + Send + Sync;

/// A named free function with a declared signature.
#[derive(Clone)]
pub struct Function {
    name: String,
    signature: Option<Signature>,
    body: Arc<FunctionBody>,
}

impl Function {
    /// Creates a function.
    pub fn new<F>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(&Arguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature: Some(signature),
            body: Arc::new(body),
        }
    }

    /// Creates a function whose parameters cannot be introspected.
    pub fn opaque<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Arguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature: None,
            body: Arc::new(body),
        }
    }

    /// Function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the function.
    pub fn call(&self, args: &Arguments) -> anyhow::Result<Value> {
        (self.body)(args)
    }
}

impl Reflect for Function {
    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// A method name with its declared arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Method name.
    pub name: String,
    /// Declared arguments.
    pub call: ArgList,
}

impl MethodCall {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            call: ArgList::new(),
        }
    }
}

/// The four kinds of call an operation can make.
#[derive(Debug, Clone)]
pub enum CallTarget {
    /// A free function.
    Function {
        /// The function.
        function: Function,
        /// Declared arguments.
        call: ArgList,
    },
    /// Construct a class, then optionally call a method on the new instance.
    Constructor {
        /// The class.
        class: Class,
        /// Initializer arguments.
        init: ArgList,
        /// Method to call afterwards.
        method: Option<MethodCall>,
    },
    /// A method on an existing object.
    Instance {
        /// The object.
        instance: ObjectRef,
        /// Method to call.
        method: MethodCall,
    },
    /// A method on an object found by a dotted path in the scope.
    AliasPath {
        /// `alias[.field...]` path.
        path: String,
        /// Method to call.
        method: MethodCall,
    },
}

impl CallTarget {
    /// Entity name used in the operation stack.
    ///
    /// `resolved` is the object an alias path points to, when known.
    pub fn entity_name(&self, resolved: Option<&ObjectRef>) -> String {
        match self {
            Self::Function { function, .. } => function.name().to_string(),
            Self::Constructor {
                class,
                method: None,
                ..
            } => format!("{}(instance)", class.name()),
            Self::Constructor {
                class,
                method: Some(method),
                ..
            } => format!("{}.{}", class.name(), method.name),
            Self::Instance { instance, method } => {
                format!("{}(ext_instance).{}", instance.type_name(), method.name)
            }
            Self::AliasPath { path, method } => resolved.map_or_else(
                || format!("External instance from string: \"{path}\""),
                |obj| format!("{}(ext_instance).{}", obj.type_name(), method.name),
            ),
        }
    }

    /// All declared argument lists.
    pub fn arg_lists(&self) -> Vec<&ArgList> {
        match self {
            Self::Function { call, .. } => vec![call],
            Self::Constructor { init, method, .. } => {
                let mut lists = vec![init];
                lists.extend(method.as_ref().map(|m| &m.call));
                lists
            }
            Self::Instance { method, .. } | Self::AliasPath { method, .. } => vec![&method.call],
        }
    }
}

/// Builder for a [`CallTarget`].
///
/// Arguments attach to the method once one is named, otherwise to the
/// function or initializer.
///
/// ```rust,ignore
/// let target = Call::class(point).arg(m().of(TypeTag::Int)).method("sum");
/// let target = Call::alias("var.cache", "get").kwarg("key", "a");
/// ```
#[derive(Debug, Clone)]
pub struct Call {
    target: CallTarget,
}

impl Call {
    /// Calls a function.
    pub fn function(function: Function) -> Self {
        Self {
            target: CallTarget::Function {
                function,
                call: ArgList::new(),
            },
        }
    }

    /// Constructs a class.
    pub fn class(class: Class) -> Self {
        Self {
            target: CallTarget::Constructor {
                class,
                init: ArgList::new(),
                method: None,
            },
        }
    }

    /// Calls a method on an existing object.
    pub fn on(instance: ObjectRef, method: impl Into<String>) -> Self {
        Self {
            target: CallTarget::Instance {
                instance,
                method: MethodCall::new(method),
            },
        }
    }

    /// Calls a method on the object at a scope path.
    pub fn alias(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            target: CallTarget::AliasPath {
                path: path.into(),
                method: MethodCall::new(method),
            },
        }
    }

    /// Names the method to call after construction.
    #[must_use]
    pub fn method(mut self, name: impl Into<String>) -> Self {
        match &mut self.target {
            CallTarget::Constructor { method, .. } => *method = Some(MethodCall::new(name)),
            CallTarget::Instance { method, .. } | CallTarget::AliasPath { method, .. } => {
                method.name = name.into();
            }
            CallTarget::Function { .. } => {}
        }
        self
    }

    fn current_list(&mut self) -> &mut ArgList {
        match &mut self.target {
            CallTarget::Function { call, .. } => call,
            CallTarget::Constructor {
                method: Some(method),
                ..
            }
            | CallTarget::Instance { method, .. }
            | CallTarget::AliasPath { method, .. } => &mut method.call,
            CallTarget::Constructor { init, .. } => init,
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.current_list().args.push(arg.into());
        self
    }

    /// Appends several positional arguments.
    #[must_use]
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.current_list()
            .args
            .extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, arg: impl Into<Arg>) -> Self {
        self.current_list().kwargs.push((name.into(), arg.into()));
        self
    }

    /// Finishes the builder.
    pub fn into_target(self) -> CallTarget {
        self.target
    }
}

impl From<Call> for CallTarget {
    fn from(call: Call) -> Self {
        call.target
    }
}
