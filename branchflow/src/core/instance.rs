//! Runtime classes and their field-backed instances.

use super::object::{Method, Object, ObjectRef};
use super::value::Value;
use crate::errors::StateError;
use crate::reflect::{Arguments, Reflect, Signature};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type Constructor = dyn Fn(&Class, &Arguments) -> anyhow::Result<ObjectRef> + Send + Sync;

/// A constructible type with an initializer signature and a method table.
///
/// Cloning is cheap; clones share the initializer and methods.
#[derive(Clone)]
pub struct Class {
    name: String,
    init: Signature,
    constructor: Arc<Constructor>,
    methods: Arc<BTreeMap<String, Method>>,
}

impl Class {
    /// Creates a class whose instances start with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            init: Signature::new(),
            constructor: Arc::new(|class, _| Ok(ObjectRef::new(Instance::new(class.clone())))),
            methods: Arc::new(BTreeMap::new()),
        }
    }

    /// Sets an initializer that fills the fields of a fresh instance.
    #[must_use]
    pub fn with_init<F>(mut self, signature: Signature, init: F) -> Self
    where
        F: Fn(&Instance, &Arguments) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.init = signature;
        self.constructor = Arc::new(move |class, args| {
            let instance = Instance::new(class.clone());
            init(&instance, args)?;
            Ok(ObjectRef::new(instance))
        });
        self
    }

    /// Sets a constructor producing any object type.
    #[must_use]
    pub fn with_constructor<F>(mut self, signature: Signature, constructor: F) -> Self
    where
        F: Fn(&Arguments) -> anyhow::Result<ObjectRef> + Send + Sync + 'static,
    {
        self.init = signature;
        self.constructor = Arc::new(move |_, args| constructor(args));
        self
    }

    /// Registers a method available on instances.
    #[must_use]
    pub fn with_method(mut self, name: impl Into<String>, method: Method) -> Self {
        Arc::make_mut(&mut self.methods).insert(name.into(), method);
        self
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The initializer signature.
    pub fn init_signature(&self) -> &Signature {
        &self.init
    }

    /// Looks up a registered method.
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Builds an instance from arranged arguments.
    pub fn construct(&self, args: &Arguments) -> anyhow::Result<ObjectRef> {
        (self.constructor)(self, args)
    }
}

impl Reflect for Class {
    fn signature(&self) -> Option<&Signature> {
        Some(&self.init)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("init", &self.init)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// An instance of a [`Class`] with mutable named fields.
pub struct Instance {
    class: Class,
    fields: RwLock<BTreeMap<String, Value>>,
}

impl Instance {
    /// Creates an instance with no fields.
    pub fn new(class: Class) -> Self {
        Self {
            class,
            fields: RwLock::new(BTreeMap::new()),
        }
    }

    /// Reads a field.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields.read().get(name).cloned()
    }

    /// Writes a field.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.write().insert(name.into(), value.into());
    }

    /// The class the instance was built from.
    pub fn class(&self) -> &Class {
        &self.class
    }
}

impl Object for Instance {
    fn type_name(&self) -> &str {
        self.class.name()
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<(), StateError> {
        self.set(name, value);
        Ok(())
    }

    fn method(&self, name: &str) -> Option<Method> {
        self.class.method(name).cloned()
    }

    fn fork(&self) -> Option<ObjectRef> {
        let fields = self
            .fields
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.deep_copy()))
            .collect();
        Some(ObjectRef::new(Self {
            class: self.class.clone(),
            fields: RwLock::new(fields),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.class.name())
            .field("fields", &*self.fields.read())
            .finish()
    }
}
