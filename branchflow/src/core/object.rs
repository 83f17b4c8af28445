//! Shared objects: state bags, class instances and user types.

use super::value::Value;
use crate::errors::StateError;
use crate::reflect::{Arguments, Reflect, Signature};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// An object that can live in a scope or travel through a stream.
///
/// Type identity inside a scope is [`Object::type_name`].
pub trait Object: fmt::Debug + Send + Sync + 'static {
    /// The object's type name.
    fn type_name(&self) -> &str;

    /// Reads an attribute.
    fn get_attr(&self, name: &str) -> Option<Value>;

    /// Writes an attribute. Objects are read-only unless they override this.
    fn set_attr(&self, name: &str, value: Value) -> Result<(), StateError> {
        let _ = value;
        Err(StateError::ReadOnly {
            type_name: self.type_name().to_string(),
            field: name.to_string(),
        })
    }

    /// Looks up a callable method.
    fn method(&self, name: &str) -> Option<Method> {
        let _ = name;
        None
    }

    /// Produces an independent copy, if the object supports one.
    fn fork(&self) -> Option<ObjectRef> {
        None
    }

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// A shared handle to an [`Object`]. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Object>);

impl ObjectRef {
    /// Wraps an object.
    pub fn new(object: impl Object) -> Self {
        Self(Arc::new(object))
    }

    /// Whether both handles point at the same object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0).cast::<()>(),
            Arc::as_ptr(&other.0).cast::<()>(),
        )
    }

    /// Downcasts to a concrete object type.
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Forks the object if possible, otherwise shares it.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        self.0.fork().unwrap_or_else(|| self.clone())
    }
}

impl Deref for ObjectRef {
    type Target = dyn Object;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

type MethodBody = dyn Fn(&ObjectRef, &Arguments) -> anyhow::Result<Value> + Send + Sync;

/// A method callable on an object.
///
/// Bound methods carry a leading `self` parameter in their signature,
/// which reflection drops before binding.
#[derive(Clone)]
pub struct Method {
    signature: Signature,
    bound: bool,
    body: Arc<MethodBody>,
}

impl Method {
    /// Creates a method receiving the object it is called on.
    pub fn bound<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(&ObjectRef, &Arguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            signature: signature.with_receiver(),
            bound: true,
            body: Arc::new(body),
        }
    }

    /// Creates a method that ignores the object it is called on.
    pub fn unbound<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(&Arguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            signature,
            bound: false,
            body: Arc::new(move |_, args| body(args)),
        }
    }

    /// Whether the signature starts with a receiver.
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Invokes the method.
    pub fn invoke(&self, this: &ObjectRef, args: &Arguments) -> anyhow::Result<Value> {
        (self.body)(this, args)
    }
}

impl Reflect for Method {
    fn signature(&self) -> Option<&Signature> {
        Some(&self.signature)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("signature", &self.signature)
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}
