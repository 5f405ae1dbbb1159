use std::{cell::RefCell, fmt, rc::Rc};

use strum_macros::Display;

use crate::value::Value;

use super::{
    object_bound_method::ObjectBoundMethod,
    object_class::ObjectClass,
    object_closure::ObjectClosure,
    object_function::ObjectFunction,
    object_instance::ObjectInstance,
    object_native_function::ObjectNativeFunction,
    object_string::ObjectString,
};

#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, Display)]
pub enum ObjectType {
    ObjString,
    ObjFunction,
    ObjNativeFunction,
    ObjClosure,
    ObjClass,
    ObjInstance,
    ObjBoundMethod,
}

/// A reference to a heap object. Cloning shares the object.
#[derive(Clone)]
pub enum Object {
    String(Rc<ObjectString>),
    Function(Rc<ObjectFunction>),
    NativeFunction(Rc<ObjectNativeFunction>),
    Closure(Rc<ObjectClosure>),
    Class(Rc<RefCell<ObjectClass>>),
    Instance(Rc<RefCell<ObjectInstance>>),
    BoundMethod(Rc<ObjectBoundMethod>),
}

/// Host-provided callable registered as a global.
pub trait NativeObject {
    fn run(&self, args: &[Value]) -> Result<Value, String>;
}

impl Object {
    pub fn obj_type(&self) -> ObjectType {
        match self {
            Object::String(_) => ObjectType::ObjString,
            Object::Function(_) => ObjectType::ObjFunction,
            Object::NativeFunction(_) => ObjectType::ObjNativeFunction,
            Object::Closure(_) => ObjectType::ObjClosure,
            Object::Class(_) => ObjectType::ObjClass,
            Object::Instance(_) => ObjectType::ObjInstance,
            Object::BoundMethod(_) => ObjectType::ObjBoundMethod,
        }
    }
}

/// Strings compare by content, everything else by identity.
impl PartialEq for Object {
    fn eq(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::String(a), Object::String(b)) => Rc::ptr_eq(a, b) || a.content == b.content,
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::NativeFunction(a), Object::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Object::Closure(a), Object::Closure(b)) => Rc::ptr_eq(a, b),
            (Object::Class(a), Object::Class(b)) => Rc::ptr_eq(a, b),
            (Object::Instance(a), Object::Instance(b)) => Rc::ptr_eq(a, b),
            (Object::BoundMethod(a), Object::BoundMethod(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::String(string) => write!(f, "{}", string.content),
            Object::Function(function) => write!(f, "{}", function),
            Object::NativeFunction(_) => write!(f, "<native fn>"),
            Object::Closure(closure) => write!(f, "{}", closure.function),
            Object::Class(class) => write!(f, "{}", class.borrow().name),
            Object::Instance(instance) => {
                write!(f, "{} instance", instance.borrow().class.borrow().name)
            }
            Object::BoundMethod(bound) => write!(f, "{}", bound.method.function),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::String(string) => write!(f, "{:?}", &*string.content),
            _ => write!(f, "{}({})", self.obj_type(), self),
        }
    }
}
