use std::fmt;

use crate::{objects::object::NativeObject, value::Value};

pub struct ObjectNativeFunction {
    pub name: String,
    pub arity: u8,
    pub native_object: Box<dyn NativeObject>,
}

impl ObjectNativeFunction {
    pub fn new(name: &str, arity: u8, native_object: impl NativeObject + 'static) -> Self {
        ObjectNativeFunction {
            name: name.to_string(),
            arity,
            native_object: Box::new(native_object),
        }
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value, String> {
        self.native_object.run(args)
    }
}

impl fmt::Debug for ObjectNativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectNativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}
