use std::rc::Rc;

use crate::{objects::object_closure::ObjectClosure, value::Value};

/// A method closure paired with the receiver it was looked up on.
#[derive(Debug)]
pub struct ObjectBoundMethod {
    pub receiver: Value,
    pub method: Rc<ObjectClosure>,
}

impl ObjectBoundMethod {
    pub fn new(receiver: Value, method: Rc<ObjectClosure>) -> Self {
        ObjectBoundMethod { receiver, method }
    }
}
