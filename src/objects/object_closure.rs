use std::rc::Rc;

use crate::objects::object_function::ObjectFunction;

#[derive(Debug)]
pub struct ObjectClosure {
    pub function: Rc<ObjectFunction>,
    /// Indices into the VM's upvalue arena, one per captured variable.
    pub upvalues: Vec<usize>,
}

impl ObjectClosure {
    pub fn new(function: Rc<ObjectFunction>, upvalues: Vec<usize>) -> Self {
        ObjectClosure { function, upvalues }
    }
}
