use std::{cell::RefCell, rc::Rc};

use crate::{objects::object_class::ObjectClass, table::Table};

#[derive(Debug)]
pub struct ObjectInstance {
    pub class: Rc<RefCell<ObjectClass>>,
    pub fields: Table,
}

impl ObjectInstance {
    pub fn new(class: Rc<RefCell<ObjectClass>>) -> Self {
        ObjectInstance { class, fields: Table::new() }
    }
}
