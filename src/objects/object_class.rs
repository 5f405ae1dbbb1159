use std::rc::Rc;

use crate::{objects::object_closure::ObjectClosure, table::Table};

#[derive(Debug)]
pub struct ObjectClass {
    pub name: Rc<str>,
    pub methods: Table<Rc<ObjectClosure>>,
}

impl ObjectClass {
    pub fn new(name: Rc<str>) -> Self {
        ObjectClass { name, methods: Table::new() }
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<ObjectClosure>> {
        self.methods.find(name)
    }
}
