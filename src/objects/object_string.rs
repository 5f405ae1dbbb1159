use std::rc::Rc;

use crate::table::Table;

#[derive(Debug, Hash, PartialEq, Eq)]
pub struct ObjectString {
    pub content: Rc<str>,
}

impl ObjectString {
    pub fn new(content: &str) -> ObjectString {
        ObjectString { content: Rc::from(content) }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

/// Returns the interned string object for `content`, allocating it on first use.
pub fn intern(intern_strings: &mut Table<Rc<ObjectString>>, content: &str) -> Rc<ObjectString> {
    if let Some(existing) = intern_strings.find(content) {
        return existing;
    }
    let string = Rc::new(ObjectString::new(content));
    intern_strings.insert(string.content.clone(), string.clone());
    string
}
