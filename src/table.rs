use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// String-keyed table shared by globals, interned strings, class methods and instance fields.
#[derive(Debug, Clone)]
pub struct Table<V = Value> {
    entries: HashMap<Rc<str>, V>,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Table { entries: HashMap::new() }
    }
}

impl<V: Clone> Table<V> {
    pub fn new() -> Table<V> {
        Table::default()
    }

    /// Returns `true` when the key was not present before.
    pub fn insert(&mut self, key: Rc<str>, value: V) -> bool {
        self.entries.insert(key, value).is_none()
    }

    pub fn find(&self, key: &str) -> Option<V> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every entry of `from` into this table, overwriting existing keys.
    pub fn add_all(&mut self, from: &Table<V>) {
        for (key, value) in from.iter() {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &V)> {
        self.entries.iter()
    }
}
