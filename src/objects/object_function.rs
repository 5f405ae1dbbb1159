use std::fmt;

use crate::chunk::Chunk;

/// A compiled function body. Immutable once the compiler hands it out.
#[derive(Debug, Default)]
pub struct ObjectFunction {
    pub arity: u8,
    pub upvalue_count: usize,
    pub chunk: Chunk,
    /// Empty for the top-level script.
    pub name: String,
}

impl ObjectFunction {
    pub fn new(name: &str) -> Self {
        ObjectFunction {
            arity: 0,
            upvalue_count: 0,
            chunk: Chunk::new(),
            name: name.to_string(),
        }
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }
}

impl fmt::Display for ObjectFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "<script>")
        } else {
            write!(f, "<fn {}>", self.name)
        }
    }
}
