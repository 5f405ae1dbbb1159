use std::rc::Rc;

use crate::{chunk::Chunk, objects::object_closure::ObjectClosure};

/// One active invocation: the closure being run, its instruction pointer and
/// the stack index of its slot 0.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub closure: Rc<ObjectClosure>,
    pub ip: usize,
    pub slots: usize,
}

impl CallFrame {
    pub fn new(closure: Rc<ObjectClosure>, slots: usize) -> Self {
        CallFrame { closure, ip: 0, slots }
    }

    #[inline(always)]
    pub fn chunk(&self) -> &Chunk {
        &self.closure.function.chunk
    }

    /// Source line of the instruction executed last in this frame.
    pub fn line(&self) -> usize {
        self.chunk().read_line_from_offset(self.ip.saturating_sub(1)).unwrap_or(0)
    }
}
