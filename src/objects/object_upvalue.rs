use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum UpvalueLocation {
    /// Still on the stack at this absolute slot.
    Open(usize),
    Closed(Value),
}

/// A captured variable. Lives in the VM's upvalue arena and is shared by index.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUpvalue {
    pub location: UpvalueLocation,
}

impl ObjectUpvalue {
    pub fn new(slot: usize) -> Self {
        ObjectUpvalue { location: UpvalueLocation::Open(slot) }
    }

    pub fn open_slot(&self) -> Option<usize> {
        match self.location {
            UpvalueLocation::Open(slot) => Some(slot),
            UpvalueLocation::Closed(_) => None,
        }
    }

    pub fn close(&mut self, value: Value) {
        self.location = UpvalueLocation::Closed(value);
    }
}
