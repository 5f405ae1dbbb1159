use strum_macros::{Display, EnumCount, FromRepr};

use crate::value::Value;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount, FromRepr)]
pub enum OpCode {
    Constant,
    Nil,
    True,
    False,
    Pop,
    GetLocal,
    SetLocal,
    GetGlobal,
    DefineGlobal,
    SetGlobal,
    GetUpvalue,
    SetUpvalue,
    GetProperty,
    SetProperty,
    GetSuper,
    Equal,
    Greater,
    Less,
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,
    Print,
    Jump,
    JumpIfFalse,
    Loop,
    Call,
    Invoke,
    SuperInvoke,
    Closure,
    CloseUpvalue,
    Return,
    Class,
    Inherit,
    Method,
}

impl OpCode {
    #[inline(always)]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::from_repr(byte)
    }

    #[inline(always)]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Bytecode, a line per byte, and the constant pool of one function body.
#[derive(Debug, Default, Clone)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub lines: Vec<usize>,
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Chunk {
        Chunk::default()
    }

    pub fn write(&mut self, byte: u8, line: usize) {
        self.code.push(byte);
        self.lines.push(line)
    }

    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    pub fn find_constant(&self, value: &Value) -> Option<usize> {
        self.constants.iter().position(|constant| constant == value)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn read_line_from_offset(&self, offset: usize) -> Option<usize> {
        self.lines.get(offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use strum::EnumCount;

    #[test]
    fn test_every_opcode_byte_decodes() {
        for byte in 0..OpCode::COUNT as u8 {
            let op = OpCode::from_byte(byte).expect("dense opcode numbering");
            assert_eq!(op.to_byte(), byte);
        }
        assert_eq!(OpCode::from_byte(OpCode::COUNT as u8), None);
        assert_eq!(OpCode::from_byte(0xff), None);
    }

    #[test]
    fn test_write_keeps_lines_parallel() {
        let mut chunk = Chunk::new();
        chunk.write(OpCode::Nil.to_byte(), 1);
        chunk.write(OpCode::Return.to_byte(), 2);
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.lines, vec![1, 2]);
        assert_eq!(chunk.read_line_from_offset(1), Some(2));
        assert_eq!(chunk.read_line_from_offset(2), None);
    }

    #[test]
    fn test_find_constant() {
        let mut chunk = Chunk::new();
        let index = chunk.add_constant(Value::Number(1.5));
        chunk.add_constant(Value::Bool(true));
        assert_eq!(chunk.find_constant(&Value::Number(1.5)), Some(index));
        assert_eq!(chunk.find_constant(&Value::Nil), None);
    }
}
