use std::fmt::Write;

use crate::{
    chunk::{Chunk, OpCode},
    objects::object::Object,
    value::Value,
};

/// Renders every instruction of `chunk` under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {} ==\n", name);

    let mut offset = 0;
    while offset < chunk.len() {
        let (text, next) = disassemble_instruction(chunk, offset);
        out.push_str(&text);
        out.push('\n');
        offset = next;
    }
    out
}

/// Renders the instruction at `offset` and returns the offset of the next one.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = format!("{:04} ", offset);
    let line = chunk.read_line_from_offset(offset);
    if offset > 0 && line == chunk.read_line_from_offset(offset - 1) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", line.unwrap_or(0));
    }

    let byte = chunk.code[offset];
    let next = match OpCode::from_byte(byte) {
        Some(
            op @ (OpCode::Constant
            | OpCode::GetGlobal
            | OpCode::DefineGlobal
            | OpCode::SetGlobal
            | OpCode::GetProperty
            | OpCode::SetProperty
            | OpCode::GetSuper
            | OpCode::Class
            | OpCode::Method),
        ) => constant_instruction(&mut out, op, chunk, offset),
        Some(
            op @ (OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetUpvalue
            | OpCode::SetUpvalue
            | OpCode::Call),
        ) => byte_instruction(&mut out, op, chunk, offset),
        Some(op @ (OpCode::Jump | OpCode::JumpIfFalse)) => jump_instruction(&mut out, op, 1, chunk, offset),
        Some(OpCode::Loop) => jump_instruction(&mut out, OpCode::Loop, -1, chunk, offset),
        Some(op @ (OpCode::Invoke | OpCode::SuperInvoke)) => invoke_instruction(&mut out, op, chunk, offset),
        Some(OpCode::Closure) => closure_instruction(&mut out, chunk, offset),
        Some(op) => {
            let _ = write!(out, "{}", op);
            offset + 1
        }
        None => {
            let _ = write!(out, "Unknown opcode {}", byte);
            offset + 1
        }
    };
    (out, next)
}

fn operand(chunk: &Chunk, offset: usize) -> u8 {
    chunk.code.get(offset).copied().unwrap_or(0)
}

fn constant(chunk: &Chunk, index: u8) -> String {
    chunk.constants.get(index as usize).map(Value::to_string).unwrap_or_default()
}

fn constant_instruction(out: &mut String, op: OpCode, chunk: &Chunk, offset: usize) -> usize {
    let index = operand(chunk, offset + 1);
    let _ = write!(out, "{:<16} {:4} '{}'", op.to_string(), index, constant(chunk, index));
    offset + 2
}

fn byte_instruction(out: &mut String, op: OpCode, chunk: &Chunk, offset: usize) -> usize {
    let slot = operand(chunk, offset + 1);
    let _ = write!(out, "{:<16} {:4}", op.to_string(), slot);
    offset + 2
}

fn jump_instruction(out: &mut String, op: OpCode, sign: isize, chunk: &Chunk, offset: usize) -> usize {
    let jump = (operand(chunk, offset + 1) as u16) << 8 | operand(chunk, offset + 2) as u16;
    let target = offset as isize + 3 + sign * jump as isize;
    let _ = write!(out, "{:<16} {:4} -> {}", op.to_string(), offset, target);
    offset + 3
}

fn invoke_instruction(out: &mut String, op: OpCode, chunk: &Chunk, offset: usize) -> usize {
    let index = operand(chunk, offset + 1);
    let argument_count = operand(chunk, offset + 2);
    let _ = write!(out, "{:<16} ({} args) {:4} '{}'", op.to_string(), argument_count, index, constant(chunk, index));
    offset + 3
}

fn closure_instruction(out: &mut String, chunk: &Chunk, mut offset: usize) -> usize {
    offset += 1;
    let index = operand(chunk, offset);
    offset += 1;
    let _ = write!(out, "{:<16} {:4} {}", OpCode::Closure.to_string(), index, constant(chunk, index));

    let upvalue_count = match chunk.constants.get(index as usize) {
        Some(Value::Object(Object::Function(function))) => function.upvalue_count,
        _ => 0,
    };
    for _ in 0..upvalue_count {
        let is_local = operand(chunk, offset);
        let slot = operand(chunk, offset + 1);
        let _ = write!(
            out,
            "\n{:04}    |                     {} {}",
            offset,
            if is_local == 1 { "local" } else { "upvalue" },
            slot
        );
        offset += 2;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::compile, table::Table};

    #[test]
    fn test_disassemble_simple_chunk() {
        let mut chunk = Chunk::new();
        let index = chunk.add_constant(Value::Number(1.2));
        chunk.write(OpCode::Constant.to_byte(), 123);
        chunk.write(index as u8, 123);
        chunk.write(OpCode::Negate.to_byte(), 123);
        chunk.write(OpCode::Return.to_byte(), 124);

        let text = disassemble_chunk(&chunk, "test chunk");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "== test chunk ==");
        assert_eq!(lines[1], "0000  123 Constant            0 '1.2'");
        assert_eq!(lines[2], "0002    | Negate");
        assert_eq!(lines[3], "0003  124 Return");
    }

    #[test]
    fn test_disassemble_jumps_and_closures() {
        let mut intern_strings = Table::new();
        let function = compile(
            "fun outer() { var x = 1; fun inner() { return x; } }\nwhile (false) print 1;",
            &mut intern_strings,
        )
        .expect("compiles");

        let text = disassemble_chunk(function.chunk(), "<script>");
        assert!(text.contains("Closure"));
        assert!(text.contains("JumpIfFalse"));
        assert!(text.contains("Loop"));

        let outer = function
            .chunk
            .constants
            .iter()
            .find_map(|constant| match constant {
                Value::Object(Object::Function(outer)) => Some(outer.clone()),
                _ => None,
            })
            .expect("outer is a constant of the script");
        let text = disassemble_chunk(outer.chunk(), &outer.to_string());
        assert!(text.starts_with("== <fn outer> =="));
        assert!(text.contains("local 1"));
    }

    #[test]
    fn test_unknown_opcode() {
        let mut chunk = Chunk::new();
        chunk.write(0xfe, 1);
        let (text, next) = disassemble_instruction(&chunk, 0);
        assert!(text.ends_with("Unknown opcode 254"));
        assert_eq!(next, 1);
    }
}
