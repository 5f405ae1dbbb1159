pub mod objects;
pub mod std_mod;

pub mod call_frame;
pub mod chunk;
pub mod compiler;
pub mod constants;
pub mod debug;
pub mod error;
pub mod scanner;
pub mod table;
pub mod value;
pub mod vm;

pub use compiler::compile;
pub use error::{CompileError, RuntimeError};
pub use vm::{InterpretResult, VM};
