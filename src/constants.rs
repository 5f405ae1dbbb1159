/// Maximum number of nested call frames before a call reports a stack overflow.
pub const MAX_FRAMES_SIZE: usize = 64;

/// Width of a one-byte operand: locals, upvalues and constants per function are bounded by it.
pub const U8_COUNT: usize = u8::MAX as usize + 1;

/// Initial capacity of the value stack.
pub const MAX_STACK_SIZE: usize = MAX_FRAMES_SIZE * U8_COUNT;

/// Upper bound on declared parameters and call-site arguments.
pub const MAX_ARITY: usize = 255;

/// Deepest nesting of expressions, statements and function bodies the compiler accepts.
pub const MAX_NESTING_DEPTH: usize = 128;
