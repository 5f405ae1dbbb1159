use thiserror::Error;

/// One diagnostic reported while compiling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct CompileError {
    pub line: usize,
    /// `" at 'lexeme'"`, `" at end"`, or empty for lexical errors.
    pub location: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),
    #[error("Only instances have properties.")]
    OnlyInstancesHaveProperties,
    #[error("Only instances have fields.")]
    OnlyInstancesHaveFields,
    #[error("Only instances have methods.")]
    OnlyInstancesHaveMethods,
    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: u8, got: u8 },
    #[error("Can only call functions and classes.")]
    NotCallable,
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("Superclass must be a class.")]
    SuperclassMustBeClass,
    #[error("Native function {name} failed: {message}")]
    Native { name: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_format() {
        let error = CompileError {
            line: 3,
            location: " at 'x'".to_string(),
            message: "Expect ';' after value.".to_string(),
        };
        assert_eq!(error.to_string(), "[line 3] Error at 'x': Expect ';' after value.");
    }

    #[test]
    fn test_runtime_error_messages() {
        assert_eq!(
            RuntimeError::ArityMismatch { expected: 2, got: 1 }.to_string(),
            "Expected 2 arguments but got 1."
        );
        assert_eq!(
            RuntimeError::UndefinedProperty("bar".to_string()).to_string(),
            "Undefined property 'bar'."
        );
    }
}
