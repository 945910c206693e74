use crate::language::plan::Arity;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error("wrong number of arguments (given {received}, expected {expected})")]
    WrongArgumentCount { expected: Arity, received: usize },
    #[error("wrong number of arguments: required argument {position} is missing (given {received})")]
    MissingArgument { position: usize, received: usize },
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow in `{operation}`")]
    Overflow { operation: &'static str },
}

impl RuntimeError {
    /// Arity failures are the only errors argument binding itself raises;
    /// everything else comes from evaluating a default value.
    pub fn is_arity_error(&self) -> bool {
        matches!(
            self,
            RuntimeError::WrongArgumentCount { .. } | RuntimeError::MissingArgument { .. }
        )
    }
}
