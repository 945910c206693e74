pub mod ast;
pub mod errors;
pub mod lower;
pub mod plan;
pub mod span;
