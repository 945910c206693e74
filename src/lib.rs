pub mod diagnostics;
pub mod language;
pub mod parser;
pub mod runtime;

#[cfg(test)]
mod tests;
