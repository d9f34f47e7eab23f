//! Translator from the stack VM intermediate language to Hack assembly.

pub mod ast;
pub mod driver;
pub mod error;
pub mod parser;
pub mod translator;

#[cfg(test)]
mod emulator;

pub use error::{Result, TranslateError};
pub use translator::Translator;
