use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranslateError>;

/// Anything that aborts a translation run.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("line {line}: malformed command `{text}`: {reason}")]
    MalformedCommand {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("unsupported arithmetic operation `{0}`")]
    UnsupportedOperation(String),

    #[error("invalid segment `{0}`")]
    InvalidSegment(String),

    #[error("module name `{0}` is not a valid symbol")]
    InvalidModuleName(String),

    #[error("bootstrap must be the first code of a run")]
    LateBootstrap,

    #[error("index {index} out of range for segment {segment} (max {max})")]
    IndexOutOfRange {
        segment: &'static str,
        index: u16,
        max: u16,
    },

    #[error("failed to write output: {0}")]
    Sink(#[from] io::Error),
}
