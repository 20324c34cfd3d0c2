//! Subtitle loading

mod srt;

use thiserror::Error;

pub use srt::{load_srt, parse_srt};

/// Errors raised while loading a subtitle file
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read subtitle file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("subtitle file contains no cues")]
    Empty,
    #[error("cue starting at line {line} has no timing line")]
    MissingTiming { line: usize },
    #[error("invalid timing at line {line}: {value:?}")]
    InvalidTiming { line: usize, value: String },
}
