//! Transcript export format
//!
//! A transcript has one line per record:
//!
//! ```text
//! [00:00:05] captured text
//! [00:00:09]
//! [00:00:14] first line
//!   second line
//! ```
//!
//! Multi-line captures keep their line breaks. Each continuation line is
//! indented by two spaces, so captured text that itself looks like a label
//! stays with the record above it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::CapturedRecord;

const CONTINUATION_INDENT: &str = "  ";

/// Errors raised while writing a transcript
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing was captured, transcript not written")]
    Empty,
    #[error("failed to write transcript {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A `(label, text)` pair read back from a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub timestamp_label: String,
    pub text: String,
}

fn label_regex() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| {
        Regex::new(r"^\[(\d{2,}:\d{2}:\d{2})\](?: (.*))?$").expect("valid label regex")
    })
}

/// Render records as transcript text
pub fn render_transcript(records: &[CapturedRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push('[');
        out.push_str(&record.timestamp_label);
        out.push_str("] ");
        let mut lines = record.text.split('\n');
        out.push_str(lines.next().unwrap_or_default());
        out.push('\n');
        for line in lines {
            out.push_str(CONTINUATION_INDENT);
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Write records to `path`, returning the number of records written
pub fn write_transcript(path: &Path, records: &[CapturedRecord]) -> Result<usize, ExportError> {
    if records.is_empty() {
        return Err(ExportError::Empty);
    }

    let io_err = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(render_transcript(records).as_bytes())
        .map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    Ok(records.len())
}

/// Parse transcript text back into `(label, text)` pairs
pub fn parse_transcript(contents: &str) -> Vec<TranscriptLine> {
    let mut lines: Vec<TranscriptLine> = Vec::new();

    for line in contents.lines() {
        let caps = match line.strip_prefix(CONTINUATION_INDENT) {
            Some(_) => None,
            None => label_regex().captures(line),
        };

        if let Some(caps) = caps {
            lines.push(TranscriptLine {
                timestamp_label: caps[1].to_string(),
                text: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
            });
        } else if let Some(last) = lines.last_mut() {
            // Unindented lines are accepted as continuations too
            let text = line.strip_prefix(CONTINUATION_INDENT).unwrap_or(line);
            last.text.push('\n');
            last.text.push_str(text);
        }
    }

    lines
}
