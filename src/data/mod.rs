//! Timeline and transcript data

mod cue;
pub mod format;
mod record;

pub use cue::{Cue, CueTimeline};
pub use format::{parse_transcript, write_transcript, ExportError};
pub use record::{format_timestamp_label, CapturedRecord, RecordSink};
