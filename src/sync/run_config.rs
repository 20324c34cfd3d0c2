//! Per-run configuration, validated once when a run starts

use std::time::Duration;

use chrono::TimeDelta;
use thiserror::Error;

use crate::input::{parse_key_list, KeyCode, KeyParseError};

/// Raw options handed over by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Comma separated trigger chord, e.g. `"ctrl,alt,z"`
    pub trigger_keys: String,
    /// Optional chord sent right before the run anchor (e.g. `"space"` to start playback)
    pub begin_keys: Option<String>,
    /// Added to every cue end time; negative fires earlier
    pub offset_ms: i64,
    /// Whole seconds of countdown before the anchor
    pub prep_seconds: i64,
    /// Pause between trigger and capture
    pub settle_ms: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            trigger_keys: "ctrl,alt,z".to_string(),
            begin_keys: None,
            offset_ms: 0,
            prep_seconds: 5,
            settle_ms: 600,
        }
    }
}

/// Configuration errors detected before a run begins
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {source}")]
    Keys {
        field: &'static str,
        #[source]
        source: KeyParseError,
    },
    #[error("prep seconds must not be negative (got {0})")]
    NegativePrep(i64),
    #[error("prep seconds out of range (got {0})")]
    PrepOutOfRange(i64),
    #[error("offset of {0} ms is out of range")]
    OffsetOutOfRange(i64),
}

/// Validated, immutable configuration of a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub trigger_keys: Vec<KeyCode>,
    pub begin_keys: Option<Vec<KeyCode>>,
    pub offset: TimeDelta,
    pub prep_seconds: u32,
    pub settle: Duration,
}

impl RunConfig {
    pub fn from_options(options: &RunOptions) -> Result<Self, ConfigError> {
        let trigger_keys =
            parse_key_list(&options.trigger_keys).map_err(|source| ConfigError::Keys {
                field: "trigger keys",
                source,
            })?;

        let begin_keys = match options.begin_keys.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(list) => Some(parse_key_list(list).map_err(|source| ConfigError::Keys {
                field: "begin keys",
                source,
            })?),
        };

        let offset = TimeDelta::try_milliseconds(options.offset_ms)
            .ok_or(ConfigError::OffsetOutOfRange(options.offset_ms))?;

        if options.prep_seconds < 0 {
            return Err(ConfigError::NegativePrep(options.prep_seconds));
        }
        let prep_seconds = u32::try_from(options.prep_seconds)
            .map_err(|_| ConfigError::PrepOutOfRange(options.prep_seconds))?;

        Ok(Self {
            trigger_keys,
            begin_keys,
            offset,
            prep_seconds,
            settle: Duration::from_millis(options.settle_ms),
        })
    }

    /// Deadline of a cue relative to the run anchor
    pub fn fire_deadline(&self, end_offset: Duration) -> Duration {
        fire_deadline(end_offset, self.offset)
    }
}

/// `end_offset + offset`, where anything at or before the anchor becomes zero
fn fire_deadline(end_offset: Duration, offset: TimeDelta) -> Duration {
    let Ok(end) = TimeDelta::from_std(end_offset) else {
        return end_offset;
    };
    end.checked_add(&offset)
        .and_then(|deadline| deadline.to_std().ok())
        .unwrap_or(Duration::ZERO)
}
