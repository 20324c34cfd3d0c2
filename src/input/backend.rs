//! Action port trait: the engine's only way to touch the outside world

use std::time::Duration;

use thiserror::Error;

use super::KeyCode;

/// Failure to synthesize a key chord
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("failed to simulate {key}: {reason}")]
    Simulate { key: KeyCode, reason: String },
    #[error("no keys to trigger")]
    NoKeys,
}

/// Failure to read the shared result buffer
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("clipboard command {command} could not be started: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("clipboard command {command} failed: {stderr}")]
    Command { command: String, stderr: String },
    #[error("clipboard read timed out after {0:?}")]
    Timeout(Duration),
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Trigger/capture capability the engine drives once per cue.
///
/// The two operations fail independently so a broken trigger does not
/// prevent a capture attempt and vice versa.
pub trait ActionPort: Send + Sync {
    /// Press the chord (in order) and release it (in reverse order)
    fn trigger(&self, keys: &[KeyCode]) -> Result<(), ActionError>;

    /// Read the current contents of the result buffer
    fn capture(&self) -> Result<String, CaptureError>;
}

/// Create the desktop action port for the current platform
pub fn create_action_port(capture_timeout: Duration) -> Box<dyn ActionPort> {
    let clipboard = super::clipboard::ClipboardReader::detect(capture_timeout);
    tracing::info!("Using rdev key synthesis with clipboard reader {}", clipboard.command_line());
    Box::new(super::rdev_backend::RdevActionPort::new(clipboard))
}
