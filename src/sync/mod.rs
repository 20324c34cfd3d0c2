//! Synchronization engine - replays a cue timeline against the action port

mod clock;
mod engine;
mod run_config;
#[cfg(test)]
mod testing;

use std::time::Duration;

use uuid::Uuid;

pub use clock::{ClockSource, SystemClock};
pub use engine::{create_engine_channels, EngineError, EngineSettings, RunOutcome, StopHandle, SyncEngine};
pub use run_config::{ConfigError, RunConfig, RunOptions};

/// Events emitted by the engine to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Countdown tick, emitted once per second of preparation
    Progress { remaining_secs: u32 },
    /// A cue finished its capture phase
    Log {
        cue_index: usize,
        sequence_number: u32,
        timestamp_label: String,
        text: String,
    },
    /// The run ended, either after the last cue or because it was stopped
    RunCompleted { was_stopped: bool },
    /// The run was rejected before the countdown began
    RunFailed { error: ConfigError },
}

/// Lifecycle phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Preparing,
    Running,
    Stopping,
    Completed,
    Failed,
}

/// Read-only view of the engine's run state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSnapshot {
    /// Identifier of the current (or last) run
    pub run_id: Option<Uuid>,
    pub phase: RunPhase,
    /// Seconds of countdown left while preparing
    pub prep_remaining: u32,
    /// Clock reading sampled as the run anchor
    pub start_instant: Option<Duration>,
    /// Index of the cue currently waited on or processed
    pub current_cue_index: usize,
    /// Configuration error of a failed run
    pub error: Option<String>,
}
