//! Synchronization engine
//!
//! Runs one timeline per run on a dedicated thread: an optional countdown,
//! then for every cue a wait until its deadline, a trigger, a fixed settle
//! pause and a capture. All deadlines are measured from a single anchor
//! sampled when the countdown ends, so timing error does not accumulate
//! from cue to cue.
//!
//! Per-cue failures of the action port are logged and recorded as empty
//! text; they never end a run. A stop request is honoured at the next poll
//! of a wait phase, never in the middle of a trigger/settle/capture step.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::data::{format_timestamp_label, CapturedRecord, Cue, CueTimeline, RecordSink};
use crate::input::{format_key_list, ActionPort};

use super::{ClockSource, ConfigError, EngineEvent, RunConfig, RunOptions, RunPhase, RunSnapshot};

/// Errors returned synchronously by [`SyncEngine::start`]
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot start a run with an empty timeline")]
    EmptyTimeline,
    #[error("a run is already in progress")]
    AlreadyRunning,
    #[error("invalid run configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to spawn run thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Engine-wide settings that outlive individual runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Upper bound on a single sleep while waiting for a deadline
    pub poll_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub was_stopped: bool,
    pub records: usize,
}

/// Cloneable handle that requests a stop from any thread
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request the active run to stop. Idempotent, and a no-op when idle.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

/// The synchronization engine drives runs and owns their state
pub struct SyncEngine {
    clock: Arc<dyn ClockSource>,
    port: Arc<dyn ActionPort>,
    settings: EngineSettings,
    /// Shared stop flag, cleared at the start of every run
    cancel: Arc<AtomicBool>,
    /// Event sender (controller holds the receiver)
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    /// Run state publisher, written by the engine only
    state_tx: Arc<watch::Sender<RunSnapshot>>,
    state_rx: watch::Receiver<RunSnapshot>,
    /// Records of the current (or last) run
    records: RecordSink,
    /// Thread running the current (or last) run
    worker: Option<JoinHandle<RunOutcome>>,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(
        clock: Arc<dyn ClockSource>,
        port: Arc<dyn ActionPort>,
        settings: EngineSettings,
        event_tx: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(RunSnapshot::default());

        Self {
            clock,
            port,
            settings,
            cancel: Arc::new(AtomicBool::new(false)),
            event_tx,
            state_tx: Arc::new(state_tx),
            state_rx,
            records: RecordSink::new(),
            worker: None,
        }
    }

    /// Start a run over `timeline`.
    ///
    /// The timeline and options are captured here; later changes made by the
    /// caller do not affect the run. Configuration errors move the engine to
    /// [`RunPhase::Failed`] and are also reported as [`EngineEvent::RunFailed`].
    pub fn start(&mut self, timeline: &CueTimeline, options: &RunOptions) -> Result<(), EngineError> {
        if self.is_running() {
            warn!("Run requested while another run is in progress");
            return Err(EngineError::AlreadyRunning);
        }
        if timeline.is_empty() {
            warn!("Run requested with an empty timeline");
            return Err(EngineError::EmptyTimeline);
        }

        // Reap the previous run thread, if any
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Previous run thread panicked");
            }
        }

        self.cancel.store(false, Ordering::SeqCst);
        self.records = RecordSink::new();
        let run_id = Uuid::new_v4();

        let config = match RunConfig::from_options(options) {
            Ok(config) => config,
            Err(e) => {
                error!("Run {} rejected: {}", run_id, e);
                self.state_tx.send_replace(RunSnapshot {
                    run_id: Some(run_id),
                    phase: RunPhase::Failed,
                    error: Some(e.to_string()),
                    ..RunSnapshot::default()
                });
                let _ = self.event_tx.send(EngineEvent::RunFailed { error: e.clone() });
                return Err(e.into());
            }
        };

        info!(
            "Run {} starting: {} cues, keys={}, offset={}ms, prep={}s, settle={:?}",
            run_id,
            timeline.len(),
            format_key_list(&config.trigger_keys),
            config.offset.num_milliseconds(),
            config.prep_seconds,
            config.settle
        );

        self.state_tx.send_replace(RunSnapshot {
            run_id: Some(run_id),
            phase: RunPhase::Preparing,
            prep_remaining: config.prep_seconds,
            ..RunSnapshot::default()
        });

        let worker = RunWorker {
            run_id,
            timeline: timeline.clone(),
            config,
            clock: self.clock.clone(),
            port: self.port.clone(),
            poll_interval: self.settings.poll_interval,
            cancel: self.cancel.clone(),
            records: self.records.clone(),
            event_tx: self.event_tx.clone(),
            state_tx: self.state_tx.clone(),
        };

        let handle = thread::Builder::new()
            .name("ocr-sync-run".to_string())
            .spawn(move || worker.run())?;
        self.worker = Some(handle);

        Ok(())
    }

    /// Request the active run to stop
    pub fn stop(&self) {
        if self.is_running() {
            info!("Stop requested");
        }
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Handle that can stop runs from another thread (e.g. a signal handler)
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Whether a run thread is still executing
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Block until the current run finishes
    pub fn wait(&mut self) -> Option<RunOutcome> {
        let handle = self.worker.take()?;
        match handle.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                error!("Run thread panicked");
                None
            }
        }
    }

    /// Current run state
    pub fn snapshot(&self) -> RunSnapshot {
        self.state_rx.borrow().clone()
    }

    /// Receiver notified on every run state change
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.state_tx.subscribe()
    }

    /// Records of the current (or last) run. Safe to read while a run is active.
    pub fn records(&self) -> RecordSink {
        self.records.clone()
    }

    /// Drop the records of the last run. Rejected while a run is active.
    pub fn clear_records(&self) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::AlreadyRunning);
        }
        self.records.clear();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stopped,
}

/// State and collaborators moved onto the run thread
struct RunWorker {
    run_id: Uuid,
    timeline: CueTimeline,
    config: RunConfig,
    clock: Arc<dyn ClockSource>,
    port: Arc<dyn ActionPort>,
    poll_interval: Duration,
    cancel: Arc<AtomicBool>,
    records: RecordSink,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    state_tx: Arc<watch::Sender<RunSnapshot>>,
}

impl RunWorker {
    fn run(self) -> RunOutcome {
        let flow = match self.countdown() {
            Flow::Stopped => Flow::Stopped,
            Flow::Continue => {
                self.fire_begin_keys();
                let anchor = self.clock.now();
                self.publish(|s| {
                    s.phase = RunPhase::Running;
                    s.prep_remaining = 0;
                    s.start_instant = Some(anchor);
                });
                debug!("Run {} anchored at {:?}", self.run_id, anchor);
                self.process_cues(anchor)
            }
        };

        let was_stopped = flow == Flow::Stopped;
        if was_stopped {
            self.publish(|s| s.phase = RunPhase::Stopping);
        }

        let outcome = RunOutcome {
            was_stopped,
            records: self.records.len(),
        };

        info!(
            "Run {} {}: {}/{} cues captured",
            self.run_id,
            if was_stopped { "stopped" } else { "completed" },
            outcome.records,
            self.timeline.len()
        );

        self.publish(|s| s.phase = RunPhase::Completed);
        self.emit(EngineEvent::RunCompleted { was_stopped });
        outcome
    }

    /// Count down `prep_seconds`, one progress event per second
    fn countdown(&self) -> Flow {
        let origin = self.clock.now();
        let prep = self.config.prep_seconds;

        for elapsed in 0..prep {
            let remaining = prep - elapsed;
            self.publish(|s| s.prep_remaining = remaining);
            self.emit(EngineEvent::Progress {
                remaining_secs: remaining,
            });

            let second_end = Duration::from_secs(u64::from(elapsed) + 1);
            if !self.wait_until(origin, second_end) {
                info!("Run {} stopped during countdown", self.run_id);
                return Flow::Stopped;
            }
        }

        Flow::Continue
    }

    fn fire_begin_keys(&self) {
        let Some(keys) = &self.config.begin_keys else {
            return;
        };

        match guarded(|| self.port.trigger(keys)) {
            Ok(Ok(())) => debug!("Sent begin keys {}", format_key_list(keys)),
            Ok(Err(e)) => warn!("Begin keys failed: {}", e),
            Err(msg) => error!("Begin keys panicked: {}", msg),
        }
    }

    fn process_cues(&self, anchor: Duration) -> Flow {
        for (index, cue) in self.timeline.iter().enumerate() {
            self.publish(|s| s.current_cue_index = index);

            let deadline = self.config.fire_deadline(cue.end_offset);
            if !self.wait_until(anchor, deadline) {
                info!("Run {} stopped before cue {}", self.run_id, index);
                return Flow::Stopped;
            }

            self.run_cue(index, cue);
        }

        Flow::Continue
    }

    /// Poll until `origin + target`, sleeping at most one polling quantum at a
    /// time. Returns false if a stop was requested first.
    fn wait_until(&self, origin: Duration, target: Duration) -> bool {
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return false;
            }

            let elapsed = self.clock.now().saturating_sub(origin);
            if elapsed >= target {
                return true;
            }

            self.clock.sleep((target - elapsed).min(self.poll_interval));
        }
    }

    /// Trigger, settle and capture a single cue. Always appends a record.
    fn run_cue(&self, index: usize, cue: &Cue) {
        match guarded(|| self.port.trigger(&self.config.trigger_keys)) {
            Ok(Ok(())) => debug!("Cue {} (#{}) triggered", index, cue.sequence_number),
            Ok(Err(e)) => warn!("Cue {} (#{}) trigger failed: {}", index, cue.sequence_number, e),
            Err(msg) => error!("Cue {} (#{}) trigger panicked: {}", index, cue.sequence_number, msg),
        }

        self.clock.sleep(self.config.settle);

        let text = match guarded(|| self.port.capture()) {
            Ok(Ok(text)) => normalize_capture(&text),
            Ok(Err(e)) => {
                warn!("Cue {} (#{}) capture failed: {}", index, cue.sequence_number, e);
                String::new()
            }
            Err(msg) => {
                error!("Cue {} (#{}) capture panicked: {}", index, cue.sequence_number, msg);
                String::new()
            }
        };

        let record = CapturedRecord {
            cue_index: index,
            sequence_number: cue.sequence_number,
            timestamp_label: format_timestamp_label(cue.end_offset),
            text,
        };

        self.records.append(record.clone());
        self.emit(EngineEvent::Log {
            cue_index: record.cue_index,
            sequence_number: record.sequence_number,
            timestamp_label: record.timestamp_label,
            text: record.text,
        });
    }

    fn publish(&self, update: impl FnOnce(&mut RunSnapshot)) {
        self.state_tx.send_modify(update);
    }

    fn emit(&self, event: EngineEvent) {
        // The controller may have gone away; the run still finishes
        let _ = self.event_tx.send(event);
    }
}

/// Run `f`, turning a panic into an error message
/// Trim the capture and use `\n` for every line break
fn normalize_capture(text: &str) -> String {
    text.trim().replace("\r\n", "\n").replace('\r', "\n")
}

fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Create the event channel for the engine
pub fn create_engine_channels() -> (
    mpsc::UnboundedSender<EngineEvent>,
    mpsc::UnboundedReceiver<EngineEvent>,
) {
    mpsc::unbounded_channel()
}
