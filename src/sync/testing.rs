//! Deterministic clock and action port used by engine tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{ClockSource, StopHandle};
use crate::input::{ActionError, ActionPort, CaptureError, KeyCode};

/// Virtual clock: `sleep` advances time instantly
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    stop_at: Mutex<Option<(Duration, StopHandle)>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop once virtual time reaches `at`
    pub fn stop_at(&self, at: Duration, handle: StopHandle) {
        *self.stop_at.lock().unwrap() = Some((at, handle));
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        let now = {
            let mut now = self.now.lock().unwrap();
            *now += duration;
            *now
        };

        if let Some((at, handle)) = self.stop_at.lock().unwrap().as_ref() {
            if now >= *at {
                handle.stop();
            }
        }
    }
}

/// Scripted action port that records when and what it was asked to do
pub struct FakePort {
    clock: Arc<ManualClock>,
    triggers: Mutex<Vec<(Duration, Vec<KeyCode>)>>,
    trigger_calls: AtomicUsize,
    capture_calls: AtomicUsize,
    fail_trigger_at: Mutex<Option<usize>>,
    fail_capture_at: Mutex<Option<usize>>,
    panic_capture_at: Mutex<Option<usize>>,
    capture_text: Mutex<Option<String>>,
    stop_after: Mutex<Option<(usize, StopHandle)>>,
}

impl FakePort {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            triggers: Mutex::new(Vec::new()),
            trigger_calls: AtomicUsize::new(0),
            capture_calls: AtomicUsize::new(0),
            fail_trigger_at: Mutex::new(None),
            fail_capture_at: Mutex::new(None),
            panic_capture_at: Mutex::new(None),
            capture_text: Mutex::new(None),
            stop_after: Mutex::new(None),
        }
    }

    pub fn fail_trigger_at(&self, call: usize) {
        *self.fail_trigger_at.lock().unwrap() = Some(call);
    }

    pub fn fail_capture_at(&self, call: usize) {
        *self.fail_capture_at.lock().unwrap() = Some(call);
    }

    pub fn panic_capture_at(&self, call: usize) {
        *self.panic_capture_at.lock().unwrap() = Some(call);
    }

    /// Return `text` from every successful capture
    pub fn set_capture_text(&self, text: &str) {
        *self.capture_text.lock().unwrap() = Some(text.to_string());
    }

    /// Request a stop right after the `count`-th capture returns
    pub fn stop_after_captures(&self, count: usize, handle: StopHandle) {
        *self.stop_after.lock().unwrap() = Some((count, handle));
    }

    /// Clock readings at every trigger call, in call order
    pub fn trigger_times(&self) -> Vec<Duration> {
        self.triggers.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    /// Chords passed to every trigger call, in call order
    pub fn trigger_keys(&self) -> Vec<Vec<KeyCode>> {
        self.triggers.lock().unwrap().iter().map(|(_, keys)| keys.clone()).collect()
    }
}

impl ActionPort for FakePort {
    fn trigger(&self, keys: &[KeyCode]) -> Result<(), ActionError> {
        let call = self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        self.triggers
            .lock()
            .unwrap()
            .push((self.clock.now(), keys.to_vec()));

        if *self.fail_trigger_at.lock().unwrap() == Some(call) {
            return Err(ActionError::Simulate {
                key: keys[0],
                reason: "input synthesis refused".to_string(),
            });
        }
        Ok(())
    }

    fn capture(&self) -> Result<String, CaptureError> {
        let call = self.capture_calls.fetch_add(1, Ordering::SeqCst);

        let result = if *self.fail_capture_at.lock().unwrap() == Some(call) {
            Err(CaptureError::Unavailable("clipboard locked".to_string()))
        } else if let Some(text) = self.capture_text.lock().unwrap().clone() {
            Ok(text)
        } else {
            Ok(format!("  capture {}\n", call))
        };

        if *self.panic_capture_at.lock().unwrap() == Some(call) {
            panic!("capture {} exploded", call);
        }

        if let Some((count, handle)) = self.stop_after.lock().unwrap().as_ref() {
            if call + 1 >= *count {
                handle.stop();
            }
        }

        result
    }
}
