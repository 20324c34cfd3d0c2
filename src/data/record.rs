//! Captured records and the append-only sink that collects them

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One captured result, produced by the engine for a single cue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRecord {
    /// Index of the cue within the timeline (0-based)
    pub cue_index: usize,

    /// Sequence number of the cue in the subtitle file
    pub sequence_number: u32,

    /// Cue end time formatted as `HH:MM:SS`
    pub timestamp_label: String,

    /// Trimmed capture text (may be empty)
    pub text: String,
}

/// Format a timeline offset as `HH:MM:SS`.
///
/// Sub-second parts are truncated. Hours are not wrapped, so offsets past
/// 99 hours simply get a wider field.
pub fn format_timestamp_label(offset: Duration) -> String {
    let total = offset.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Append-only, ordered container of captured records.
///
/// The sink is shared between the run thread (which appends) and the
/// controller (which takes snapshots), so clones refer to the same records.
#[derive(Debug, Clone, Default)]
pub struct RecordSink {
    records: Arc<Mutex<Vec<CapturedRecord>>>,
}

impl RecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the end of the sink
    pub fn append(&self, record: CapturedRecord) {
        self.lock().push(record);
    }

    /// Copy of all records appended so far, in order
    pub fn snapshot(&self) -> Vec<CapturedRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove all records. Only the engine calls this, and only while idle.
    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CapturedRecord>> {
        // A panic while holding the lock cannot leave a half-pushed Vec behind.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, text: &str) -> CapturedRecord {
        CapturedRecord {
            cue_index: index,
            sequence_number: index as u32 + 1,
            timestamp_label: format_timestamp_label(Duration::from_secs(index as u64)),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_format_timestamp_label() {
        assert_eq!(format_timestamp_label(Duration::ZERO), "00:00:00");
        assert_eq!(format_timestamp_label(Duration::from_millis(5_999)), "00:00:05");
        assert_eq!(format_timestamp_label(Duration::from_secs(3_723)), "01:02:03");
        assert_eq!(format_timestamp_label(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn test_append_preserves_order() {
        let sink = RecordSink::new();
        sink.append(record(0, "first"));
        sink.append(record(1, "second"));

        let snapshot = sink.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].text, "first");
        assert_eq!(snapshot[1].cue_index, 1);
    }

    #[test]
    fn test_clones_share_records() {
        let sink = RecordSink::new();
        let reader = sink.clone();
        sink.append(record(0, "shared"));
        assert_eq!(reader.len(), 1);

        sink.clear();
        assert!(reader.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let sink = RecordSink::new();
        sink.append(record(0, "a"));
        let snapshot = sink.snapshot();
        sink.append(record(1, "b"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_concurrent_append_and_snapshot() {
        let sink = RecordSink::new();
        let writer = sink.clone();

        let handle = std::thread::spawn(move || {
            for i in 0..200 {
                writer.append(record(i, "x"));
            }
        });

        while !handle.is_finished() {
            let snapshot = sink.snapshot();
            for (i, r) in snapshot.iter().enumerate() {
                assert_eq!(r.cue_index, i);
            }
        }
        handle.join().unwrap();
        assert_eq!(sink.len(), 200);
    }
}
