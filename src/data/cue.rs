//! Cue timeline data structures

use std::ops::Index;
use std::sync::Arc;
use std::time::Duration;

/// A single timeline event, derived from one subtitle entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue {
    /// Sequence number as numbered in the source file
    pub sequence_number: u32,

    /// End time of the cue relative to timeline zero
    pub end_offset: Duration,
}

impl Cue {
    pub fn new(sequence_number: u32, end_offset: Duration) -> Self {
        Self {
            sequence_number,
            end_offset,
        }
    }
}

/// Ordered, immutable sequence of cues.
///
/// Cloning is cheap and shares the underlying storage, which is how the
/// engine gets a read-only view of the controller's timeline.
#[derive(Debug, Clone, Default)]
pub struct CueTimeline {
    cues: Arc<[Cue]>,
}

impl CueTimeline {
    /// Create a timeline from cues already in playback order
    pub fn new(cues: Vec<Cue>) -> Self {
        Self { cues: cues.into() }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.cues.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cue> {
        self.cues.iter()
    }

    /// End offset of the last cue, i.e. the nominal length of a run
    pub fn duration(&self) -> Duration {
        self.cues.last().map(|c| c.end_offset).unwrap_or_default()
    }

    /// Check whether end offsets are non-decreasing
    pub fn is_sorted(&self) -> bool {
        self.cues.windows(2).all(|w| w[0].end_offset <= w[1].end_offset)
    }
}

impl Index<usize> for CueTimeline {
    type Output = Cue;

    fn index(&self, index: usize) -> &Self::Output {
        &self.cues[index]
    }
}

impl<'a> IntoIterator for &'a CueTimeline {
    type Item = &'a Cue;
    type IntoIter = std::slice::Iter<'a, Cue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
