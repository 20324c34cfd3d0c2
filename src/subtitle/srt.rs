//! SubRip (.srt) loader
//!
//! Only the cue timing is kept; subtitle text is what the OCR tool reads
//! off the screen, so the file's own text is not needed.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use super::ParseError;
use crate::data::{Cue, CueTimeline};

fn timing_regex() -> &'static Regex {
    static TIMING: OnceLock<Regex> = OnceLock::new();
    TIMING.get_or_init(|| {
        Regex::new(
            r"^\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})",
        )
        .expect("valid timing regex")
    })
}

/// Load an SRT file from disk
pub fn load_srt(path: &Path) -> Result<CueTimeline, ParseError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let timeline = parse_srt(&contents)?;
    info!("Loaded {} cues from {:?}", timeline.len(), path);
    Ok(timeline)
}

/// Parse SRT text into a cue timeline
pub fn parse_srt(contents: &str) -> Result<CueTimeline, ParseError> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);

    let mut cues = Vec::new();
    let mut block: Vec<(usize, &str)> = Vec::new();

    for (number, line) in contents.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !block.is_empty() {
                cues.push(parse_block(&block, cues.len())?);
                block.clear();
            }
        } else {
            block.push((number + 1, line));
        }
    }
    if !block.is_empty() {
        cues.push(parse_block(&block, cues.len())?);
    }

    if cues.is_empty() {
        return Err(ParseError::Empty);
    }

    let timeline = CueTimeline::new(cues);
    if !timeline.is_sorted() {
        warn!("Subtitle cues are not ordered by end time; they will be triggered in file order");
    }
    Ok(timeline)
}

/// Parse a single block. `position` is the number of cues already parsed and
/// numbers blocks that lack an index line.
fn parse_block(block: &[(usize, &str)], position: usize) -> Result<Cue, ParseError> {
    let (first_line, first) = block[0];

    // The index line is optional in the wild; accept a block that starts with timing.
    let (sequence_number, timing) = match first.trim().parse::<u32>() {
        Ok(index) => (index, block.get(1)),
        Err(_) => {
            debug!("Block at line {} has no index, numbering it {}", first_line, position + 1);
            (position as u32 + 1, block.first())
        }
    };

    let Some(&(timing_line, timing)) = timing else {
        return Err(ParseError::MissingTiming { line: first_line });
    };

    let caps = timing_regex()
        .captures(timing)
        .ok_or_else(|| ParseError::InvalidTiming {
            line: timing_line,
            value: timing.trim().to_string(),
        })?;

    let invalid = || ParseError::InvalidTiming {
        line: timing_line,
        value: timing.trim().to_string(),
    };
    let field = |i: usize| caps[i].parse::<u64>().map_err(|_| invalid());

    let start = to_duration(field(1)?, field(2)?, field(3)?, &caps[4]).ok_or_else(invalid)?;
    let end = to_duration(field(5)?, field(6)?, field(7)?, &caps[8]).ok_or_else(invalid)?;

    if end < start {
        warn!(
            "Cue {} ends before it starts ({:?} < {:?})",
            sequence_number, end, start
        );
    }

    Ok(Cue::new(sequence_number, end))
}

/// `None` when the timestamp does not fit in a millisecond count
fn to_duration(hours: u64, minutes: u64, seconds: u64, fraction: &str) -> Option<Duration> {
    // "5" means 500ms, "05" means 50ms
    let millis = format!("{:0<3}", fraction).parse::<u64>().unwrap_or(0);
    let total = hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)?;
    Some(Duration::from_millis(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,500 --> 00:00:05,000\nWorld\nsecond line\n\n3\n00:00:04,000 --> 00:00:05,000\nSame end\n";

    #[test]
    fn test_parse_sample() {
        let timeline = parse_srt(SAMPLE).unwrap();
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[0].sequence_number, 1);
        assert_eq!(timeline[0].end_offset, Duration::from_secs(2));
        assert_eq!(timeline[1].end_offset, Duration::from_secs(5));
        assert_eq!(timeline[2].end_offset, Duration::from_secs(5));
        assert!(timeline.is_sorted());
    }

    #[test]
    fn test_parse_crlf_and_bom() {
        let text = "\u{feff}1\r\n00:01:00,250 --> 01:02:03,4\r\nText\r\n\r\n";
        let timeline = parse_srt(text).unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(
            timeline[0].end_offset,
            Duration::from_millis((3600 + 2 * 60 + 3) * 1000 + 400)
        );
    }

    #[test]
    fn test_dot_separator_and_missing_index() {
        let text = "00:00:01.000 --> 00:00:02.500\nNo index\n\n00:00:03.000 --> 00:00:04.000\nAgain\n";
        let timeline = parse_srt(text).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].sequence_number, 1);
        assert_eq!(timeline[1].sequence_number, 2);
        assert_eq!(timeline[0].end_offset, Duration::from_millis(2_500));
    }

    #[test]
    fn test_unsorted_cues_keep_file_order() {
        let text = "1\n00:00:04,000 --> 00:00:05,000\nA\n\n2\n00:00:01,000 --> 00:00:02,000\nB\n";
        let timeline = parse_srt(text).unwrap();
        assert_eq!(timeline[0].sequence_number, 1);
        assert_eq!(timeline[1].sequence_number, 2);
        assert!(!timeline.is_sorted());
    }

    #[test]
    fn test_invalid_timing() {
        let err = parse_srt("1\nnot a timestamp\nText\n").unwrap_err();
        match err {
            ParseError::InvalidTiming { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_timing_overflow_is_invalid() {
        let err = parse_srt("1\n00:00:01,000 --> 9999999999999999:00:00,000\nx\n").unwrap_err();
        match err {
            ParseError::InvalidTiming { line, value } => {
                assert_eq!(line, 2);
                assert!(value.contains("9999999999999999"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_large_hours_still_parse() {
        let timeline = parse_srt("1\n100:00:00,000 --> 100:00:01,5\nx\n").unwrap();
        assert_eq!(timeline[0].end_offset, Duration::from_millis(360_001_500));
    }

    #[test]
    fn test_missing_timing() {
        let err = parse_srt("7\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingTiming { line: 1 }));
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(parse_srt("\n\n"), Err(ParseError::Empty)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.srt");
        std::fs::write(&path, SAMPLE).unwrap();

        let timeline = load_srt(&path).unwrap();
        assert_eq!(timeline.len(), 3);

        let missing = load_srt(&dir.path().join("missing.srt")).unwrap_err();
        assert!(matches!(missing, ParseError::Io { .. }));
    }
}
