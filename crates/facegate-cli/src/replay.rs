//! Offline gate replay from recorded label frames.
//!
//! One frame per line, as a JSON array of labels:
//!
//! ```text
//! ["alice"]
//! ["alice", "unknown"]
//! []
//! ```

use facegate_core::door::{FrameError, FrameSource};
use facegate_core::{Actuator, DetectedFace, FaceLabel};
use std::convert::Infallible;
use std::io::BufRead;

/// Reads label frames from a line-delimited JSON stream. Blank lines are
/// skipped.
pub struct ReplaySource<R> {
    reader: R,
    line: String,
    line_no: usize,
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> FrameSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<Vec<DetectedFace>>, FrameError> {
        loop {
            self.line.clear();
            self.line_no += 1;
            let n = self
                .reader
                .read_line(&mut self.line)
                .map_err(|e| FrameError::Fatal(format!("line {}: {e}", self.line_no)))?;
            if n == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let labels: Vec<String> = serde_json::from_str(trimmed)
                .map_err(|e| FrameError::Fatal(format!("line {}: {e}", self.line_no)))?;
            return Ok(Some(
                labels
                    .iter()
                    .map(|l| DetectedFace::labelled(FaceLabel::parse(l)))
                    .collect(),
            ));
        }
    }
}

/// Collects the per-frame decisions instead of driving hardware.
#[derive(Debug, Default)]
pub struct DecisionLog {
    pub decisions: Vec<bool>,
}

impl Actuator for DecisionLog {
    type Error = Infallible;

    fn set_unlocked(&mut self, unlocked: bool) -> Result<(), Infallible> {
        self.decisions.push(unlocked);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facegate_core::{run_door, CancellationToken, ConfirmationGate, GateState, IdentityRegistry};
    use std::io::Cursor;

    fn replay(input: &str, max_score: u32) -> (Vec<bool>, GateState) {
        let mut src = ReplaySource::new(Cursor::new(input.to_string()));
        let mut gate = ConfirmationGate::new(IdentityRegistry::new(), max_score);
        let mut log = DecisionLog::default();
        let summary = run_door(&mut src, &mut gate, &mut log, &CancellationToken::new()).unwrap();
        let frames = summary.frames as usize;
        log.decisions.truncate(frames);
        (log.decisions, gate.state().clone())
    }

    #[test]
    fn test_replay_unlock_then_revoke() {
        let (decisions, state) = replay("[\"Alice\"]\n[\"Alice\"]\n[\"Alice\"]\n[\"unknown\"]\n", 3);
        assert_eq!(decisions, vec![false, false, true, false]);
        assert_eq!(state, GateState::NoCandidate);
    }

    #[test]
    fn test_replay_skips_blank_lines() {
        let (decisions, _) = replay("\n[\"bob\"]\n\n[\"bob\"]\n", 2);
        assert_eq!(decisions, vec![false, true]);
    }

    #[test]
    fn test_replay_empty_frame() {
        let (decisions, state) = replay("[\"bob\"]\n[]\n", 1);
        assert_eq!(decisions, vec![true, true]);
        assert_eq!(state, GateState::Tracking("bob".into()));
    }

    #[test]
    fn test_replay_bad_line_is_fatal() {
        let mut src = ReplaySource::new(Cursor::new("[\"a\"]\nnot json\n".to_string()));
        assert!(src.next_frame().unwrap().is_some());
        let err = src.next_frame().unwrap_err();
        assert!(matches!(err, FrameError::Fatal(m) if m.starts_with("line 2")));
    }
}
