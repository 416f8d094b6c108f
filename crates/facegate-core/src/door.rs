//! The door loop: frames in, one lock/unlock command out per frame.

use crate::actuation::{Actuator, FailClosed};
use crate::cancel::CancellationToken;
use crate::gate::ConfirmationGate;
use crate::types::DetectedFace;
use thiserror::Error;

/// Per-frame fault reported by a [`FrameSource`].
#[derive(Error, Debug)]
pub enum FrameError {
    /// Camera or oracle hiccup; the frame counts as empty.
    #[error("sensor fault: {0}")]
    Sensor(String),
    /// The source cannot continue.
    #[error("{0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum DoorError {
    #[error("frame source failed: {0}")]
    Source(String),
    #[error("failed to lock on exit: {0}")]
    Lock(String),
}

/// Produces labelled faces, one frame at a time.
pub trait FrameSource {
    /// `Ok(None)` means the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Vec<DetectedFace>>, FrameError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    EndOfInput,
}

/// Counters reported when the loop stops cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorSummary {
    pub frames: u64,
    pub sensor_faults: u64,
    pub unlocked_frames: u64,
    pub stop: StopReason,
}

/// Run the gate over `source` until cancelled, exhausted or failed.
///
/// The actuator is driven to locked on every exit path. Relay write errors
/// are logged and the loop continues; the next frame re-evaluates the output.
pub fn run_door<S, A>(
    source: &mut S,
    gate: &mut ConfirmationGate,
    actuator: &mut A,
    token: &CancellationToken,
) -> Result<DoorSummary, DoorError>
where
    S: FrameSource + ?Sized,
    A: Actuator,
{
    let mut relay = FailClosed::new(actuator);
    let mut frames = 0u64;
    let mut sensor_faults = 0u64;
    let mut unlocked_frames = 0u64;

    let stop = loop {
        if token.is_cancelled() {
            tracing::info!("cancellation requested; stopping door loop");
            break StopReason::Cancelled;
        }

        let faces = match source.next_frame() {
            Ok(Some(faces)) => faces,
            Ok(None) => {
                tracing::info!("frame source exhausted");
                break StopReason::EndOfInput;
            }
            Err(FrameError::Sensor(msg)) => {
                sensor_faults += 1;
                tracing::warn!(error = %msg, "frame failed; treating as empty");
                Vec::new()
            }
            Err(FrameError::Fatal(msg)) => {
                tracing::error!(error = %msg, "frame source failed; locking");
                if let Err(err) = relay.close() {
                    tracing::error!(error = %err, "failed to lock after source failure");
                }
                return Err(DoorError::Source(msg));
            }
        };

        frames += 1;
        let unlocked = gate.update(faces.iter().map(|f| &f.label));
        if unlocked {
            unlocked_frames += 1;
        }

        match gate.tracked() {
            Some(identity) => tracing::info!(
                frame = frames,
                faces = faces.len(),
                name = identity.name(),
                score = identity.score(),
                max_score = identity.max_score(),
                unlocked,
                "score for found person is {}/{}",
                identity.score(),
                identity.max_score()
            ),
            None => tracing::debug!(frame = frames, faces = faces.len(), unlocked, "no candidate"),
        }

        if let Err(err) = relay.set_unlocked(unlocked) {
            tracing::warn!(error = %err, unlocked, "relay write failed");
        }
    };

    relay.close().map_err(|e| DoorError::Lock(e.to_string()))?;

    Ok(DoorSummary {
        frames,
        sensor_faults,
        unlocked_frames,
        stop,
    })
}
