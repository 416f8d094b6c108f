//! Camera → oracle → matcher, one labelled frame at a time.

use crate::camera::{Camera, CameraError};
use crate::frame::Frame;
use facegate_core::door::{FrameError, FrameSource};
use facegate_core::{DetectedFace, FaceOracle, KnownFace, Matcher, OracleError};

/// Fraction of near-black pixels above which a frame is not worth encoding.
const DARK_FRAME_THRESHOLD: f32 = 0.95;

/// Label every face the oracle finds in `frame`.
///
/// Dark frames are reported as a sensor fault without calling the oracle.
pub fn label_frame<O, M>(
    oracle: &mut O,
    matcher: &M,
    gallery: &[KnownFace],
    frame: &Frame,
) -> Result<Vec<DetectedFace>, FrameError>
where
    O: FaceOracle + ?Sized,
    M: Matcher + ?Sized,
{
    if frame.is_dark(DARK_FRAME_THRESHOLD) {
        return Err(FrameError::Sensor(format!(
            "dark frame (seq {}, brightness {:.1})",
            frame.sequence,
            frame.avg_brightness()
        )));
    }

    let observations = oracle
        .encode_rgb(&frame.data, frame.width, frame.height)
        .map_err(oracle_fault)?;
    tracing::info!(seq = frame.sequence, "found {} faces in image", observations.len());

    Ok(observations
        .into_iter()
        .map(|obs| {
            let result = matcher.compare(&obs.encoding, gallery);
            tracing::info!(
                name = %result.label,
                distance = ?result.distance,
                "found {}'s face at box coordinates {}",
                result.label,
                obs.bbox
            );
            DetectedFace {
                bbox: Some(obs.bbox),
                label: result.label,
            }
        })
        .collect())
}

pub fn oracle_fault(err: OracleError) -> FrameError {
    if err.is_transient() {
        FrameError::Sensor(err.to_string())
    } else {
        FrameError::Fatal(err.to_string())
    }
}

pub fn camera_fault(err: CameraError) -> FrameError {
    if err.is_transient() {
        FrameError::Sensor(err.to_string())
    } else {
        FrameError::Fatal(err.to_string())
    }
}

/// Live camera feed for the door loop.
pub struct CameraFeed<O, M> {
    camera: Camera,
    oracle: O,
    matcher: M,
    gallery: Vec<KnownFace>,
}

impl<O: FaceOracle, M: Matcher> CameraFeed<O, M> {
    pub fn new(camera: Camera, oracle: O, matcher: M, gallery: Vec<KnownFace>) -> Self {
        Self {
            camera,
            oracle,
            matcher,
            gallery,
        }
    }
}

impl<O: FaceOracle, M: Matcher> FrameSource for CameraFeed<O, M> {
    fn next_frame(&mut self) -> Result<Option<Vec<DetectedFace>>, FrameError> {
        let frame = self.camera.capture_frame().map_err(camera_fault)?;
        label_frame(&mut self.oracle, &self.matcher, &self.gallery, &frame).map(Some)
    }
}
