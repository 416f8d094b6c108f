use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used on the wire and in logs for a face that matched nobody.
pub const UNKNOWN_NAME: &str = "unknown";

/// Bounding box for a detected face, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl BoundingBox {
    /// Build from the `[top, right, bottom, left]` order the oracle reports.
    pub fn from_trbl([top, right, bottom, left]: [u32; 4]) -> Self {
        Self { top, right, bottom, left }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) to ({}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Face encoding vector (128-dimensional for the dlib-style oracles).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding {
    pub values: Vec<f32>,
}

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance between two encodings.
    ///
    /// Encodings of different lengths are never close: the distance is
    /// `f32::INFINITY`.
    pub fn distance(&self, other: &Encoding) -> f32 {
        if self.values.len() != other.values.len() {
            return f32::INFINITY;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One face reported by the oracle for a single image.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceObservation {
    pub bbox: BoundingBox,
    pub encoding: Encoding,
}

/// Result of matching a face against the enrolled gallery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FaceLabel {
    Known(String),
    Unknown,
}

impl FaceLabel {
    /// Parse a wire/log label; the `unknown` sentinel (any case) maps to
    /// [`FaceLabel::Unknown`].
    pub fn parse(label: &str) -> Self {
        if label.eq_ignore_ascii_case(UNKNOWN_NAME) {
            FaceLabel::Unknown
        } else {
            FaceLabel::Known(label.to_string())
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            FaceLabel::Known(name) => Some(name),
            FaceLabel::Unknown => None,
        }
    }
}

impl fmt::Display for FaceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceLabel::Known(name) => f.write_str(name),
            FaceLabel::Unknown => f.write_str(UNKNOWN_NAME),
        }
    }
}

/// A labelled face in one frame, as consumed by the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    /// Absent when the frame came from a label-only source (e.g. replay).
    pub bbox: Option<BoundingBox>,
    pub label: FaceLabel,
}

impl DetectedFace {
    pub fn labelled(label: FaceLabel) -> Self {
        Self { bbox: None, label }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical() {
        let a = Encoding::new(vec![0.1, 0.2, 0.3]);
        assert!(a.distance(&a).abs() < 1e-6);
    }

    #[test]
    fn test_distance_known_value() {
        let a = Encoding::new(vec![0.0, 0.0]);
        let b = Encoding::new(vec![3.0, 4.0]);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_length_mismatch() {
        let a = Encoding::new(vec![0.0, 0.0]);
        let b = Encoding::new(vec![0.0, 0.0, 0.0]);
        assert_eq!(a.distance(&b), f32::INFINITY);
    }

    #[test]
    fn test_label_parse_unknown_sentinel() {
        assert_eq!(FaceLabel::parse("unknown"), FaceLabel::Unknown);
        assert_eq!(FaceLabel::parse("Unknown"), FaceLabel::Unknown);
        assert_eq!(FaceLabel::parse("alice"), FaceLabel::Known("alice".into()));
    }

    #[test]
    fn test_bbox_from_trbl() {
        let b = BoundingBox::from_trbl([10, 60, 90, 20]);
        assert_eq!(b.width(), 40);
        assert_eq!(b.height(), 80);
        assert_eq!(b.to_string(), "(20, 10) to (60, 90)");
    }
}
