//! Gallery matching: turns an oracle encoding into a [`FaceLabel`].

use crate::types::{Encoding, FaceLabel};

/// Default Euclidean tolerance; lower is stricter.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// An enrolled reference encoding.
#[derive(Debug, Clone)]
pub struct KnownFace {
    pub name: String,
    pub encoding: Encoding,
}

/// Result of matching a probe encoding against a gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub label: FaceLabel,
    /// Distance to the matched entry, or to the closest entry on a miss.
    /// `None` when the gallery is empty.
    pub distance: Option<f32>,
}

impl MatchResult {
    pub fn matched(&self) -> bool {
        matches!(self.label, FaceLabel::Known(_))
    }
}

/// Strategy for comparing a probe encoding against the enrolled gallery.
pub trait Matcher {
    fn compare(&self, probe: &Encoding, gallery: &[KnownFace]) -> MatchResult;
}

/// Tolerance matcher: the FIRST gallery entry within `tolerance` wins,
/// in enrollment order. The closest entry is not preferred.
#[derive(Debug, Clone, Copy)]
pub struct ToleranceMatcher {
    pub tolerance: f32,
}

impl Default for ToleranceMatcher {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Matcher for ToleranceMatcher {
    fn compare(&self, probe: &Encoding, gallery: &[KnownFace]) -> MatchResult {
        let mut closest: Option<f32> = None;

        for known in gallery {
            let d = probe.distance(&known.encoding);
            if d <= self.tolerance {
                return MatchResult {
                    label: FaceLabel::Known(known.name.clone()),
                    distance: Some(d),
                };
            }
            closest = Some(closest.map_or(d, |c| c.min(d)));
        }

        MatchResult {
            label: FaceLabel::Unknown,
            distance: closest,
        }
    }
}
