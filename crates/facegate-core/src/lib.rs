//! facegate-core: Identity confirmation for a face-unlocked door.
//!
//! Enrolls known faces through an external face oracle, matches per-frame
//! encodings against them, and debounces the results into a fail-closed
//! unlock signal.

pub mod actuation;
pub mod cancel;
pub mod config;
pub mod door;
pub mod enrollment;
pub mod gate;
pub mod identity;
pub mod matcher;
pub mod oracle;
pub mod progress;
pub mod types;

pub use actuation::{Actuator, FailClosed};
pub use cancel::CancellationToken;
pub use config::Config;
pub use door::{run_door, DoorError, DoorSummary, FrameError, FrameSource, StopReason};
pub use gate::{ConfirmationGate, GateState};
pub use identity::{Identity, IdentityRegistry};
pub use matcher::{KnownFace, MatchResult, Matcher, ToleranceMatcher};
pub use oracle::{FaceOracle, OracleError, SidecarOracle};
pub use types::{BoundingBox, DetectedFace, Encoding, FaceLabel, FaceObservation};
