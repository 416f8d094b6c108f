//! Identity confirmation gate.
//!
//! Debounces noisy per-frame recognition into a binary unlock decision: the
//! same known identity must be recognized `max_score` times in a row before
//! the gate opens, and a single unknown face closes it again.

use crate::identity::{Identity, IdentityRegistry};
use crate::types::FaceLabel;

/// Which identity, if any, the gate is currently accumulating points for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    NoCandidate,
    Tracking(String),
}

/// Frame-by-frame unlock decision state machine.
#[derive(Debug)]
pub struct ConfirmationGate {
    registry: IdentityRegistry,
    state: GateState,
    max_score: u32,
}

impl ConfirmationGate {
    /// `max_score` is used for identities bound lazily during `update`;
    /// identities already in `registry` keep their own threshold.
    pub fn new(registry: IdentityRegistry, max_score: u32) -> Self {
        Self {
            registry,
            state: GateState::NoCandidate,
            max_score,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// The identity currently being tracked.
    pub fn tracked(&self) -> Option<&Identity> {
        match &self.state {
            GateState::Tracking(name) => self.registry.lookup(name),
            GateState::NoCandidate => None,
        }
    }

    /// Whether the current state asserts the unlock signal.
    pub fn is_unlocked(&self) -> bool {
        self.tracked().is_some_and(Identity::verified)
    }

    /// Process one frame's labels in oracle order and return the unlock
    /// decision for this frame. The last label processed determines the
    /// final state.
    pub fn update<'a, I>(&mut self, labels: I) -> bool
    where
        I: IntoIterator<Item = &'a FaceLabel>,
    {
        for label in labels {
            match label {
                FaceLabel::Unknown => self.lose_track(),
                FaceLabel::Known(name) => self.observe(name),
            }
        }
        self.is_unlocked()
    }

    fn lose_track(&mut self) {
        if let GateState::Tracking(name) = std::mem::take(&mut self.state) {
            if let Some(identity) = self.registry.lookup_mut(&name) {
                identity.reset();
            }
            tracing::debug!(name = %name, "lost track");
        }
    }

    fn observe(&mut self, name: &str) {
        let already_tracking = matches!(&self.state, GateState::Tracking(current) if current == name);
        if !already_tracking {
            self.lose_track();
            if self.registry.add(Identity::new(name, self.max_score)) {
                tracing::debug!(name, "bound identity not present at enrollment");
            }
            if let Some(identity) = self.registry.lookup_mut(name) {
                identity.reset();
            }
            self.state = GateState::Tracking(name.to_string());
            tracing::debug!(name, "tracking candidate");
        }

        if let Some(identity) = self.registry.lookup_mut(name) {
            identity.add_point();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(name: &str) -> FaceLabel {
        FaceLabel::Known(name.into())
    }

    fn gate(max_score: u32) -> ConfirmationGate {
        let mut reg = IdentityRegistry::new();
        reg.add(Identity::new("alice", max_score));
        reg.add(Identity::new("bob", max_score));
        ConfirmationGate::new(reg, max_score)
    }

    #[test]
    fn test_unlocks_after_max_score_frames() {
        let mut g = gate(3);
        let alice = [known("alice")];
        let decisions: Vec<bool> = (0..3).map(|_| g.update(&alice)).collect();
        assert_eq!(decisions, vec![false, false, true]);
        assert_eq!(g.state(), &GateState::Tracking("alice".into()));

        assert!(!g.update(&[FaceLabel::Unknown]));
        assert_eq!(g.state(), &GateState::NoCandidate);
        assert_eq!(g.registry().lookup("alice").unwrap().score(), 0);
    }

    #[test]
    fn test_score_monotonic_then_saturates() {
        let mut g = gate(4);
        let alice = [known("alice")];
        let mut scores = Vec::new();
        for _ in 0..7 {
            g.update(&alice);
            scores.push(g.tracked().unwrap().score());
        }
        assert_eq!(scores, vec![1, 2, 3, 4, 4, 4, 4]);
        assert!(g.is_unlocked());
    }

    #[test]
    fn test_last_face_in_frame_wins() {
        let mut g = gate(2);
        g.update(&[known("alice")]);
        assert!(g.update(&[known("alice")]));

        let decision = g.update(&[known("alice"), FaceLabel::Unknown]);
        assert!(!decision);
        assert_eq!(g.state(), &GateState::NoCandidate);
    }

    #[test]
    fn test_unknown_then_known_in_same_frame_starts_fresh() {
        let mut g = gate(2);
        g.update(&[known("alice")]);
        g.update(&[FaceLabel::Unknown, known("alice")]);
        assert_eq!(g.tracked().unwrap().score(), 1);
    }

    #[test]
    fn test_empty_frame_keeps_state() {
        let mut g = gate(2);
        g.update(&[known("alice")]);
        g.update(&[known("alice")]);
        assert!(g.update(&[]));
        assert_eq!(g.tracked().unwrap().score(), 2);
    }

    #[test]
    fn test_no_candidate_never_unlocks() {
        let mut g = gate(1);
        assert!(!g.update(&[]));
        assert!(!g.update(&[FaceLabel::Unknown]));
    }

    #[test]
    fn test_switching_candidate_restarts_count() {
        let mut g = gate(3);
        g.update(&[known("alice")]);
        g.update(&[known("alice")]);
        assert!(!g.update(&[known("bob")]));

        assert_eq!(g.state(), &GateState::Tracking("bob".into()));
        assert_eq!(g.registry().lookup("alice").unwrap().score(), 0);
        assert_eq!(g.registry().lookup("bob").unwrap().score(), 1);
    }

    #[test]
    fn test_retracked_identity_does_not_inherit_old_score() {
        let mut g = gate(2);
        g.update(&[known("alice")]);
        assert!(g.update(&[known("alice")]));
        g.update(&[FaceLabel::Unknown]);
        assert!(!g.update(&[known("alice")]));
    }

    #[test]
    fn test_lazily_binds_unregistered_name() {
        let mut g = ConfirmationGate::new(IdentityRegistry::new(), 2);
        g.update(&[known("carol")]);
        assert!(g.update(&[known("carol")]));
        assert_eq!(g.registry().lookup("carol").unwrap().max_score(), 2);
    }

    #[test]
    fn test_decision_matches_state() {
        let mut g = gate(2);
        let frames = [
            vec![known("alice")],
            vec![known("alice")],
            vec![known("bob"), known("alice")],
            vec![],
            vec![known("alice")],
            vec![FaceLabel::Unknown],
        ];
        for frame in &frames {
            let decision = g.update(frame);
            let expected = g.tracked().is_some_and(|i| i.score() >= i.max_score());
            assert_eq!(decision, expected);
        }
    }
}
