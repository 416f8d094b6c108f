//! Known identities and their confirmation scores.

use std::collections::HashMap;

/// Default number of consecutive recognitions needed before an identity is
/// verified.
pub const DEFAULT_MAX_SCORE: u32 = 10;

/// A known person with a saturating confirmation counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
    score: u32,
    max_score: u32,
}

impl Identity {
    pub fn new(name: impl Into<String>, max_score: u32) -> Self {
        Self {
            name: name.into(),
            score: 0,
            max_score,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    pub fn verified(&self) -> bool {
        self.score >= self.max_score
    }

    /// Add one point, saturating at `max_score`.
    pub fn add_point(&mut self) {
        if self.score < self.max_score {
            self.score += 1;
        }
    }

    pub fn reset(&mut self) {
        self.score = 0;
    }
}

/// Name-keyed identity store. `add` never overwrites an existing entry.
#[derive(Debug, Default, Clone)]
pub struct IdentityRegistry {
    people: HashMap<String, Identity>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `identity` if its name is not already registered.
    ///
    /// Returns `true` if it was inserted. An existing entry is left untouched.
    pub fn add(&mut self, identity: Identity) -> bool {
        if self.people.contains_key(identity.name()) {
            return false;
        }
        self.people.insert(identity.name.clone(), identity);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<Identity> {
        self.people.remove(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&Identity> {
        self.people.get(name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Identity> {
        self.people.get_mut(name)
    }

    /// All registered identities, in no particular order.
    pub fn list_all(&self) -> Vec<&Identity> {
        self.people.values().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.people.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}
