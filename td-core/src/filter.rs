//! Area/berth/train-id filtering over decoded TD events.

use std::collections::HashSet;

use crate::types::TdEvent;

/// Operator-supplied inclusion sets, built once at startup and immutable
/// for the rest of the session.
///
/// Train ids are accepted but currently inert: no decoded TD field carries
/// one. The dimension is reserved for TRUST schema support.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    areas: HashSet<String>,
    berths: HashSet<String>,
    train_ids: HashSet<String>,
}

impl FilterCriteria {
    pub fn new<A, B, T>(areas: A, berths: B, train_ids: T) -> Self
    where
        A: IntoIterator<Item = String>,
        B: IntoIterator<Item = String>,
        T: IntoIterator<Item = String>,
    {
        FilterCriteria {
            areas: areas.into_iter().collect(),
            berths: berths.into_iter().collect(),
            train_ids: train_ids.into_iter().collect(),
        }
    }

    /// True when no criteria were supplied at all.
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty() && self.berths.is_empty() && self.train_ids.is_empty()
    }

    /// Decide whether an event is worth surfacing. Pure and per-event.
    ///
    /// The area must match. Berth-movement events additionally need one of
    /// their berths in the berth set; every other class passes on area alone.
    /// That asymmetry is deliberate: heartbeats and signalling messages have
    /// no berth to match but are still wanted for a watched area.
    pub fn matches(&self, event: &TdEvent) -> bool {
        if !self.areas.contains(&event.area_id) {
            return false;
        }
        if event.msg_type.is_berth() {
            return self.berths.contains(&event.from_berth)
                || self.berths.contains(&event.to_berth);
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
