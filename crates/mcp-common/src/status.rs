//! Uniform condition handling for the four MCP status types
//!
//! Every reconciler emits exactly one condition per pass, replacing whatever
//! was there before. [`StatusPatch`] captures that and lets reconcilers decide
//! whether a freshly computed status differs from the stored one in anything
//! other than timestamps.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::crd::{Condition, ConditionStatus};

/// Status subresource written by a reconciler
pub trait StatusPatch: Clone + PartialEq + Serialize {
    /// Mutable access to the condition list
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    /// Read access to the condition list
    fn conditions(&self) -> &[Condition];

    /// Reset every reconciler-stamped timestamp so two statuses can be compared
    fn clear_timestamps(&mut self);

    /// Replace the condition list with a single condition
    fn set_condition(
        &mut self,
        type_: &str,
        ok: bool,
        reason: &str,
        message: impl Into<String>,
    ) {
        *self.conditions_mut() = vec![Condition::new(
            type_,
            ConditionStatus::from(ok),
            reason,
            message,
        )];
    }

    /// Look up a condition by type
    fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions().iter().find(|c| c.type_ == type_)
    }

    /// Returns true if both statuses agree on everything except timestamps
    fn same_outcome(&self, other: &Self) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.clear_timestamps();
        b.clear_timestamps();
        a == b
    }

    /// Builder-style variant of [`StatusPatch::set_condition`]
    fn with_condition(
        mut self,
        type_: &str,
        ok: bool,
        reason: &str,
        message: impl Into<String>,
    ) -> Self {
        self.set_condition(type_, ok, reason, message);
        self
    }
}

/// Reset condition timestamps to the epoch
pub fn clear_condition_timestamps(conditions: &mut [Condition]) {
    for c in conditions {
        c.last_transition_time = DateTime::<Utc>::default();
    }
}

/// Decide whether a computed status needs to be written
///
/// A missing stored status always needs a write. Otherwise the write is
/// skipped when nothing but timestamps changed, which keeps status updates
/// from re-triggering the watch that produced them.
pub fn needs_update<S: StatusPatch>(current: Option<&S>, desired: &S) -> bool {
    match current {
        Some(current) => !current.same_outcome(desired),
        None => true,
    }
}
