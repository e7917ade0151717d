//! # Field Modifications
//!
//! `Modification<T>` is the before/after pair carried by every field of a
//! modification event. Consumers (history recorders, reconciliation
//! triggers) inspect `has_changed()` or map the pair into a derived flag
//! and ask whether *that* changed.

use serde::{Deserialize, Serialize};

/// The previous and current value of a tracked field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification<T> {
    /// Value before the tracked command(s).
    pub previous: T,
    /// Value after the tracked command(s).
    pub current: T,
}

impl<T: PartialEq> Modification<T> {
    /// Pair a previous value with a current one.
    pub fn new(previous: T, current: T) -> Self {
        Self { previous, current }
    }

    /// Whether the value differs between previous and current.
    pub fn has_changed(&self) -> bool {
        self.previous != self.current
    }

    /// Run `f` only when the value changed. Returns whether it ran.
    pub fn if_changed(&self, f: impl FnOnce(&Self)) -> bool {
        if self.has_changed() {
            f(self);
            true
        } else {
            false
        }
    }
}

impl<T> Modification<T> {
    /// Apply `mapper` to both sides.
    pub fn map<U>(&self, mut mapper: impl FnMut(&T) -> U) -> Modification<U> {
        Modification {
            previous: mapper(&self.previous),
            current: mapper(&self.current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unchanged_pair_reports_no_change() {
        let m = Modification::new(Some(3), Some(3));
        assert!(!m.has_changed());
        assert!(!m.if_changed(|_| panic!("must not run")));
    }

    #[test]
    fn map_can_hide_a_change() {
        // 4 -> 6 changed, but both are even.
        let m = Modification::new(4, 6);
        assert!(m.has_changed());
        assert!(!m.map(|v| v % 2 == 0).has_changed());
    }

    #[test]
    fn if_changed_runs_with_both_sides() {
        let m = Modification::new("a".to_string(), "b".to_string());
        let mut seen = None;
        assert!(m.if_changed(|m| seen = Some((m.previous.clone(), m.current.clone()))));
        assert_eq!(seen, Some(("a".to_string(), "b".to_string())));
    }

    proptest! {
        #[test]
        fn has_changed_matches_inequality(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(Modification::new(a, b).has_changed(), a != b);
        }
    }
}
