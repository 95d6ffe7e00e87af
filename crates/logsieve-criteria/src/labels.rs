use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Selected labels
///
/// An unrestricted set lets every label through, including labels the store
/// has not observed yet. A restricted set lets through only its members, so a
/// restricted empty set excludes everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    selected: BTreeSet<String>,
    is_restricted: bool,
}

impl LabelSet {
    /// Restrict to exactly the given labels
    pub fn restricted_to<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected: labels.into_iter().map(Into::into).collect(),
            is_restricted: true,
        }
    }

    /// Restricted to nothing
    pub fn none() -> Self {
        Self {
            selected: BTreeSet::new(),
            is_restricted: true,
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.is_restricted
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    /// Evaluation test
    #[inline]
    pub fn allows(&self, label: &str) -> bool {
        !self.is_restricted || self.selected.contains(label)
    }

    /// Reading side of the per-label toggle
    pub fn is_selected(&self, label: &str) -> bool {
        self.allows(label)
    }

    /// Writing side of the per-label toggle
    ///
    /// Deselecting a label while unrestricted starts a restriction to the
    /// rest of `universe`. A restriction that again covers all of a non-empty
    /// `universe` is lifted, so labels seen later pass too.
    pub fn set(&mut self, label: &str, is_selected: bool, universe: &[String]) {
        if !self.is_restricted {
            if is_selected {
                return;
            }
            self.is_restricted = true;
            self.selected = universe
                .iter()
                .filter(|l| l.as_str() != label)
                .cloned()
                .collect();
            return;
        }
        if is_selected {
            self.selected.insert(label.to_string());
            if self.covers(universe) {
                self.select_all();
            }
        } else {
            self.selected.remove(label);
        }
    }

    /// True iff every label of `universe` currently passes
    ///
    /// A restricted set never reads as all selected against an empty
    /// universe, so the combined toggle can always lift a restriction.
    pub fn is_all_selected(&self, universe: &[String]) -> bool {
        !self.is_restricted || self.covers(universe)
    }

    fn covers(&self, universe: &[String]) -> bool {
        !universe.is_empty() && universe.iter().all(|l| self.selected.contains(l))
    }

    /// Lift the restriction
    pub fn select_all(&mut self) {
        *self = Self::default();
    }

    /// Restrict to nothing
    pub fn clear(&mut self) {
        *self = Self::none();
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> Vec<String> {
        vec!["db".to_string(), "network".to_string(), "ui".to_string()]
    }

    #[test]
    fn test_default_is_unrestricted() {
        let set = LabelSet::default();
        assert!(set.is_default());
        assert!(set.allows("anything"));
        assert!(set.is_all_selected(&universe()));
    }

    #[test]
    fn test_restricted_empty_excludes_everything() {
        let set = LabelSet::none();
        assert!(!set.is_default());
        assert!(!set.allows("db"));
        assert!(!set.allows(""));
    }

    #[test]
    fn test_deselect_from_unrestricted_keeps_others() {
        let mut set = LabelSet::default();
        set.set("ui", false, &universe());
        assert!(set.is_restricted());
        assert!(set.allows("db"));
        assert!(set.allows("network"));
        assert!(!set.allows("ui"));
        assert!(!set.is_all_selected(&universe()));

        set.set("ui", true, &universe());
        assert!(set.is_all_selected(&universe()));
        assert!(set.is_default());
        assert!(set.allows("cache"));
    }

    #[test]
    fn test_partial_reselect_stays_restricted() {
        let mut set = LabelSet::default();
        set.set("ui", false, &universe());
        set.set("db", false, &universe());
        set.set("ui", true, &universe());
        assert!(set.is_restricted());
        assert!(!set.allows("db"));
        assert!(!set.allows("cache"));
    }

    #[test]
    fn test_empty_universe_never_reads_all_selected_when_restricted() {
        assert!(!LabelSet::none().is_all_selected(&[]));
        assert!(!LabelSet::restricted_to(["db"]).is_all_selected(&[]));
        assert!(LabelSet::default().is_all_selected(&[]));

        let mut set = LabelSet::none();
        set.set("db", true, &[]);
        assert!(set.is_restricted());
        assert!(set.allows("db"));
    }

    #[test]
    fn test_selecting_while_unrestricted_is_noop() {
        let mut set = LabelSet::default();
        set.set("db", true, &universe());
        assert!(set.is_default());
    }

    #[test]
    fn test_select_all_and_clear() {
        let mut set = LabelSet::restricted_to(["db"]);
        set.select_all();
        assert!(set.is_default());
        set.clear();
        assert_eq!(set, LabelSet::none());
    }
}
