use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use logsieve_types::{Level, LogEntry, LogStore};

use crate::aggregate::{CriteriaAggregate, Dimension};
use crate::dates::DateRange;
use crate::error::ConfigWarning;
use crate::evaluator::Evaluator;
use crate::levels::LevelSet;
use crate::rule::{CustomFilterRule, RuleId};

/// Immutable, revision-numbered criteria handed to evaluation passes
#[derive(Debug)]
pub struct CriteriaSnapshot {
    /// Bumped on every mutation
    pub revision: u64,
    /// Revision of the last mutation that changed which entries pass
    pub filter_revision: u64,
    pub evaluator: Evaluator,
}

impl CriteriaSnapshot {
    pub fn aggregate(&self) -> &CriteriaAggregate {
        self.evaluator.aggregate()
    }
}

/// Change notification sent to observers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CriteriaChange {
    pub revision: u64,
    pub filter_revision: u64,
}

impl CriteriaChange {
    /// Whether results computed at `handled` are stale
    pub fn needs_refilter_since(&self, handled: u64) -> bool {
        self.filter_revision > handled
    }
}

/// Owner of the live criteria
///
/// Every mutation clones the current aggregate, edits the clone and swaps in a
/// new snapshot under one write lock, so evaluation never sees a partial edit.
pub struct CriteriaController {
    store: Arc<dyn LogStore>,
    current: RwLock<Arc<CriteriaSnapshot>>,
    changes: watch::Sender<CriteriaChange>,
}

impl CriteriaController {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self::with_aggregate(store, CriteriaAggregate::default())
    }

    pub fn with_aggregate(store: Arc<dyn LogStore>, aggregate: CriteriaAggregate) -> Self {
        let snapshot = CriteriaSnapshot {
            revision: 0,
            filter_revision: 0,
            evaluator: Evaluator::new(aggregate),
        };
        let (changes, _) = watch::channel(CriteriaChange::default());
        Self {
            store,
            current: RwLock::new(Arc::new(snapshot)),
            changes,
        }
    }

    /// Current criteria; cheap to clone and safe to hold across mutations
    pub fn snapshot(&self) -> Arc<CriteriaSnapshot> {
        self.current.read().clone()
    }

    pub fn aggregate(&self) -> CriteriaAggregate {
        self.snapshot().aggregate().clone()
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    /// Receive a notification after each mutation
    pub fn subscribe(&self) -> watch::Receiver<CriteriaChange> {
        self.changes.subscribe()
    }

    /// Evaluate one entry against the current criteria
    pub fn passes(&self, entry: &LogEntry) -> bool {
        self.snapshot().evaluator.passes(entry, self.store.as_ref())
    }

    pub fn warnings(&self) -> Vec<ConfigWarning> {
        self.snapshot().evaluator.warnings()
    }

    pub fn is_dimension_default(&self, dimension: Dimension) -> bool {
        self.snapshot().aggregate().is_default(dimension)
    }

    /// Whether a "reset all" would change anything
    pub fn is_reset_enabled(&self) -> bool {
        let snapshot = self.snapshot();
        Dimension::EVALUATION_ORDER
            .iter()
            .any(|d| !snapshot.aggregate().is_default(*d))
    }

    fn mutate<F>(&self, action: &'static str, edit: F) -> bool
    where
        F: FnOnce(&mut CriteriaAggregate),
    {
        let mut current = self.current.write();
        let previous = current.aggregate();
        let mut next = previous.clone();
        edit(&mut next);
        if next == *previous {
            return false;
        }

        let revision = current.revision + 1;
        let filter_revision = if next.effective() != previous.effective() {
            revision
        } else {
            current.filter_revision
        };
        let evaluator = Evaluator::carry_forward(next, &current.evaluator);
        *current = Arc::new(CriteriaSnapshot {
            revision,
            filter_revision,
            evaluator,
        });
        debug!(action, revision, filter_revision, "criteria changed");

        self.changes.send_replace(CriteriaChange {
            revision,
            filter_revision,
        });
        true
    }

    pub fn toggle_dimension(&self, dimension: Dimension, is_enabled: bool) -> bool {
        self.mutate("toggle_dimension", |a| a.set_enabled(dimension, is_enabled))
    }

    pub fn reset_dimension(&self, dimension: Dimension) -> bool {
        self.mutate("reset_dimension", |a| a.reset(dimension))
    }

    /// Back to the initial-session aggregate
    pub fn reset_all(&self) -> bool {
        self.mutate("reset_all", |a| *a = CriteriaAggregate::default())
    }

    /// Append a default, incomplete rule
    pub fn add_custom_filter(&self) -> RuleId {
        let rule = CustomFilterRule::default();
        let id = rule.id;
        self.mutate("add_custom_filter", |a| a.custom_filters.push(rule));
        id
    }

    /// Remove a rule; unknown ids are ignored
    pub fn remove_custom_filter(&self, id: RuleId) -> bool {
        self.mutate("remove_custom_filter", |a| {
            a.custom_filters.retain(|rule| rule.id != id)
        })
    }

    /// Edit a rule in place; the rule keeps its id
    pub fn update_custom_filter<F>(&self, id: RuleId, edit: F) -> bool
    where
        F: FnOnce(&mut CustomFilterRule),
    {
        self.mutate("update_custom_filter", |a| {
            if let Some(rule) = a.custom_filters.iter_mut().find(|rule| rule.id == id) {
                edit(rule);
                rule.id = id;
            }
        })
    }

    pub fn is_level_selected(&self, level: Level) -> bool {
        self.snapshot().aggregate().levels.value.contains(level)
    }

    pub fn set_level(&self, level: Level, is_selected: bool) -> bool {
        self.mutate("set_level", |a| a.levels.value.set(level, is_selected))
    }

    pub fn set_levels(&self, levels: LevelSet) -> bool {
        self.mutate("set_levels", |a| a.levels.value = levels)
    }

    /// Reading side of the "all levels" toggle
    pub fn all_levels_selected(&self) -> bool {
        self.snapshot().aggregate().levels.value.is_all()
    }

    /// Writing side of the "all levels" toggle: select everything or clear
    pub fn set_all_levels(&self, is_selected: bool) -> bool {
        let levels = if is_selected {
            LevelSet::ALL
        } else {
            LevelSet::EMPTY
        };
        self.mutate("set_all_levels", |a| a.levels.value = levels)
    }

    pub fn toggle_all_levels(&self) -> bool {
        self.set_all_levels(!self.all_levels_selected())
    }

    /// Known labels, from the store
    pub fn labels(&self) -> Vec<String> {
        self.store.labels()
    }

    pub fn is_label_selected(&self, label: &str) -> bool {
        self.snapshot().aggregate().labels.value.is_selected(label)
    }

    pub fn set_label(&self, label: &str, is_selected: bool) -> bool {
        let universe = self.store.labels();
        self.mutate("set_label", |a| {
            a.labels.value.set(label, is_selected, &universe)
        })
    }

    /// Reading side of the "all labels" toggle
    pub fn all_labels_selected(&self) -> bool {
        let universe = self.store.labels();
        self.snapshot()
            .aggregate()
            .labels
            .value
            .is_all_selected(&universe)
    }

    /// Writing side of the "all labels" toggle: lift the restriction or
    /// restrict to nothing
    pub fn set_all_labels(&self, is_selected: bool) -> bool {
        self.mutate("set_all_labels", |a| {
            if is_selected {
                a.labels.value.select_all();
            } else {
                a.labels.value.clear();
            }
        })
    }

    pub fn toggle_all_labels(&self) -> bool {
        self.set_all_labels(!self.all_labels_selected())
    }

    pub fn set_dates(&self, dates: DateRange) -> bool {
        self.mutate("set_dates", |a| a.dates.value = dates)
    }

    /// Switch the lower date bound on or off, keeping its date
    pub fn set_start_date_enabled(&self, is_enabled: bool) -> bool {
        self.mutate("set_start_date_enabled", |a| {
            a.dates.value.is_start_enabled = is_enabled
        })
    }

    /// Switch the upper date bound on or off, keeping its date
    pub fn set_end_date_enabled(&self, is_enabled: bool) -> bool {
        self.mutate("set_end_date_enabled", |a| {
            a.dates.value.is_end_enabled = is_enabled
        })
    }
}
