use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dates::DateRange;
use crate::labels::LabelSet;
use crate::levels::LevelSet;
use crate::rule::CustomFilterRule;

/// One independently enabled filter axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Levels,
    Labels,
    Dates,
    CustomFilters,
}

impl Dimension {
    /// Evaluation order, cheapest and most selective first
    pub const EVALUATION_ORDER: [Dimension; 4] = [
        Dimension::Levels,
        Dimension::Labels,
        Dimension::Dates,
        Dimension::CustomFilters,
    ];
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Levels => "levels",
            Self::Labels => "labels",
            Self::Dates => "dates",
            Self::CustomFilters => "custom filters",
        };
        f.write_str(s)
    }
}

/// A dimension value with its enabled flag
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggled<T> {
    pub is_enabled: bool,
    pub value: T,
}

impl<T> Toggled<T> {
    pub fn enabled(value: T) -> Self {
        Self {
            is_enabled: true,
            value,
        }
    }

    pub fn disabled(value: T) -> Self {
        Self {
            is_enabled: false,
            value,
        }
    }

    /// The value, if it takes part in evaluation
    pub fn active(&self) -> Option<&T> {
        self.is_enabled.then_some(&self.value)
    }
}

/// The complete filter configuration of a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaAggregate {
    pub levels: Toggled<LevelSet>,
    pub labels: Toggled<LabelSet>,
    pub dates: Toggled<DateRange>,
    pub custom_filters: Vec<CustomFilterRule>,
    pub is_custom_filters_enabled: bool,
}

impl Default for CriteriaAggregate {
    fn default() -> Self {
        Self {
            levels: Toggled::enabled(LevelSet::DEFAULT),
            labels: Toggled::enabled(LabelSet::default()),
            dates: Toggled::enabled(DateRange::DEFAULT),
            custom_filters: vec![CustomFilterRule::default()],
            is_custom_filters_enabled: true,
        }
    }
}

impl CriteriaAggregate {
    pub fn is_enabled(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Levels => self.levels.is_enabled,
            Dimension::Labels => self.labels.is_enabled,
            Dimension::Dates => self.dates.is_enabled,
            Dimension::CustomFilters => self.is_custom_filters_enabled,
        }
    }

    pub fn set_enabled(&mut self, dimension: Dimension, is_enabled: bool) {
        match dimension {
            Dimension::Levels => self.levels.is_enabled = is_enabled,
            Dimension::Labels => self.labels.is_enabled = is_enabled,
            Dimension::Dates => self.dates.is_enabled = is_enabled,
            Dimension::CustomFilters => self.is_custom_filters_enabled = is_enabled,
        }
    }

    /// Value equality with the dimension's default; the enabled flag is ignored
    pub fn is_default(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Levels => self.levels.value.is_default(),
            Dimension::Labels => self.labels.value.is_default(),
            Dimension::Dates => self.dates.value.is_default(),
            Dimension::CustomFilters => {
                self.custom_filters.len() == 1 && self.custom_filters[0].is_default()
            }
        }
    }

    /// Restore one dimension's value, keeping its enabled flag
    pub fn reset(&mut self, dimension: Dimension) {
        match dimension {
            Dimension::Levels => self.levels.value = LevelSet::DEFAULT,
            Dimension::Labels => self.labels.value = LabelSet::default(),
            Dimension::Dates => self.dates.value = DateRange::DEFAULT,
            Dimension::CustomFilters => self.custom_filters = vec![CustomFilterRule::default()],
        }
    }

    /// Everything that affects which entries pass
    pub fn effective(&self) -> EffectiveCriteria<'_> {
        EffectiveCriteria {
            levels: self.levels.active().copied(),
            labels: self.labels.active(),
            dates: self.dates.active(),
            rules: if self.is_custom_filters_enabled {
                self.custom_filters.iter().filter(|r| r.is_active()).collect()
            } else {
                Vec::new()
            },
        }
    }
}

/// The parts of an aggregate evaluation depends on
///
/// Two aggregates with equal effective criteria let the same entries through.
#[derive(Debug, PartialEq)]
pub struct EffectiveCriteria<'a> {
    pub levels: Option<LevelSet>,
    pub labels: Option<&'a LabelSet>,
    pub dates: Option<&'a DateRange>,
    pub rules: Vec<&'a CustomFilterRule>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RuleField, RuleOperator};
    use logsieve_types::Level;

    #[test]
    fn test_initial_aggregate_is_at_default() {
        let aggregate = CriteriaAggregate::default();
        for dimension in Dimension::EVALUATION_ORDER {
            assert!(aggregate.is_default(dimension), "{} not default", dimension);
            assert!(aggregate.is_enabled(dimension));
        }
    }

    #[test]
    fn test_is_default_ignores_enabled_flag() {
        let mut aggregate = CriteriaAggregate::default();
        aggregate.set_enabled(Dimension::Labels, false);
        assert!(aggregate.is_default(Dimension::Labels));
    }

    #[test]
    fn test_reset_keeps_enabled_flag() {
        let mut aggregate = CriteriaAggregate::default();
        aggregate.levels = Toggled::disabled(LevelSet::from_levels([Level::Error]));
        aggregate.reset(Dimension::Levels);
        assert!(aggregate.is_default(Dimension::Levels));
        assert!(!aggregate.levels.is_enabled);
    }

    #[test]
    fn test_custom_filters_default_needs_single_default_rule() {
        let mut aggregate = CriteriaAggregate::default();
        aggregate.custom_filters.push(CustomFilterRule::default());
        assert!(!aggregate.is_default(Dimension::CustomFilters));
        aggregate.reset(Dimension::CustomFilters);
        assert!(aggregate.is_default(Dimension::CustomFilters));
    }

    #[test]
    fn test_effective_skips_incomplete_rules() {
        let mut aggregate = CriteriaAggregate::default();
        let before = aggregate.clone();
        aggregate.custom_filters.push(CustomFilterRule::default());
        assert_eq!(aggregate.effective(), before.effective());

        aggregate.custom_filters.push(CustomFilterRule::new(
            RuleField::Message,
            RuleOperator::Contains,
            "timeout",
        ));
        assert_ne!(aggregate.effective(), before.effective());
    }

    #[test]
    fn test_effective_ignores_disabled_dimension_values() {
        let mut a = CriteriaAggregate::default();
        let mut b = CriteriaAggregate::default();
        a.levels = Toggled::disabled(LevelSet::EMPTY);
        b.levels = Toggled::disabled(LevelSet::ALL);
        assert_eq!(a.effective(), b.effective());
    }
}
