//! Criteria files
//!
//! A criteria file is TOML describing the initial aggregate:
//!
//! ```toml
//! custom_filters_enabled = true
//!
//! [levels]
//! select = ["warning", "error", "critical"]
//!
//! [labels]
//! enabled = false
//!
//! [dates]
//! preset = "today"
//!
//! [[filters]]
//! field = "message"
//! operator = "contains"
//! value = "timeout"
//! ```
//!
//! Omitted sections keep their defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use logsieve_types::Level;

use crate::aggregate::{CriteriaAggregate, Toggled};
use crate::dates::DateRange;
use crate::error::CriteriaConfigError;
use crate::labels::LabelSet;
use crate::levels::LevelSet;
use crate::rule::{CustomFilterRule, RuleField, RuleOperator};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaConfig {
    pub custom_filters_enabled: bool,
    pub levels: LevelsConfig,
    pub labels: LabelsConfig,
    pub dates: DatesConfig,
    pub filters: Vec<RuleConfig>,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            custom_filters_enabled: true,
            levels: LevelsConfig::default(),
            labels: LabelsConfig::default(),
            dates: DatesConfig::default(),
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsConfig {
    pub enabled: bool,
    /// Omitted means every level
    pub select: Option<Vec<Level>>,
}

impl Default for LevelsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            select: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    pub enabled: bool,
    /// Omitted means no restriction; an empty list excludes every label
    pub select: Option<Vec<String>>,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            select: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePreset {
    Recent,
    Today,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatesConfig {
    pub enabled: bool,
    pub session_only: bool,
    /// RFC 3339
    pub start: Option<String>,
    /// RFC 3339
    pub end: Option<String>,
    /// Takes precedence over `start`/`end`
    pub preset: Option<DatePreset>,
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_only: false,
            start: None,
            end: None,
            preset: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub field: String,
    pub operator: RuleOperator,
    #[serde(default)]
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl RuleConfig {
    pub fn to_rule(&self) -> CustomFilterRule {
        let mut rule =
            CustomFilterRule::new(RuleField::parse(&self.field), self.operator, self.value.clone());
        rule.is_enabled = self.enabled;
        rule
    }
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, CriteriaConfigError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|source| CriteriaConfigError::InvalidDate {
            value: value.to_string(),
            source,
        })
}

impl CriteriaConfig {
    /// Build the aggregate; `now` anchors date presets
    pub fn into_aggregate(self, now: DateTime<Utc>) -> Result<CriteriaAggregate, CriteriaConfigError> {
        let levels = self
            .levels
            .select
            .map(LevelSet::from_levels)
            .unwrap_or(LevelSet::DEFAULT);

        let labels = self
            .labels
            .select
            .map(LabelSet::restricted_to)
            .unwrap_or_default();

        let dates = match self.dates.preset {
            Some(DatePreset::Recent) => DateRange::recent(now),
            Some(DatePreset::Today) => DateRange::today(now),
            None => DateRange::between(
                self.dates.start.as_deref().map(parse_date).transpose()?,
                self.dates.end.as_deref().map(parse_date).transpose()?,
            ),
        };
        let dates = DateRange {
            is_current_session_only: self.dates.session_only,
            ..dates
        };

        let mut custom_filters: Vec<CustomFilterRule> =
            self.filters.iter().map(RuleConfig::to_rule).collect();
        if custom_filters.is_empty() {
            custom_filters.push(CustomFilterRule::default());
        }

        Ok(CriteriaAggregate {
            levels: Toggled {
                is_enabled: self.levels.enabled,
                value: levels,
            },
            labels: Toggled {
                is_enabled: self.labels.enabled,
                value: labels,
            },
            dates: Toggled {
                is_enabled: self.dates.enabled,
                value: dates,
            },
            custom_filters,
            is_custom_filters_enabled: self.custom_filters_enabled,
        })
    }
}

pub fn parse_criteria(raw: &str, path: &str) -> Result<CriteriaConfig, CriteriaConfigError> {
    toml::from_str::<CriteriaConfig>(raw).map_err(|source| CriteriaConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

pub fn load_criteria(path: &Path) -> Result<CriteriaConfig, CriteriaConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| CriteriaConfigError::Read {
        path: path_display.clone(),
        source,
    })?;
    parse_criteria(&raw, &path_display)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Dimension;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_file_is_initial_aggregate() {
        let config = parse_criteria("", "inline").unwrap();
        let aggregate = config.into_aggregate(now()).unwrap();
        assert_eq!(aggregate, CriteriaAggregate::default());
    }

    #[test]
    fn test_full_file() {
        let raw = r#"
custom_filters_enabled = true

[levels]
select = ["warning", "error", "critical"]

[labels]
enabled = false
select = ["net"]

[dates]
start = "2024-05-01T10:00:00Z"
end = "2024-05-01T11:00:00+00:00"

[[filters]]
field = "message"
operator = "contains"
value = "timeout"

[[filters]]
field = "metadata.duration_ms"
operator = "greater_than"
value = "250"
enabled = false
"#;
        let aggregate = parse_criteria(raw, "inline")
            .unwrap()
            .into_aggregate(now())
            .unwrap();

        assert_eq!(
            aggregate.levels.value,
            LevelSet::from_levels([Level::Warning, Level::Error, Level::Critical])
        );
        assert!(!aggregate.labels.is_enabled);
        assert_eq!(aggregate.labels.value, LabelSet::restricted_to(["net"]));
        assert_eq!(
            aggregate.dates.value.start,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(aggregate.custom_filters.len(), 2);
        assert_eq!(
            aggregate.custom_filters[1].field,
            RuleField::Metadata("duration_ms".to_string())
        );
        assert!(!aggregate.custom_filters[1].is_enabled);
        assert!(!aggregate.is_default(Dimension::CustomFilters));
    }

    #[test]
    fn test_empty_label_list_restricts_to_nothing() {
        let raw = "[labels]\nselect = []\n";
        let aggregate = parse_criteria(raw, "inline")
            .unwrap()
            .into_aggregate(now())
            .unwrap();
        assert_eq!(aggregate.labels.value, LabelSet::none());
    }

    #[test]
    fn test_preset_and_session_flag() {
        let raw = "[dates]\npreset = \"recent\"\nsession_only = true\n";
        let aggregate = parse_criteria(raw, "inline")
            .unwrap()
            .into_aggregate(now())
            .unwrap();
        assert!(aggregate.dates.value.is_current_session_only);
        assert_eq!(aggregate.dates.value.start, DateRange::recent(now()).start);
    }

    #[test]
    fn test_invalid_date_is_reported() {
        let raw = "[dates]\nstart = \"yesterday\"\n";
        let err = parse_criteria(raw, "inline")
            .unwrap()
            .into_aggregate(now())
            .unwrap_err();
        assert!(matches!(err, CriteriaConfigError::InvalidDate { .. }));
    }

    #[test]
    fn test_unknown_level_fails_to_parse() {
        let raw = "[levels]\nselect = [\"loud\"]\n";
        assert!(matches!(
            parse_criteria(raw, "inline"),
            Err(CriteriaConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = load_criteria(Path::new("/nonexistent/criteria.toml")).unwrap_err();
        assert!(matches!(err, CriteriaConfigError::Read { .. }));
    }
}
