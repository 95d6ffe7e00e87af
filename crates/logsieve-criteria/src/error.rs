use thiserror::Error;

use crate::rule::{RuleField, RuleId, RuleOperator};

/// Advisory problem with a custom rule; the rule fails, filtering goes on
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigWarning {
    #[error("rule {rule}: invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        rule: RuleId,
        pattern: String,
        reason: String,
    },

    #[error("rule {rule}: field '{field}' is not numeric, cannot apply '{operator}'")]
    NonNumericField {
        rule: RuleId,
        field: RuleField,
        operator: RuleOperator,
    },
}

impl ConfigWarning {
    pub fn rule(&self) -> RuleId {
        match self {
            Self::InvalidPattern { rule, .. } | Self::NonNumericField { rule, .. } => *rule,
        }
    }
}

/// Errors loading a criteria file
#[derive(Debug, Error)]
pub enum CriteriaConfigError {
    #[error("Failed to read criteria file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse criteria file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid date '{value}': {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
