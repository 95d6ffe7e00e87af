use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use logsieve_types::{FieldValue, LogEntry};

use crate::error::ConfigWarning;

static NEXT_RULE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a custom rule, used for list diffing and removal
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(u64);

impl RuleId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_RULE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which part of an entry a rule looks at
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
    Level,
    Label,
    #[default]
    Message,
    File,
    Function,
    Line,
    /// Raw lookup into the entry's metadata
    Metadata(String),
}

impl RuleField {
    /// Parse a field name; anything unknown is a metadata key
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "level" => Self::Level,
            "label" => Self::Label,
            "message" => Self::Message,
            "file" => Self::File,
            "function" => Self::Function,
            "line" => Self::Line,
            other => Self::Metadata(
                other
                    .strip_prefix("metadata.")
                    .unwrap_or(other)
                    .to_string(),
            ),
        }
    }

    /// Look the field up on an entry
    pub fn resolve<'a>(&self, entry: &'a LogEntry) -> Option<Resolved<'a>> {
        match self {
            Self::Level => Some(Resolved::Text(Cow::Borrowed(entry.level.name()))),
            Self::Label => Some(Resolved::Text(Cow::Borrowed(&entry.label))),
            Self::Message => Some(Resolved::Text(Cow::Borrowed(&entry.message))),
            Self::File => entry.file.as_deref().map(|s| Resolved::Text(Cow::Borrowed(s))),
            Self::Function => entry
                .function
                .as_deref()
                .map(|s| Resolved::Text(Cow::Borrowed(s))),
            Self::Line => entry.line.map(|n| Resolved::Number(f64::from(n))),
            Self::Metadata(key) => entry.metadata.get(key).map(|v| match v {
                FieldValue::Number(n) => Resolved::Number(*n),
                FieldValue::Text(s) => Resolved::Text(Cow::Borrowed(s)),
            }),
        }
    }
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level => f.write_str("level"),
            Self::Label => f.write_str("label"),
            Self::Message => f.write_str("message"),
            Self::File => f.write_str("file"),
            Self::Function => f.write_str("function"),
            Self::Line => f.write_str("line"),
            Self::Metadata(key) => write!(f, "metadata.{}", key),
        }
    }
}

/// A field value as seen by a rule
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved<'a> {
    Text(Cow<'a, str>),
    Number(f64),
}

impl Resolved<'_> {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s.as_ref()),
            Self::Number(n) => Cow::Owned(n.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

/// How a rule compares the field with its value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Equals,
    NotEquals,
    #[default]
    Contains,
    NotContains,
    BeginsWith,
    Regex,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    IsEmpty,
    IsNotEmpty,
}

impl RuleOperator {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::LessThan | Self::LessOrEqual | Self::GreaterThan | Self::GreaterOrEqual
        )
    }

    /// Presence tests ignore the comparison value
    pub fn needs_value(&self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }
}

impl fmt::Display for RuleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equals => "equals",
            Self::NotEquals => "not equals",
            Self::Contains => "contains",
            Self::NotContains => "not contains",
            Self::BeginsWith => "begins with",
            Self::Regex => "regex",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::IsEmpty => "is empty",
            Self::IsNotEmpty => "is not empty",
        };
        f.write_str(s)
    }
}

/// A user-authored field/operator/value predicate
///
/// Equality ignores `id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomFilterRule {
    pub id: RuleId,
    pub field: RuleField,
    pub operator: RuleOperator,
    pub value: String,
    pub is_enabled: bool,
}

impl CustomFilterRule {
    pub fn new(field: RuleField, operator: RuleOperator, value: impl Into<String>) -> Self {
        Self {
            id: RuleId::next(),
            field,
            operator,
            value: value.into(),
            is_enabled: true,
        }
    }

    /// An incomplete rule is skipped during evaluation
    pub fn is_complete(&self) -> bool {
        if !self.operator.needs_value() {
            return true;
        }
        let value = self.value.trim();
        if value.is_empty() {
            return false;
        }
        if self.operator.is_numeric() {
            return value.parse::<f64>().is_ok();
        }
        true
    }

    pub fn is_default(&self) -> bool {
        self.field == RuleField::default()
            && self.operator == RuleOperator::default()
            && self.value.is_empty()
            && self.is_enabled
    }

    /// Whether the rule takes part in evaluation at all
    pub fn is_active(&self) -> bool {
        self.is_enabled && self.is_complete()
    }
}

impl Default for CustomFilterRule {
    fn default() -> Self {
        Self::new(RuleField::default(), RuleOperator::default(), "")
    }
}

impl PartialEq for CustomFilterRule {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
            && self.operator == other.operator
            && self.value == other.value
            && self.is_enabled == other.is_enabled
    }
}

impl Eq for CustomFilterRule {}

/// Result of applying one rule to one entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Disabled or incomplete
    Skipped,
    Matched,
    Rejected,
    /// The rule is misconfigured for this entry and fails
    Warned(ConfigWarning),
}

impl RuleOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Skipped | Self::Matched)
    }

    fn from_bool(matched: bool) -> Self {
        if matched { Self::Matched } else { Self::Rejected }
    }
}

/// A rule with its pattern and number parsed up front
#[derive(Clone, Debug)]
pub struct CompiledRule {
    rule: CustomFilterRule,
    is_active: bool,
    pattern: Option<Result<Regex, ConfigWarning>>,
    number: Option<f64>,
}

impl CompiledRule {
    pub fn compile(rule: &CustomFilterRule) -> Self {
        let is_active = rule.is_active();
        let pattern = (is_active && rule.operator == RuleOperator::Regex).then(|| {
            Regex::new(&rule.value).map_err(|e| ConfigWarning::InvalidPattern {
                rule: rule.id,
                pattern: rule.value.clone(),
                reason: e.to_string(),
            })
        });
        let number = rule.value.trim().parse::<f64>().ok();
        Self {
            rule: rule.clone(),
            is_active,
            pattern,
            number,
        }
    }

    pub fn rule(&self) -> &CustomFilterRule {
        &self.rule
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Warning known without looking at any entry
    pub fn compile_warning(&self) -> Option<&ConfigWarning> {
        match &self.pattern {
            Some(Err(warning)) => Some(warning),
            _ => None,
        }
    }

    pub fn evaluate(&self, entry: &LogEntry) -> RuleOutcome {
        if !self.is_active {
            return RuleOutcome::Skipped;
        }
        let rule = &self.rule;
        let resolved = rule.field.resolve(entry);

        match rule.operator {
            RuleOperator::IsEmpty => {
                return RuleOutcome::from_bool(resolved.as_ref().is_none_or(Resolved::is_empty));
            }
            RuleOperator::IsNotEmpty => {
                return RuleOutcome::from_bool(resolved.as_ref().is_some_and(|v| !v.is_empty()));
            }
            _ => {}
        }

        let Some(field) = resolved else {
            return RuleOutcome::Rejected;
        };
        let value = rule.value.as_str();

        match rule.operator {
            RuleOperator::Equals => RuleOutcome::from_bool(self.equals(&field)),
            RuleOperator::NotEquals => RuleOutcome::from_bool(!self.equals(&field)),
            RuleOperator::Contains => RuleOutcome::from_bool(field.as_text().contains(value)),
            RuleOperator::NotContains => RuleOutcome::from_bool(!field.as_text().contains(value)),
            RuleOperator::BeginsWith => RuleOutcome::from_bool(field.as_text().starts_with(value)),
            RuleOperator::Regex => match &self.pattern {
                Some(Ok(re)) => RuleOutcome::from_bool(re.is_match(&field.as_text())),
                Some(Err(warning)) => RuleOutcome::Warned(warning.clone()),
                None => RuleOutcome::Rejected,
            },
            RuleOperator::LessThan
            | RuleOperator::LessOrEqual
            | RuleOperator::GreaterThan
            | RuleOperator::GreaterOrEqual => self.compare(&field),
            RuleOperator::IsEmpty | RuleOperator::IsNotEmpty => RuleOutcome::Skipped,
        }
    }

    fn equals(&self, field: &Resolved<'_>) -> bool {
        match (field, self.number) {
            (Resolved::Number(n), Some(expected)) => *n == expected,
            _ => field.as_text() == self.rule.value,
        }
    }

    fn compare(&self, field: &Resolved<'_>) -> RuleOutcome {
        let (Some(actual), Some(expected)) = (field.as_number(), self.number) else {
            return RuleOutcome::Warned(ConfigWarning::NonNumericField {
                rule: self.rule.id,
                field: self.rule.field.clone(),
                operator: self.rule.operator,
            });
        };
        let matched = match self.rule.operator {
            RuleOperator::LessThan => actual < expected,
            RuleOperator::LessOrEqual => actual <= expected,
            RuleOperator::GreaterThan => actual > expected,
            RuleOperator::GreaterOrEqual => actual >= expected,
            _ => false,
        };
        RuleOutcome::from_bool(matched)
    }
}

/// Apply a single rule to an entry
pub fn matches(rule: &CustomFilterRule, entry: &LogEntry) -> bool {
    CompiledRule::compile(rule).evaluate(entry).passed()
}
