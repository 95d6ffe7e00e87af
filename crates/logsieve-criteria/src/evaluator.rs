use parking_lot::Mutex;
use std::collections::BTreeMap;

use logsieve_types::{ArcLogEntry, LogEntry, SessionPredicate};

use crate::aggregate::{CriteriaAggregate, Dimension};
use crate::error::ConfigWarning;
use crate::rule::{CompiledRule, RuleId, RuleOutcome};

/// An aggregate compiled for repeated evaluation
///
/// Patterns are compiled once. Configuration warnings are kept once per rule
/// and logged the first time they are seen.
#[derive(Debug)]
pub struct Evaluator {
    aggregate: CriteriaAggregate,
    rules: Vec<CompiledRule>,
    warnings: Mutex<BTreeMap<RuleId, ConfigWarning>>,
}

impl Evaluator {
    pub fn new(aggregate: CriteriaAggregate) -> Self {
        Self::build(aggregate, BTreeMap::new())
    }

    /// Compile `aggregate`, keeping the warnings `previous` already reported
    /// for rules that are unchanged
    pub fn carry_forward(aggregate: CriteriaAggregate, previous: &Evaluator) -> Self {
        let inherited = {
            let seen = previous.warnings.lock();
            aggregate
                .custom_filters
                .iter()
                .filter_map(|rule| {
                    let warning = seen.get(&rule.id)?;
                    let old = previous.rules.iter().find(|old| old.rule().id == rule.id)?;
                    (old.rule() == rule).then(|| (rule.id, warning.clone()))
                })
                .collect()
        };
        Self::build(aggregate, inherited)
    }

    fn build(aggregate: CriteriaAggregate, inherited: BTreeMap<RuleId, ConfigWarning>) -> Self {
        let rules: Vec<CompiledRule> = aggregate
            .custom_filters
            .iter()
            .map(CompiledRule::compile)
            .filter(CompiledRule::is_active)
            .collect();

        let evaluator = Self {
            aggregate,
            rules,
            warnings: Mutex::new(inherited),
        };
        for rule in &evaluator.rules {
            if let Some(warning) = rule.compile_warning() {
                evaluator.record(warning);
            }
        }
        evaluator
    }

    pub fn aggregate(&self) -> &CriteriaAggregate {
        &self.aggregate
    }

    /// Warnings seen so far, ordered by rule
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        self.warnings.lock().values().cloned().collect()
    }

    pub fn passes<S>(&self, entry: &LogEntry, session: &S) -> bool
    where
        S: SessionPredicate + ?Sized,
    {
        self.passes_in_order(entry, session, &Dimension::EVALUATION_ORDER)
    }

    /// Conjunction over `order`; any permutation gives the same answer
    pub fn passes_in_order<S>(&self, entry: &LogEntry, session: &S, order: &[Dimension]) -> bool
    where
        S: SessionPredicate + ?Sized,
    {
        order
            .iter()
            .all(|dimension| self.dimension_passes(*dimension, entry, session))
    }

    pub fn dimension_passes<S>(&self, dimension: Dimension, entry: &LogEntry, session: &S) -> bool
    where
        S: SessionPredicate + ?Sized,
    {
        let aggregate = &self.aggregate;
        match dimension {
            Dimension::Levels => aggregate
                .levels
                .active()
                .is_none_or(|levels| levels.contains(entry.level)),
            Dimension::Labels => aggregate
                .labels
                .active()
                .is_none_or(|labels| labels.allows(&entry.label)),
            Dimension::Dates => aggregate
                .dates
                .active()
                .is_none_or(|dates| dates.allows(entry.timestamp, session)),
            Dimension::CustomFilters => {
                !aggregate.is_custom_filters_enabled || self.rules_pass(entry)
            }
        }
    }

    fn rules_pass(&self, entry: &LogEntry) -> bool {
        self.rules.iter().all(|rule| match rule.evaluate(entry) {
            RuleOutcome::Warned(warning) => {
                self.record(&warning);
                false
            }
            outcome => outcome.passed(),
        })
    }

    /// Keep and log a warning; false if the rule already had one
    fn record(&self, warning: &ConfigWarning) -> bool {
        let mut warnings = self.warnings.lock();
        if warnings.contains_key(&warning.rule()) {
            return false;
        }
        tracing::warn!(rule = %warning.rule(), "{}", warning);
        warnings.insert(warning.rule(), warning.clone());
        true
    }

    /// Entries that pass, in input order
    pub fn filter<'a, I, S>(&self, entries: I, session: &S) -> Vec<ArcLogEntry>
    where
        I: IntoIterator<Item = &'a ArcLogEntry>,
        S: SessionPredicate + ?Sized,
    {
        entries
            .into_iter()
            .filter(|entry| self.passes(entry, session))
            .cloned()
            .collect()
    }
}

/// Evaluate an aggregate against one entry
///
/// Compiles the aggregate on every call; streams should build an
/// [`Evaluator`] once instead.
pub fn passes<S>(aggregate: &CriteriaAggregate, entry: &LogEntry, session: &S) -> bool
where
    S: SessionPredicate + ?Sized,
{
    Evaluator::new(aggregate.clone()).passes(entry, session)
}
