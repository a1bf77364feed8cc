use crate::period::Period;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Figures of one series keyed by period. A missing key means "nothing recorded",
/// which is not the same as a stored zero.
pub type PeriodMap = BTreeMap<Period, Decimal>;

/// Periods for which an attendance record exists, whatever its value.
pub type RegisteredPeriodSet = BTreeSet<Period>;

/// Code-labelled, period-indexed figures for one employee.
///
/// Source series come from parsing the document and are append-only: the first
/// figure written for a `(code, period)` pair is kept. Derived series are owned by
/// adjustment rules and live in a separate map, so a rule can never overwrite a
/// source figure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    source: BTreeMap<String, PeriodMap>,
    derived: BTreeMap<String, PeriodMap>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a source figure. Returns `false` and keeps the existing figure when
    /// the pair was already written.
    pub fn insert_source(&mut self, code: &str, period: Period, value: Decimal) -> bool {
        let series = self.source.entry(code.to_string()).or_default();
        if series.contains_key(&period) {
            return false;
        }
        series.insert(period, value);
        true
    }

    /// Makes sure a source series exists even if none of its cells held a number.
    pub fn ensure_source(&mut self, code: &str) {
        self.source.entry(code.to_string()).or_default();
    }

    /// Replaces a derived series wholesale. Refuses codes that name a source series.
    pub fn set_derived(&mut self, code: &str, values: PeriodMap) -> bool {
        if self.source.contains_key(code) {
            return false;
        }
        self.derived.insert(code.to_string(), values);
        true
    }

    /// Looks up a series, source first, then derived.
    pub fn series(&self, code: &str) -> Option<&PeriodMap> {
        self.source.get(code).or_else(|| self.derived.get(code))
    }

    pub fn source_series(&self, code: &str) -> Option<&PeriodMap> {
        self.source.get(code)
    }

    pub fn value(&self, code: &str, period: Period) -> Option<Decimal> {
        self.series(code).and_then(|series| series.get(&period)).copied()
    }

    /// A copy of a series, empty when the code is unknown.
    pub fn series_or_empty(&self, code: &str) -> PeriodMap {
        self.series(code).cloned().unwrap_or_default()
    }

    pub fn is_derived(&self, code: &str) -> bool {
        self.derived.contains_key(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.source.contains_key(code) || self.derived.contains_key(code)
    }

    pub fn source_codes(&self) -> impl Iterator<Item = &str> {
        self.source.keys().map(String::as_str)
    }

    /// Every period present in any source series, ascending.
    pub fn periods(&self) -> Vec<Period> {
        let periods: BTreeSet<Period> = self
            .source
            .values()
            .flat_map(|series| series.keys().copied())
            .collect();
        periods.into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.derived.is_empty()
    }

    pub fn len(&self) -> usize {
        self.source.len() + self.derived.len()
    }
}
