use crate::ledger::{Ledger, PeriodMap};
use crate::period::Period;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Derives the INSS contribution base for months with vacation pay.
///
/// For every period present in any vacation-pay series (a stored zero counts),
/// `base = inss_valor / inss_comp * 100` is written to `target_code`. Periods
/// lacking either INSS figure, or with a zero contribution base, are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VacationAdjustmentRule {
    pub vacation_codes: Vec<String>,
    pub inss_comp_code: String,
    pub inss_valor_code: String,
    pub target_code: String,
}

impl Default for VacationAdjustmentRule {
    fn default() -> Self {
        Self {
            vacation_codes: vec![
                "167-Ferias".to_string(),
                "168-Ferias".to_string(),
                "173-Ferias".to_string(),
                "174-Ferias".to_string(),
            ],
            inss_comp_code: "527-INSS-Comp".to_string(),
            inss_valor_code: "527-INSS-Valor".to_string(),
            target_code: "3123-Base".to_string(),
        }
    }
}

impl VacationAdjustmentRule {
    pub fn affected_periods(&self, ledger: &Ledger) -> BTreeSet<Period> {
        self.vacation_codes
            .iter()
            .filter(|code| **code != self.target_code)
            .filter_map(|code| ledger.source_series(code))
            .flat_map(|series| series.keys().copied())
            .collect()
    }

    /// Computes the derived series without touching the ledger.
    pub fn compute(&self, ledger: &Ledger) -> PeriodMap {
        let hundred = Decimal::from(100);
        let mut base = PeriodMap::new();

        for period in self.affected_periods(ledger) {
            let comp = ledger
                .source_series(&self.inss_comp_code)
                .and_then(|series| series.get(&period));
            let valor = ledger
                .source_series(&self.inss_valor_code)
                .and_then(|series| series.get(&period));

            let (comp, valor) = match (comp, valor) {
                (Some(comp), Some(valor)) => (*comp, *valor),
                _ => {
                    debug!(
                        "Skipping {} for {}: INSS figures missing",
                        self.target_code, period
                    );
                    continue;
                }
            };

            let ratio = match valor.checked_div(comp) {
                Some(ratio) if !comp.is_zero() => ratio,
                _ => {
                    debug!(
                        "Skipping {} for {}: contribution base is zero",
                        self.target_code, period
                    );
                    continue;
                }
            };

            match ratio.checked_mul(hundred) {
                Some(value) => {
                    base.insert(period, value.normalize());
                }
                None => debug!("Skipping {} for {}: overflow", self.target_code, period),
            }
        }

        base
    }

    /// Writes the derived series into the ledger. Returns the number of periods written.
    pub fn apply(&self, ledger: &mut Ledger) -> usize {
        let base = self.compute(ledger);
        let count = base.len();

        if base.is_empty() && !ledger.is_derived(&self.target_code) {
            return 0;
        }

        if !ledger.set_derived(&self.target_code, base) {
            debug!(
                "{} is a source series; leaving it untouched",
                self.target_code
            );
            return 0;
        }

        debug!("{} written for {} period(s)", self.target_code, count);
        count
    }
}

/// Applies the default rule.
pub fn apply_vacation_adjustments(ledger: &mut Ledger) -> usize {
    VacationAdjustmentRule::default().apply(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    #[test]
    fn test_single_vacation_code_with_value() {
        let mut ledger = Ledger::new();
        ledger.ensure_source("173-Ferias");
        ledger.insert_source("174-Ferias", p(2024, 1), dec!(2000));
        ledger.insert_source("527-INSS-Comp", p(2024, 1), dec!(3000));
        ledger.insert_source("527-INSS-Valor", p(2024, 1), dec!(300));

        assert_eq!(apply_vacation_adjustments(&mut ledger), 1);
        assert_eq!(ledger.value("3123-Base", p(2024, 1)), Some(dec!(10)));
    }

    #[test]
    fn test_zero_vacation_values_still_mark_period() {
        let mut ledger = Ledger::new();
        for code in ["167-Ferias", "168-Ferias", "173-Ferias", "174-Ferias"] {
            ledger.insert_source(code, p(2024, 2), Decimal::ZERO);
        }
        ledger.insert_source("527-INSS-Comp", p(2024, 2), dec!(3000));
        ledger.insert_source("527-INSS-Valor", p(2024, 2), dec!(300));

        apply_vacation_adjustments(&mut ledger);
        assert_eq!(ledger.value("3123-Base", p(2024, 2)), Some(dec!(10)));
    }

    #[test]
    fn test_no_base_outside_vacation_periods() {
        let mut ledger = Ledger::new();
        ledger.insert_source("167-Ferias", p(2024, 1), dec!(500));
        ledger.insert_source("527-INSS-Comp", p(2024, 1), dec!(3000));
        ledger.insert_source("527-INSS-Valor", p(2024, 1), dec!(300));
        ledger.insert_source("527-INSS-Comp", p(2024, 2), dec!(3000));
        ledger.insert_source("527-INSS-Valor", p(2024, 2), dec!(330));

        apply_vacation_adjustments(&mut ledger);
        let base = ledger.series("3123-Base").unwrap();
        assert_eq!(base.len(), 1);
        assert!(!base.contains_key(&p(2024, 2)));
    }

    #[test]
    fn test_skips_missing_or_zero_inss() {
        let mut ledger = Ledger::new();
        ledger.insert_source("168-Ferias", p(2024, 3), dec!(100));
        ledger.insert_source("168-Ferias", p(2024, 4), dec!(100));
        ledger.insert_source("527-INSS-Comp", p(2024, 3), Decimal::ZERO);
        ledger.insert_source("527-INSS-Valor", p(2024, 3), dec!(300));
        ledger.insert_source("527-INSS-Comp", p(2024, 4), dec!(3000));

        assert_eq!(apply_vacation_adjustments(&mut ledger), 0);
        assert!(ledger.series("3123-Base").is_none());
    }

    #[test]
    fn test_reapplying_is_idempotent() {
        let mut ledger = Ledger::new();
        ledger.insert_source("173-Ferias", p(2024, 1), dec!(1500));
        ledger.insert_source("527-INSS-Comp", p(2024, 1), dec!(7786.02));
        ledger.insert_source("527-INSS-Valor", p(2024, 1), dec!(908.85));

        apply_vacation_adjustments(&mut ledger);
        let once = ledger.clone();
        apply_vacation_adjustments(&mut ledger);

        assert_eq!(ledger, once);
        assert_eq!(
            ledger.series("3123-Base"),
            once.series("3123-Base")
        );
    }

    #[test]
    fn test_source_series_are_not_modified() {
        let mut ledger = Ledger::new();
        ledger.insert_source("174-Ferias", p(2024, 1), dec!(2000));
        ledger.insert_source("527-INSS-Comp", p(2024, 1), dec!(3000));
        ledger.insert_source("527-INSS-Valor", p(2024, 1), dec!(300));
        let before: Vec<_> = ledger.source_codes().map(str::to_string).collect();

        apply_vacation_adjustments(&mut ledger);

        let after: Vec<_> = ledger.source_codes().map(str::to_string).collect();
        assert_eq!(before, after);
        assert_eq!(ledger.value("174-Ferias", p(2024, 1)), Some(dec!(2000)));
    }
}
