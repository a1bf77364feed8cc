use crate::config::ReconcilerConfig;
use crate::ledger::{PeriodMap, RegisteredPeriodSet};
use crate::period::Period;
use log::{debug, warn};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named leave category and its hours per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AfastamentoSeries {
    pub label: String,
    #[serde(default)]
    pub values: PeriodMap,
    /// Whether these hours are taken off the contracted hours.
    #[serde(default = "default_include")]
    pub include: bool,
}

fn default_include() -> bool {
    true
}

impl AfastamentoSeries {
    pub fn new(label: impl Into<String>, values: PeriodMap, include: bool) -> Self {
        Self {
            label: label.into(),
            values,
            include,
        }
    }
}

/// Attendance inputs of the reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceData {
    /// Worked hours per period.
    pub horas: PeriodMap,
    /// Absence hours per period.
    pub faltas: PeriodMap,
    /// Periods known to carry an attendance record, zero hours included.
    pub meses_registrados: Option<RegisteredPeriodSet>,
    pub afastamentos: Vec<AfastamentoSeries>,
}

impl AttendanceData {
    pub fn from_json_str(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_path<P: AsRef<std::path::Path>>(path: P) -> crate::error::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::error::FichaFinanceiraError::SourceNotFound(
                path.to_path_buf(),
            ));
        }
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn is_registered(&self, period: Period) -> bool {
        self.horas.contains_key(&period)
            || self
                .meses_registrados
                .as_ref()
                .map_or(false, |registered| registered.contains(&period))
    }

    /// Periods mentioned by any attendance series.
    pub fn periods(&self) -> BTreeSet<Period> {
        let mut periods: BTreeSet<Period> = self.horas.keys().copied().collect();
        periods.extend(self.faltas.keys().copied());
        if let Some(registered) = &self.meses_registrados {
            periods.extend(registered.iter().copied());
        }
        for afastamento in &self.afastamentos {
            periods.extend(afastamento.values.keys().copied());
        }
        periods
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySplit {
    pub worked_days: Decimal,
    pub vacation_days: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursRow {
    pub period: Period,
    /// Reference hours minus included leave ("HORAS TRAB.").
    pub contracted_hours: Decimal,
    pub faltas: Decimal,
    /// Contracted hours minus absences ("SALDO HORAS").
    pub balance: Decimal,
    /// Raw hours of every afastamento, in input order.
    pub afastamentos: Vec<Decimal>,
    /// `None` renders as blank cells.
    pub day_split: Option<DaySplit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursReport {
    pub afastamento_labels: Vec<String>,
    pub rows: Vec<HoursRow>,
}

pub struct HoursReconciler {
    config: ReconcilerConfig,
}

impl Default for HoursReconciler {
    fn default() -> Self {
        Self::new(ReconcilerConfig::default())
    }
}

impl HoursReconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// One row per requested period, ascending, duplicates collapsed. Periods
    /// whose figures overflow are left out.
    pub fn reconcile(&self, periods: &[Period], data: &AttendanceData) -> HoursReport {
        let periods: BTreeSet<Period> = periods.iter().copied().collect();

        let rows = periods
            .into_iter()
            .filter_map(|period| self.reconcile_period(period, data))
            .collect();

        HoursReport {
            afastamento_labels: data
                .afastamentos
                .iter()
                .map(|afastamento| afastamento.label.clone())
                .collect(),
            rows,
        }
    }

    /// `None` when the period's hours do not fit in a decimal.
    pub fn reconcile_period(&self, period: Period, data: &AttendanceData) -> Option<HoursRow> {
        let faltas = data.faltas.get(&period).copied().unwrap_or(Decimal::ZERO);

        let afastamentos: Vec<Decimal> = data
            .afastamentos
            .iter()
            .map(|afastamento| {
                afastamento
                    .values
                    .get(&period)
                    .copied()
                    .unwrap_or(Decimal::ZERO)
            })
            .collect();

        let totals = data
            .afastamentos
            .iter()
            .zip(&afastamentos)
            .filter(|(afastamento, _)| afastamento.include)
            .try_fold(Decimal::ZERO, |offset, (_, hours)| offset.checked_add(*hours))
            .and_then(|offset| self.config.reference_hours.checked_sub(offset))
            .and_then(|contracted| Some((contracted, contracted.checked_sub(faltas)?)));

        let (contracted_hours, balance) = match totals {
            Some(totals) => totals,
            None => {
                warn!("{}: hours out of range, period left out of the report", period);
                return None;
            }
        };

        let day_split = if data.is_registered(period) {
            let worked = data.horas.get(&period).copied().unwrap_or(Decimal::ZERO);
            self.day_split(worked, contracted_hours)
        } else {
            debug!("{}: no attendance record, day split left blank", period);
            None
        };

        Some(HoursRow {
            period,
            contracted_hours,
            faltas,
            balance,
            afastamentos,
            day_split,
        })
    }

    /// Worked/vacation days against the fixed monthly reference. `None` when the
    /// worked hours match the contracted hours, or the split overflows.
    pub fn day_split(&self, worked: Decimal, contracted_hours: Decimal) -> Option<DaySplit> {
        if worked == contracted_hours {
            return None;
        }

        let reference_hours = self.config.reference_hours;
        let reference_days = self.config.reference_days;
        if reference_hours.is_zero() {
            return None;
        }

        let split = worked
            .checked_div(reference_hours)
            .and_then(|ratio| ratio.checked_mul(reference_days))
            .map(|days| {
                days.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
                    .normalize()
            })
            .and_then(|worked_days| {
                let vacation_days = reference_days.checked_sub(worked_days)?.normalize();
                Some(DaySplit {
                    worked_days,
                    vacation_days,
                })
            });

        if split.is_none() {
            debug!("Day split of {} worked hours overflows; left blank", worked);
        }
        split
    }
}
