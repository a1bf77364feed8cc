use crate::error::{FichaFinanceiraError, Result};
use crate::period::Period;
use crate::vacation::VacationAdjustmentRule;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Monthly reference figures used by the hours reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Nominal hours of a full month.
    #[serde(default = "default_reference_hours")]
    pub reference_hours: Decimal,
    /// Nominal days of a full month.
    #[serde(default = "default_reference_days")]
    pub reference_days: Decimal,
}

fn default_reference_hours() -> Decimal {
    Decimal::from(200)
}

fn default_reference_days() -> Decimal {
    Decimal::from(30)
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            reference_hours: default_reference_hours(),
            reference_days: default_reference_days(),
        }
    }
}

impl ReconcilerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reference_hours <= Decimal::ZERO {
            return Err(FichaFinanceiraError::ConfigError(format!(
                "reference_hours must be positive, got {}",
                self.reference_hours
            )));
        }
        if self.reference_days <= Decimal::ZERO {
            return Err(FichaFinanceiraError::ConfigError(format!(
                "reference_days must be positive, got {}",
                self.reference_days
            )));
        }
        Ok(())
    }
}

/// A leave category picked out of the ledger by its code label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AfastamentoCode {
    pub code: String,
    /// Whether the leave hours are taken off the contracted hours.
    #[serde(default = "default_true")]
    pub include: bool,
}

fn default_true() -> bool {
    true
}

/// Fixed code labels of the series each report reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesCodes {
    pub worked_hours: String,
    pub absences: String,
    pub overtime_50: String,
    pub overtime_100: String,
    pub insalubridade: String,
    pub afastamentos: Vec<AfastamentoCode>,
}

impl Default for SeriesCodes {
    fn default() -> Self {
        Self {
            worked_hours: "1-Horas Normais".to_string(),
            absences: "40-Faltas".to_string(),
            overtime_50: "150-Hora Extra 50%".to_string(),
            overtime_100: "200-Hora Extra 100%".to_string(),
            insalubridade: "8-Insalubridade".to_string(),
            afastamentos: vec![
                AfastamentoCode {
                    code: "902-AFAST. DOENCA".to_string(),
                    include: true,
                },
                AfastamentoCode {
                    code: "910-AFAST. MATERNIDADE".to_string(),
                    include: true,
                },
            ],
        }
    }
}

/// One ledger series written out in the `MES_ANO;VALOR;...` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueExport {
    pub code: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFiles {
    pub hours_report: String,
    pub overtime_report: String,
    /// Export of `codes.insalubridade`. `None` turns it off.
    pub insalubridade_report: Option<String>,
    /// Export of the vacation rule's target series. `None` turns it off.
    pub vacation_base_report: Option<String>,
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            hours_report: "HORAS TRABALHADAS.csv".to_string(),
            overtime_report: "CARTOES.csv".to_string(),
            insalubridade_report: Some("INSALUBRIDADE.csv".to_string()),
            vacation_base_report: Some("BASE INSS FERIAS.csv".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub reconciler: ReconcilerConfig,
    pub vacation: VacationAdjustmentRule,
    pub codes: SeriesCodes,
    pub outputs: OutputFiles,
    /// Additional series exported in the `MES_ANO;VALOR;...` layout.
    pub value_exports: Vec<ValueExport>,
    /// First period (inclusive) to report.
    pub start_period: Option<Period>,
    /// Last period (inclusive) to report.
    pub end_period: Option<Period>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            reconciler: ReconcilerConfig::default(),
            vacation: VacationAdjustmentRule::default(),
            codes: SeriesCodes::default(),
            outputs: OutputFiles::default(),
            value_exports: Vec::new(),
            start_period: None,
            end_period: None,
        }
    }
}

impl ProcessorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FichaFinanceiraError::SourceNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Every single-series export, resolved against the current codes: the
    /// insalubridade and vacation-base files first, then `value_exports`.
    pub fn series_exports(&self) -> Vec<ValueExport> {
        let fixed = [
            (&self.codes.insalubridade, &self.outputs.insalubridade_report),
            (&self.vacation.target_code, &self.outputs.vacation_base_report),
        ];

        fixed
            .into_iter()
            .filter_map(|(code, filename)| {
                filename.as_ref().map(|filename| ValueExport {
                    code: code.clone(),
                    filename: filename.clone(),
                })
            })
            .chain(self.value_exports.iter().cloned())
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        self.reconciler.validate()?;

        if let (Some(start), Some(end)) = (self.start_period, self.end_period) {
            if end < start {
                return Err(FichaFinanceiraError::ConfigError(format!(
                    "end_period {} is before start_period {}",
                    end, start
                )));
            }
        }

        let exports = self.series_exports();
        let mut filenames = vec![&self.outputs.hours_report, &self.outputs.overtime_report];
        filenames.extend(exports.iter().map(|export| &export.filename));
        for (idx, name) in filenames.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(FichaFinanceiraError::ConfigError(
                    "output file names must not be empty".to_string(),
                ));
            }
            if filenames[..idx].contains(name) {
                return Err(FichaFinanceiraError::ConfigError(format!(
                    "output file '{}' is configured twice",
                    name
                )));
            }
        }

        Ok(())
    }
}
