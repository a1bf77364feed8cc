//! # Ficha Financeira
//!
//! A library for rebuilding the monthly payroll history of one employee from a
//! payslip-history document ("ficha financeira") and rendering it as the fixed
//! `;`-delimited files used by labor-claim calculation tools.
//!
//! ## Core Concepts
//!
//! - **Ledger**: code-labelled series (`"8-Insalubridade"`) of exact decimal figures keyed by period
//! - **Source vs. Derived**: parsed figures are first-write-wins; adjustment rules own their own series
//! - **Vacation Adjustment**: INSS contribution base derived for every month with a vacation payment
//! - **Hours Reconciliation**: contracted hours, absences, leave and the worked/vacation day split
//! - **Registered Periods**: months that carry an attendance record, zero hours included
//!
//! ## Example
//!
//! ```rust,ignore
//! use ficha_financeira::*;
//!
//! let config = ProcessorConfig {
//!     start_period: Some("01/2022".parse().unwrap()),
//!     ..Default::default()
//! };
//!
//! let summary = FichaFinanceiraProcessor::new(config)?
//!     .process("ficha.txt", "saida")?;
//!
//! println!("{} periods written to {:?}", summary.periods.len(), summary.files);
//! ```

pub mod config;
pub mod error;
pub mod hours;
pub mod ledger;
pub mod parser;
pub mod period;
pub mod planilha;
pub mod processor;
pub mod report;
pub mod utils;
pub mod vacation;

pub use config::{
    AfastamentoCode, OutputFiles, ProcessorConfig, ReconcilerConfig, SeriesCodes, ValueExport,
};
pub use error::{FichaFinanceiraError, Result};
pub use hours::{AfastamentoSeries, AttendanceData, DaySplit, HoursReconciler, HoursReport, HoursRow};
pub use ledger::{Ledger, PeriodMap, RegisteredPeriodSet};
pub use parser::{source_for_path, DocumentLedgerParser, ParseResult, PlainText, TextFile, TextSource};
#[cfg(feature = "pdf")]
pub use parser::PdfFile;
pub use period::Period;
pub use planilha::{PlanilhaDadosProcessor, PlanilhaData, PlanilhaRow, Sheet, SheetCell};
pub use processor::{FichaFinanceiraProcessor, ProcessingSummary, RenderedFile};
pub use report::{render_hours_report, render_overtime_report, render_value_series};
pub use utils::*;
pub use vacation::{apply_vacation_adjustments, VacationAdjustmentRule};

use std::path::Path;

/// Processes a document with the default configuration.
pub fn process_ficha_financeira<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_dir: Q,
) -> Result<ProcessingSummary> {
    FichaFinanceiraProcessor::new(ProcessorConfig::default())?.process(input, output_dir)
}

/// Processes a document with a JSON configuration file.
pub fn process_with_config_file<P: AsRef<Path>, Q: AsRef<Path>, C: AsRef<Path>>(
    input: P,
    output_dir: Q,
    config_path: C,
) -> Result<ProcessingSummary> {
    let config = ProcessorConfig::from_json_path(config_path)?;
    FichaFinanceiraProcessor::new(config)?.process(input, output_dir)
}
