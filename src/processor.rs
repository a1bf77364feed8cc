use crate::config::ProcessorConfig;
use crate::error::{FichaFinanceiraError, Result};
use crate::hours::{AfastamentoSeries, AttendanceData, HoursReconciler};
use crate::ledger::PeriodMap;
use crate::parser::{source_for_path, DocumentLedgerParser, ParseResult, TextSource};
use crate::period::Period;
use crate::report::{render_hours_report, render_overtime_report, render_value_series};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A report rendered in memory, waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFile {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingSummary {
    pub periods: Vec<Period>,
    pub series: usize,
    pub files: Vec<PathBuf>,
}

/// Parses a payslip-history document, derives the vacation contribution base,
/// reconciles hours and writes the CSV reports.
pub struct FichaFinanceiraProcessor {
    config: ProcessorConfig,
    parser: DocumentLedgerParser,
}

impl FichaFinanceiraProcessor {
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        let parser = DocumentLedgerParser::new(vec![config.codes.worked_hours.clone()])?;
        Ok(Self { config, parser })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Processes the document at `input`, writing every report into `output_dir`.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output_dir: Q,
    ) -> Result<ProcessingSummary> {
        self.process_with_attendance(input, output_dir, None)
    }

    /// Like [`process`](Self::process), with attendance figures supplied by the
    /// caller instead of taken from the document.
    pub fn process_with_attendance<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output_dir: Q,
        attendance: Option<AttendanceData>,
    ) -> Result<ProcessingSummary> {
        let input = input.as_ref();
        if !input.exists() {
            return Err(FichaFinanceiraError::SourceNotFound(input.to_path_buf()));
        }
        let source = source_for_path(input);
        self.process_source(source.as_ref(), output_dir, attendance)
    }

    pub fn process_source<Q: AsRef<Path>>(
        &self,
        source: &dyn TextSource,
        output_dir: Q,
        attendance: Option<AttendanceData>,
    ) -> Result<ProcessingSummary> {
        let parsed = self.build_ledger(source)?;
        let attendance = attendance.unwrap_or_else(|| self.attendance_from_ledger(&parsed));
        let periods = self.target_periods(&parsed, &attendance);

        let rendered = self.render(&parsed, &attendance, &periods)?;
        let files = write_outputs(output_dir.as_ref(), &rendered)?;

        info!(
            "Processing finished: {} period(s), {} file(s) in {}",
            periods.len(),
            files.len(),
            output_dir.as_ref().display()
        );

        Ok(ProcessingSummary {
            periods,
            series: parsed.values.len(),
            files,
        })
    }

    /// Parses the document and applies the vacation adjustment.
    pub fn build_ledger(&self, source: &dyn TextSource) -> Result<ParseResult> {
        let mut parsed = self.parser.parse_source(source)?;
        let written = self.config.vacation.apply(&mut parsed.values);
        debug!(
            "Vacation adjustment produced {} {} value(s)",
            written, self.config.vacation.target_code
        );
        Ok(parsed)
    }

    /// Attendance series selected from the ledger by their configured codes.
    /// Afastamento categories missing from the ledger get no column.
    pub fn attendance_from_ledger(&self, parsed: &ParseResult) -> AttendanceData {
        let codes = &self.config.codes;
        let ledger = &parsed.values;

        let afastamentos = codes
            .afastamentos
            .iter()
            .filter(|afastamento| ledger.contains(&afastamento.code))
            .map(|afastamento| {
                AfastamentoSeries::new(
                    afastamento.code.clone(),
                    ledger.series_or_empty(&afastamento.code),
                    afastamento.include,
                )
            })
            .collect();

        AttendanceData {
            horas: ledger.series_or_empty(&codes.worked_hours),
            faltas: ledger.series_or_empty(&codes.absences),
            meses_registrados: Some(parsed.registered_periods.clone()),
            afastamentos,
        }
    }

    /// Periods present in the ledger or the attendance data, inside the configured window.
    pub fn target_periods(&self, parsed: &ParseResult, attendance: &AttendanceData) -> Vec<Period> {
        let mut periods: BTreeSet<Period> = parsed.values.periods().into_iter().collect();
        periods.extend(attendance.periods());
        periods
            .into_iter()
            .filter(|period| period.is_within(self.config.start_period, self.config.end_period))
            .collect()
    }

    fn windowed(&self, series: PeriodMap) -> PeriodMap {
        series
            .into_iter()
            .filter(|(period, _)| period.is_within(self.config.start_period, self.config.end_period))
            .collect()
    }

    /// Renders every report without touching the filesystem.
    pub fn render(
        &self,
        parsed: &ParseResult,
        attendance: &AttendanceData,
        periods: &[Period],
    ) -> Result<Vec<RenderedFile>> {
        let ledger = &parsed.values;
        let codes = &self.config.codes;
        let mut rendered = Vec::new();

        let report = HoursReconciler::new(self.config.reconciler.clone()).reconcile(periods, attendance);
        rendered.push(RenderedFile {
            filename: self.config.outputs.hours_report.clone(),
            content: render_hours_report(&report)?,
        });

        let horas_50 = self.windowed(ledger.series_or_empty(&codes.overtime_50));
        let horas_100 = self.windowed(ledger.series_or_empty(&codes.overtime_100));
        rendered.push(RenderedFile {
            filename: self.config.outputs.overtime_report.clone(),
            content: render_overtime_report(&horas_50, &horas_100, periods)?,
        });

        for export in self.config.series_exports() {
            let series = match ledger.series(&export.code) {
                Some(series) => self.windowed(series.clone()),
                None => {
                    debug!("{} not in ledger; {} skipped", export.code, export.filename);
                    continue;
                }
            };
            rendered.push(RenderedFile {
                filename: export.filename,
                content: render_value_series(
                    series.into_iter().map(|(period, value)| (period, Some(value))),
                )?,
            });
        }

        Ok(rendered)
    }
}

fn write_outputs(output_dir: &Path, rendered: &[RenderedFile]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(rendered.len());
    for file in rendered {
        let path = output_dir.join(&file.filename);
        std::fs::write(&path, &file.content)?;
        info!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
