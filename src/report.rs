//! Fixed-schema `;`-delimited renderers.
//!
//! Numbers use a comma decimal separator and minimal digits (`27,5`, `200`).

use crate::error::{FichaFinanceiraError, Result};
use crate::hours::HoursReport;
use crate::ledger::PeriodMap;
use crate::period::Period;
use crate::utils::{format_decimal, format_optional_decimal};
use csv::{Terminator, WriterBuilder};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

pub const HOURS_LEADING_COLUMNS: [&str; 4] = ["PERIODO", "HORAS TRAB.", "FALTAS", "SALDO HORAS"];
pub const HOURS_TRAILING_COLUMNS: [&str; 2] = ["DIAS TRABALHADOS", "DIAS FERIAS"];
pub const OVERTIME_COLUMNS: [&str; 3] = ["PERIODO", "HORA EXTRA 50%", "HORA EXTRA 100%"];
pub const VALUE_SERIES_COLUMNS: [&str; 6] = [
    "MES_ANO",
    "VALOR",
    "FGTS",
    "FGTS_REC.",
    "CONTRIBUICAO_SOCIAL",
    "CONTRIBUICAO_SOCIAL_REC.",
];

/// Writes `header` and `rows` as `;`-delimited, `\n`-terminated text.
pub fn write_delimited<H, R>(header: &[H], rows: &[Vec<R>]) -> Result<String>
where
    H: AsRef<str>,
    R: AsRef<str>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .terminator(Terminator::Any(b'\n'))
        .flexible(false)
        .from_writer(Vec::new());

    writer.write_record(header.iter().map(|h| h.as_ref()))?;
    for row in rows {
        writer.write_record(row.iter().map(|cell| cell.as_ref()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FichaFinanceiraError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| {
        FichaFinanceiraError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

pub fn hours_report_header(afastamento_labels: &[String]) -> Vec<String> {
    HOURS_LEADING_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(afastamento_labels.iter().cloned())
        .chain(HOURS_TRAILING_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

/// `PERIODO;HORAS TRAB.;FALTAS;SALDO HORAS;<afastamentos>;DIAS TRABALHADOS;DIAS FERIAS`
pub fn render_hours_report(report: &HoursReport) -> Result<String> {
    let header = hours_report_header(&report.afastamento_labels);

    let rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![
                row.period.to_string(),
                format_decimal(row.contracted_hours),
                format_decimal(row.faltas),
                format_decimal(row.balance),
            ];
            cells.extend(row.afastamentos.iter().map(|value| format_decimal(*value)));
            match &row.day_split {
                Some(split) => {
                    cells.push(format_decimal(split.worked_days));
                    cells.push(format_decimal(split.vacation_days));
                }
                None => {
                    cells.push(String::new());
                    cells.push(String::new());
                }
            }
            cells
        })
        .collect();

    write_delimited(&header, &rows)
}

/// `PERIODO;HORA EXTRA 50%;HORA EXTRA 100%`
///
/// Rows cover every period of either series plus the suggested ones, ascending.
pub fn render_overtime_report(
    horas_50: &PeriodMap,
    horas_100: &PeriodMap,
    suggested: &[Period],
) -> Result<String> {
    let periods: BTreeSet<Period> = horas_50
        .keys()
        .chain(horas_100.keys())
        .chain(suggested.iter())
        .copied()
        .collect();

    let rows: Vec<Vec<String>> = periods
        .into_iter()
        .map(|period| {
            vec![
                period.to_string(),
                format_optional_decimal(horas_50.get(&period).copied()),
                format_optional_decimal(horas_100.get(&period).copied()),
            ]
        })
        .collect();

    write_delimited(&OVERTIME_COLUMNS, &rows)
}

/// `MES_ANO;VALOR;FGTS;FGTS_REC.;CONTRIBUICAO_SOCIAL;CONTRIBUICAO_SOCIAL_REC.`
/// with the flag columns fixed at `N`.
pub fn render_value_series<I>(values: I) -> Result<String>
where
    I: IntoIterator<Item = (Period, Option<Decimal>)>,
{
    let rows: Vec<Vec<String>> = values
        .into_iter()
        .map(|(period, value)| {
            vec![
                period.to_string(),
                format_optional_decimal(value),
                "N".to_string(),
                "N".to_string(),
                "N".to_string(),
                "N".to_string(),
            ]
        })
        .collect();

    write_delimited(&VALUE_SERIES_COLUMNS, &rows)
}
