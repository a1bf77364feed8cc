//! Export of the "LEVANTAMENTO DADOS" sheet into remuneração, produção and
//! time-card CSVs.
//!
//! The workbook reader is not part of this crate: callers hand over the sheet as
//! a grid of [`SheetCell`]s, or as a `;`-delimited export of the sheet.

use crate::error::{FichaFinanceiraError, Result};
use crate::period::Period;
use crate::report::{render_value_series, write_delimited};
use crate::utils::{
    decode_text, encode_latin1, format_optional_decimal, hours_from_clock, parse_locale_decimal,
};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use log::{debug, info};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SHEET_NAME: &str = "LEVANTAMENTO DADOS";
/// 1-based row holding the column titles.
pub const HEADER_ROW: usize = 4;
/// 1-based row of the first data line.
pub const DATA_START_ROW: usize = 5;

pub const REMUNERACAO_FILENAME: &str = "REMUNERAÇÃO RECEBIDA.csv";
pub const PRODUCAO_FILENAME: &str = "PRODUÇÃO.csv";
pub const CARTOES_FILENAME: &str = "CARTÕES.csv";

const PERIOD_COLUMN: &str = "PERÍODO";
const REMUNERACAO_COLUMN: &str = "REMUNERAÇÃO RECEBIDA";
const PRODUCAO_COLUMN: &str = "PRODUÇÃO";
const FORMULA_COLUMN: &str = "FORMULA";
const INDICE_PREFIX: &str = "INDICE ";

#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Empty,
    Number(Decimal),
    Text(String),
    Date(NaiveDate),
    /// A time-of-day or duration, already in decimal hours.
    Hours(Decimal),
}

impl SheetCell {
    /// Interprets one field of a textual sheet export.
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return SheetCell::Empty;
        }
        for format in ["%d/%m/%Y", "%Y-%m-%d"] {
            if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                return SheetCell::Date(date);
            }
        }
        if let Some(hours) = hours_from_clock(text) {
            return SheetCell::Hours(hours);
        }
        if let Some(number) = parse_locale_decimal(text) {
            return SheetCell::Number(number);
        }
        SheetCell::Text(text.to_string())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SheetCell::Text(text) => Some(text.trim()),
            _ => None,
        }
    }

    /// Numeric value of the cell; anything that is not a number is `None`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            SheetCell::Empty | SheetCell::Date(_) => None,
            SheetCell::Number(value) | SheetCell::Hours(value) => Some(*value),
            SheetCell::Text(text) => Decimal::from_str(text.trim()).ok(),
        }
    }
}

/// Rows of one worksheet. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub rows: Vec<Vec<SheetCell>>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<SheetCell>>) -> Self {
        Self { rows }
    }

    /// Loads a `;`-delimited export of the sheet (UTF-8 or Latin-1).
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FichaFinanceiraError::SourceNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        Self::from_csv_str(&decode_text(&bytes))
    }

    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(SheetCell::parse).collect());
        }
        Ok(Self { rows })
    }

    fn row(&self, number: usize) -> Option<&[SheetCell]> {
        number
            .checked_sub(1)
            .and_then(|idx| self.rows.get(idx))
            .map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanilhaRow {
    pub periodo: Period,
    pub remuneracao: Option<Decimal>,
    pub producao: Option<Decimal>,
    /// One figure per formula column, in header order.
    pub formulas: Vec<Option<Decimal>>,
}

impl PlanilhaRow {
    fn has_relevant_data(&self) -> bool {
        let mut values = [self.remuneracao, self.producao]
            .into_iter()
            .chain(self.formulas.iter().copied());
        if !values.any(|value| value.map_or(false, |v| !v.is_zero())) {
            return false;
        }

        // remuneração alone is not exported
        !(self.producao.is_none() && self.formulas.iter().all(Option::is_none))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanilhaData {
    /// Time-card column titles, one per formula column.
    pub formula_labels: Vec<String>,
    pub rows: Vec<PlanilhaRow>,
}

struct ColumnLayout {
    period: usize,
    remuneracao: usize,
    producao: usize,
    formulas: Vec<usize>,
    formula_labels: Vec<String>,
}

/// Position of the `occurrence`-th (1-based) header cell equal to `name`.
pub fn find_column(header: &[SheetCell], name: &str, occurrence: usize) -> Result<usize> {
    header
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.as_text() == Some(name))
        .nth(occurrence.saturating_sub(1))
        .map(|(idx, _)| idx)
        .ok_or_else(|| FichaFinanceiraError::MissingColumn {
            name: name.to_string(),
            occurrence,
        })
}

/// Time-card title for an `INDICE ...` header: `INDICE HE 50%` → `HE 50%`,
/// `INDICE ADC. NOT.` → `ADIC.NOT`, `INDICE 75%` → `HE 75%`.
fn formula_label(indice: Option<&str>, ordinal: usize) -> String {
    match indice.and_then(|text| text.strip_prefix(INDICE_PREFIX)) {
        Some(rest) => {
            let rest = rest.trim();
            let compact = rest.replace([' ', '.'], "");
            if compact.starts_with("ADC") || compact.starts_with("ADIC") {
                "ADIC.NOT".to_string()
            } else if rest.starts_with("HE ") {
                rest.to_string()
            } else {
                format!("HE {}", rest)
            }
        }
        None => match ordinal {
            0 => "HE 100%".to_string(),
            1 => "ADIC.NOT".to_string(),
            n => format!("{} {}", FORMULA_COLUMN, n + 1),
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanilhaDadosProcessor;

impl PlanilhaDadosProcessor {
    pub fn new() -> Self {
        Self
    }

    fn locate_columns(&self, header: &[SheetCell]) -> Result<ColumnLayout> {
        let period = find_column(header, PERIOD_COLUMN, 1)?;
        let remuneracao = find_column(header, REMUNERACAO_COLUMN, 1)?;
        let producao = find_column(header, PRODUCAO_COLUMN, 1)?;

        // first formula column is mandatory
        find_column(header, FORMULA_COLUMN, 1)?;

        let formulas: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.as_text() == Some(FORMULA_COLUMN))
            .map(|(idx, _)| idx)
            .collect();

        let formula_labels = formulas
            .iter()
            .enumerate()
            .map(|(ordinal, &idx)| {
                let indice = idx
                    .checked_sub(1)
                    .and_then(|prev| header.get(prev))
                    .and_then(SheetCell::as_text);
                formula_label(indice, ordinal)
            })
            .collect();

        Ok(ColumnLayout {
            period,
            remuneracao,
            producao,
            formulas,
            formula_labels,
        })
    }

    /// Collects the exportable rows, optionally restricted to an inclusive period window.
    pub fn read_rows(
        &self,
        sheet: &Sheet,
        start_period: Option<Period>,
        end_period: Option<Period>,
    ) -> Result<PlanilhaData> {
        let header = sheet.row(HEADER_ROW).ok_or_else(|| {
            FichaFinanceiraError::ParseError(format!(
                "sheet '{}' has no header row {}",
                SHEET_NAME, HEADER_ROW
            ))
        })?;
        let layout = self.locate_columns(header)?;

        let cell = |row: &[SheetCell], idx: usize| row.get(idx).and_then(SheetCell::to_decimal);

        let mut rows = Vec::new();
        for (offset, row) in sheet.rows.iter().enumerate().skip(DATA_START_ROW - 1) {
            let periodo = match row.get(layout.period) {
                Some(SheetCell::Date(date)) => Period::from(*date),
                _ => continue,
            };
            if !periodo.is_within(start_period, end_period) {
                continue;
            }

            let parsed = PlanilhaRow {
                periodo,
                remuneracao: cell(row, layout.remuneracao),
                producao: cell(row, layout.producao),
                formulas: layout.formulas.iter().map(|&idx| cell(row, idx)).collect(),
            };

            if !parsed.has_relevant_data() {
                debug!("Row {} ({}) has no relevant data", offset + 1, periodo);
                continue;
            }
            rows.push(parsed);
        }

        Ok(PlanilhaData {
            formula_labels: layout.formula_labels,
            rows,
        })
    }

    pub fn render_remuneracao(&self, data: &PlanilhaData) -> Result<String> {
        render_value_series(data.rows.iter().map(|row| (row.periodo, row.remuneracao)))
    }

    pub fn render_producao(&self, data: &PlanilhaData) -> Result<String> {
        render_value_series(data.rows.iter().map(|row| (row.periodo, row.producao)))
    }

    pub fn render_cartoes(&self, data: &PlanilhaData) -> Result<String> {
        let header: Vec<String> = std::iter::once(PERIOD_COLUMN.to_string())
            .chain(data.formula_labels.iter().cloned())
            .collect();
        let rows: Vec<Vec<String>> = data
            .rows
            .iter()
            .map(|row| {
                std::iter::once(row.periodo.to_string())
                    .chain(row.formulas.iter().map(|value| format_optional_decimal(*value)))
                    .collect()
            })
            .collect();
        write_delimited(&header, &rows)
    }

    /// Writes the three Latin-1 CSVs into `output_dir`, returning their paths.
    pub fn process<P: AsRef<Path>>(
        &self,
        sheet: &Sheet,
        output_dir: P,
        start_period: Option<Period>,
        end_period: Option<Period>,
    ) -> Result<Vec<PathBuf>> {
        let output_dir = output_dir.as_ref();
        let data = self.read_rows(sheet, start_period, end_period)?;
        info!("{} relevant row(s) found for export", data.rows.len());

        let outputs = [
            (REMUNERACAO_FILENAME, self.render_remuneracao(&data)?),
            (PRODUCAO_FILENAME, self.render_producao(&data)?),
            (CARTOES_FILENAME, self.render_cartoes(&data)?),
        ];

        std::fs::create_dir_all(output_dir)?;
        let mut written = Vec::with_capacity(outputs.len());
        for (filename, content) in outputs {
            let path = output_dir.join(filename);
            std::fs::write(&path, encode_latin1(&content))?;
            written.push(path);
        }

        info!("Files written to {}", output_dir.display());
        Ok(written)
    }

    /// Reads a `;`-delimited export of the sheet and writes the CSVs.
    pub fn process_csv_export<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        sheet_path: P,
        output_dir: Q,
        start_period: Option<Period>,
        end_period: Option<Period>,
    ) -> Result<Vec<PathBuf>> {
        let sheet_path = sheet_path.as_ref();
        info!("Reading sheet export: {}", sheet_path.display());
        let sheet = Sheet::from_csv_path(sheet_path)?;
        self.process(&sheet, output_dir, start_period, end_period)
    }
}
