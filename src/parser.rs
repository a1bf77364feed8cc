//! Payslip-history ("ficha financeira") text parser.
//!
//! The document is a table: period headers (`01/2024 02/2024 ...`, or month names
//! under an `ANO: 2024` line) followed by rows of the form
//! `<code>-<description> <value> <value> ...`. Text before the first row is
//! preamble. A period header stays in force across page breaks until the next one.

use crate::error::{FichaFinanceiraError, Result};
use crate::ledger::{Ledger, RegisteredPeriodSet};
use crate::period::Period;
use crate::utils::parse_locale_decimal;
use log::{debug, info, warn};
use regex::Regex;
use std::path::{Path, PathBuf};

const HEADING_WORDS: [&str; 11] = [
    "CODIGO",
    "COD",
    "COD.",
    "DESCRICAO",
    "EVENTO",
    "EVENTOS",
    "VERBA",
    "VERBAS",
    "TOTAL",
    "-",
    "|",
];

const MONTH_NAMES: [(&str, &str, u32); 12] = [
    ("JAN", "JANEIRO", 1),
    ("FEV", "FEVEREIRO", 2),
    ("MAR", "MARCO", 3),
    ("ABR", "ABRIL", 4),
    ("MAI", "MAIO", 5),
    ("JUN", "JUNHO", 6),
    ("JUL", "JULHO", 7),
    ("AGO", "AGOSTO", 8),
    ("SET", "SETEMBRO", 9),
    ("OUT", "OUTUBRO", 10),
    ("NOV", "NOVEMBRO", 11),
    ("DEZ", "DEZEMBRO", 12),
];

/// Anything that can hand over the text of a document, one string per page.
pub trait TextSource {
    fn pages(&self) -> Result<Vec<String>>;

    /// Name used in log lines and errors.
    fn describe(&self) -> String;
}

/// Text already in memory. Form feeds separate pages.
#[derive(Debug, Clone)]
pub struct PlainText(pub String);

impl TextSource for PlainText {
    fn pages(&self) -> Result<Vec<String>> {
        Ok(split_pages(&self.0))
    }

    fn describe(&self) -> String {
        "<in-memory text>".to_string()
    }
}

/// A text file produced by an earlier extraction step.
#[derive(Debug, Clone)]
pub struct TextFile {
    path: PathBuf,
}

impl TextFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TextSource for TextFile {
    fn pages(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Err(FichaFinanceiraError::SourceNotFound(self.path.clone()));
        }
        let text = std::fs::read_to_string(&self.path)?;
        Ok(split_pages(&text))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A PDF document, extracted with `pdf-extract`.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone)]
pub struct PdfFile {
    path: PathBuf,
}

#[cfg(feature = "pdf")]
impl PdfFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[cfg(feature = "pdf")]
impl TextSource for PdfFile {
    fn pages(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Err(FichaFinanceiraError::SourceNotFound(self.path.clone()));
        }
        let text = pdf_extract::extract_text(&self.path).map_err(|e| {
            FichaFinanceiraError::ExtractionError(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(split_pages(&text))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn split_pages(text: &str) -> Vec<String> {
    text.split('\u{c}').map(str::to_string).collect()
}

/// Picks the text source matching a file extension.
pub fn source_for_path<P: AsRef<Path>>(path: P) -> Box<dyn TextSource> {
    let path = path.as_ref();
    #[cfg(feature = "pdf")]
    {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            return Box::new(PdfFile::new(path));
        }
    }
    Box::new(TextFile::new(path))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    pub values: Ledger,
    pub registered_periods: RegisteredPeriodSet,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Column {
    Dated(Period),
    Month(u32),
}

#[derive(Debug, Clone, PartialEq)]
struct PeriodHeader {
    columns: Vec<Column>,
    has_total: bool,
}

impl PeriodHeader {
    fn resolve(&self, year: Option<i32>) -> Option<Vec<Period>> {
        self.columns
            .iter()
            .map(|column| match column {
                Column::Dated(period) => Some(*period),
                Column::Month(month) => year.and_then(|y| Period::new(y, *month).ok()),
            })
            .collect()
    }
}

#[derive(Default)]
struct ParseState {
    year: Option<i32>,
    header: Option<PeriodHeader>,
    periods: Vec<Period>,
    rows: usize,
    dated_rows: usize,
    skipped_cells: usize,
    duplicates: usize,
}

impl ParseState {
    fn refresh_periods(&mut self) {
        self.periods = self
            .header
            .as_ref()
            .and_then(|header| header.resolve(self.year))
            .unwrap_or_default();
    }
}

pub struct DocumentLedgerParser {
    attendance_codes: Vec<String>,
    row_header: Regex,
    year_context: Regex,
    cell: Regex,
    numeric_period: Regex,
    named_period: Regex,
}

impl DocumentLedgerParser {
    /// `attendance_codes` are the row labels whose presence marks a period as registered.
    pub fn new(attendance_codes: Vec<String>) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| FichaFinanceiraError::ParseError(e.to_string()))
        };

        Ok(Self {
            attendance_codes,
            row_header: compile(r"^(\d+)-(\S.*)$")?,
            year_context: compile(r"(?i)\b(?:ano|exerc[ií]cio)(?:\s+base)?\s*[:\-]?\s*(\d{4})\b")?,
            cell: compile(r"^(?:[-+(]?\d[\d.,]*[-)]?|-+|\*+)$")?,
            numeric_period: compile(r"^(\d{1,2})/(\d{4})$")?,
            named_period: compile(r"^([A-Z]+)/(\d{4})$")?,
        })
    }

    pub fn parse_source(&self, source: &dyn TextSource) -> Result<ParseResult> {
        info!("Reading document: {}", source.describe());
        let pages = source.pages()?;
        self.parse_pages(&pages).map_err(|e| match e {
            FichaFinanceiraError::ParseError(details) => {
                FichaFinanceiraError::ParseError(format!("{}: {}", source.describe(), details))
            }
            other => other,
        })
    }

    pub fn parse_text(&self, text: &str) -> Result<ParseResult> {
        self.parse_pages(&split_pages(text))
    }

    pub fn parse_pages<S: AsRef<str>>(&self, pages: &[S]) -> Result<ParseResult> {
        let mut result = ParseResult::default();
        let mut state = ParseState::default();

        for (page_idx, page) in pages.iter().enumerate() {
            for line in page.as_ref().lines() {
                self.parse_line(line.trim(), page_idx + 1, &mut state, &mut result);
            }
        }

        if state.rows == 0 {
            return Err(FichaFinanceiraError::ParseError(
                "no '<code>-<description>' rows found".to_string(),
            ));
        }
        if state.dated_rows == 0 {
            return Err(FichaFinanceiraError::ParseError(format!(
                "{} row(s) found but none under a period header",
                state.rows
            )));
        }

        info!(
            "Parsed {} rows into {} series ({} registered periods)",
            state.dated_rows,
            result.values.len(),
            result.registered_periods.len()
        );
        debug!(
            "{} unreadable cell(s), {} repeated cell(s) ignored",
            state.skipped_cells, state.duplicates
        );

        Ok(result)
    }

    fn parse_line(&self, line: &str, page: usize, state: &mut ParseState, result: &mut ParseResult) {
        if line.is_empty() {
            return;
        }

        if let Some(captures) = self.row_header.captures(line) {
            let code = captures.get(1).map_or("", |m| m.as_str());
            let rest = captures.get(2).map_or("", |m| m.as_str());
            state.rows += 1;
            self.parse_row(code, rest, page, state, result);
            return;
        }

        if let Some(year) = self
            .year_context
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<i32>().ok())
        {
            if state.year != Some(year) {
                debug!("Page {}: year context {}", page, year);
                state.year = Some(year);
                state.refresh_periods();
            }
        }

        if let Some(header) = self.period_header(line) {
            debug!(
                "Page {}: period header with {} column(s){}",
                page,
                header.columns.len(),
                if header.has_total { " plus total" } else { "" }
            );
            state.header = Some(header);
            state.refresh_periods();
            if state.periods.is_empty() {
                warn!("Page {}: month header without a year context", page);
            }
        }
    }

    fn parse_row(
        &self,
        code: &str,
        rest: &str,
        page: usize,
        state: &mut ParseState,
        result: &mut ParseResult,
    ) {
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let has_total = state.header.as_ref().map_or(false, |h| h.has_total);
        let capacity = state.periods.len() + usize::from(has_total);

        let mut cell_start = tokens.len();
        while cell_start > 1
            && tokens.len() - cell_start < capacity
            && self.cell.is_match(tokens[cell_start - 1])
        {
            cell_start -= 1;
        }
        // a short row can end its description with a plain number ("Salario Familia 2")
        if tokens.len() - cell_start < capacity {
            while cell_start + 1 < tokens.len() && is_plain_integer(tokens[cell_start]) {
                cell_start += 1;
            }
        }

        let description = tokens[..cell_start].join(" ");
        let label = format!("{}-{}", code, description);
        let mut cells = &tokens[cell_start..];

        if state.periods.is_empty() {
            warn!("Page {}: row '{}' appears before any period header", page, label);
            return;
        }
        state.dated_rows += 1;

        if cells.is_empty() {
            debug!("Page {}: row '{}' has no values", page, label);
            return;
        }
        if has_total && cells.len() == capacity {
            cells = &cells[..cells.len() - 1];
        }

        result.values.ensure_source(&label);
        let is_attendance = self.attendance_codes.iter().any(|c| *c == label);

        for (period, token) in state.periods.iter().zip(cells.iter()) {
            if is_attendance {
                result.registered_periods.insert(*period);
            }

            match parse_locale_decimal(token) {
                Some(value) => {
                    if !result.values.insert_source(&label, *period, value) {
                        state.duplicates += 1;
                        debug!("Page {}: {} {} already recorded", page, label, period);
                    }
                }
                None => {
                    state.skipped_cells += 1;
                    debug!("Page {}: {} {} has no value ('{}')", page, label, period, token);
                }
            }
        }
    }

    fn period_header(&self, line: &str) -> Option<PeriodHeader> {
        let mut columns = Vec::new();
        let mut has_total = false;

        for token in line.split_whitespace() {
            let folded = fold(token);
            let folded = folded.trim_end_matches(|c| c == ':' || c == ';');

            if folded == "TOTAL" {
                has_total = !columns.is_empty();
                continue;
            }
            if HEADING_WORDS.contains(&folded) {
                continue;
            }

            let column = self.period_token(folded)?;
            if has_total {
                // a period after TOTAL is not a trailing total column
                has_total = false;
            }
            columns.push(column);
        }

        if columns.is_empty() {
            None
        } else {
            Some(PeriodHeader { columns, has_total })
        }
    }

    fn period_token(&self, token: &str) -> Option<Column> {
        if let Some(captures) = self.numeric_period.captures(token) {
            let month = captures.get(1)?.as_str().parse::<u32>().ok()?;
            let year = captures.get(2)?.as_str().parse::<i32>().ok()?;
            return Period::new(year, month).ok().map(Column::Dated);
        }
        if let Some(captures) = self.named_period.captures(token) {
            let month = month_number(captures.get(1)?.as_str())?;
            let year = captures.get(2)?.as_str().parse::<i32>().ok()?;
            return Period::new(year, month).ok().map(Column::Dated);
        }
        month_number(token).map(Column::Month)
    }
}

fn is_plain_integer(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn month_number(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .find(|(short, long, _)| name == *short || name == *long)
        .map(|(_, _, number)| *number)
}

/// Uppercases and strips the Portuguese diacritics that show up in headers.
fn fold(token: &str) -> String {
    token
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ã' => 'A',
            'É' | 'Ê' => 'E',
            'Í' => 'I',
            'Ó' | 'Ô' | 'Õ' => 'O',
            'Ú' | 'Ü' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}
