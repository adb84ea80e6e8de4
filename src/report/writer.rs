use super::error::ReportError;
use super::row::{rows_from_result, ReportRow, COLUMNS};
use crate::fingerprint::FingerprintResult;
use crate::insight::Insight;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const STACK_SHEET: &str = "Technology Stack";
pub const ANALYSIS_SHEET: &str = "LLM Analysis";

const HEADER_FILL: u32 = 0x366092;
const MAX_COLUMN_WIDTH: usize = 50;
/// Longest string a single xlsx cell accepts
const MAX_CELL_CHARS: usize = 32_767;
const SEPARATOR_MARKER: &str = "---";
const SEPARATOR_TITLE: &str = "Ollama Analysis";

/// What a successful write produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub path: PathBuf,
    /// Technology rows written, excluding header and analysis rows
    pub rows: usize,
    pub insight_included: bool,
}

/// Writes fingerprint results to an `.xlsx` workbook
#[derive(Debug, Clone, Default)]
pub struct ReportWriter;

impl ReportWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write(
        &self,
        path: &Path,
        result: &FingerprintResult,
        insight: Option<&Insight>,
    ) -> Result<ReportSummary, ReportError> {
        let rows = rows_from_result(result);
        let insight = insight.filter(|i| !i.is_empty());

        ensure_parent_dir(path)?;

        let mut workbook = Workbook::new();
        workbook.push_worksheet(stack_sheet(&rows, insight)?);
        if let Some(insight) = insight {
            workbook.push_worksheet(analysis_sheet(insight)?);
        }
        workbook.save(path).map_err(|e| match e {
            XlsxError::IoError(source) => ReportError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => ReportError::Xlsx(other),
        })?;

        info!(
            path = %path.display(),
            rows = rows.len(),
            insight = insight.is_some(),
            "Report written"
        );

        Ok(ReportSummary {
            path: path.to_path_buf(),
            rows: rows.len(),
            insight_included: insight.is_some(),
        })
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), ReportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            debug!(dir = %parent.display(), "Creating report directory");
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
}

fn stack_sheet(rows: &[ReportRow], insight: Option<&Insight>) -> Result<Worksheet, ReportError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(STACK_SHEET)?;

    let header = header_format();
    let mut widths = ColumnWidths::new(COLUMNS.len());

    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
        widths.observe(col, title);
    }

    let mut row_num: u32 = 1;
    for row in rows {
        for (col, cell) in row.text_cells().iter().enumerate() {
            if let Some(text) = cell {
                let text = truncate_cell(text);
                sheet.write_string(row_num, col as u16, text)?;
                widths.observe(col, text);
            }
        }
        sheet.write_number(row_num, 2, row.live_count as f64)?;
        sheet.write_number(row_num, 3, row.dead_count as f64)?;
        widths.observe(2, &row.live_count.to_string());
        widths.observe(3, &row.dead_count.to_string());
        row_num += 1;
    }

    if let Some(insight) = insight {
        sheet.write_string(row_num, 0, SEPARATOR_MARKER)?;
        sheet.write_string(row_num, 1, SEPARATOR_TITLE)?;
        widths.observe(1, SEPARATOR_TITLE);
        row_num += 1;

        for line in insight.lines() {
            for piece in cell_chunks(line) {
                sheet.write_string(row_num, 1, piece)?;
                widths.observe(1, piece);
                row_num += 1;
            }
        }
    }

    widths.apply(&mut sheet)?;
    Ok(sheet)
}

fn analysis_sheet(insight: &Insight) -> Result<Worksheet, ReportError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(ANALYSIS_SHEET)?;

    sheet.write_string_with_format(0, 0, ANALYSIS_SHEET, &header_format())?;
    let wrap = Format::new().set_text_wrap();
    for (offset, piece) in cell_chunks(&insight.text).into_iter().enumerate() {
        sheet.write_string_with_format(1 + offset as u32, 0, piece, &wrap)?;
    }
    sheet.set_column_width(0, MAX_COLUMN_WIDTH as f64)?;

    Ok(sheet)
}

/// Longest cell seen per column, in characters
struct ColumnWidths(Vec<usize>);

impl ColumnWidths {
    fn new(columns: usize) -> Self {
        Self(vec![0; columns])
    }

    fn observe(&mut self, col: usize, text: &str) {
        if let Some(width) = self.0.get_mut(col) {
            *width = (*width).max(text.chars().count());
        }
    }

    fn apply(&self, sheet: &mut Worksheet) -> Result<(), ReportError> {
        for (col, longest) in self.0.iter().enumerate() {
            let width = (longest + 2).min(MAX_COLUMN_WIDTH);
            sheet.set_column_width(col as u16, width as f64)?;
        }
        Ok(())
    }
}

/// Splits `text` into consecutive pieces that each fit in one cell.
fn cell_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while let Some((split, _)) = rest.char_indices().nth(MAX_CELL_CHARS) {
        let (head, tail) = rest.split_at(split);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    chunks
}

fn truncate_cell(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// `<domain with '.' and '/' replaced by '_'>_analysis.xlsx`
pub fn default_output_path(domain: &str) -> PathBuf {
    let stem: String = domain
        .trim()
        .chars()
        .map(|c| if c == '.' || c == '/' { '_' } else { c })
        .collect();
    PathBuf::from(format!("{}_analysis.xlsx", stem))
}
