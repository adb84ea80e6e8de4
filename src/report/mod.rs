//! Spreadsheet report
//!
//! Flattens a [`FingerprintResult`](crate::fingerprint::FingerprintResult)
//! into [`ReportRow`]s and writes them, with an optional insight, to an
//! `.xlsx` workbook.

mod error;
mod row;
mod writer;

pub use error::ReportError;
pub use row::{rows_from_result, ReportRow, COLUMNS};
pub use writer::{default_output_path, ReportSummary, ReportWriter, ANALYSIS_SHEET, STACK_SHEET};
