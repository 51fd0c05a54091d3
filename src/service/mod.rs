//! Export of a student's material progress as CSV and PDF.

pub mod export;
pub use export::{progress_rows, render_pdf, write_csv, ExportError, ProgressRow};
