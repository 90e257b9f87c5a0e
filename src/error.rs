//! Error type shared by the loader, the writer and both pipelines.

use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error(
        "The file {} already exists and overwrite is disabled. Either choose a different output path or rerun with --force.",
        .path.display()
    )]
    OutputExists { path: PathBuf },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Column {column} has a non-numeric value {value:?} at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Cannot write spreadsheet {}: only .xlsx output is supported", .path.display())]
    UnsupportedOutput { path: PathBuf },

    #[error("Workbook {} has no worksheets", .path.display())]
    EmptyWorkbook { path: PathBuf },

    #[error("Table with {rows} rows and {columns} columns does not fit in a worksheet")]
    SheetLimit { rows: usize, columns: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("Spreadsheet read failed: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Spreadsheet write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
