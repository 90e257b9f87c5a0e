//! Output formatting and persistence for location tables and run summaries.
//!
//! Tables are written as `.xlsx` or CSV depending on the extension, without a
//! row index. Writes are guarded: unless overwriting is allowed the file is
//! opened create-exclusive, so an existing file is never touched.

use anyhow::Result as AnyResult;
use csv::WriterBuilder;
use polars::prelude::*;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{FrameError, Result};
use crate::parser::TableFormat;

/// Logs a run summary using Rust's debug pretty-print format.
pub fn print_pretty(summary: &impl Debug) {
    debug!("{:#?}", summary);
}

/// Logs a run summary as pretty-printed JSON.
pub fn print_json(summary: &impl Serialize) -> AnyResult<()> {
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// Writes `df` to `path`, creating missing parent directories.
///
/// # Errors
///
/// Returns [`FrameError::OutputExists`] if `path` exists and `overwrite` is
/// false; nothing is written in that case.
#[tracing::instrument(skip_all, fields(path = %path.display(), rows = df.height()))]
pub fn write_table(df: &DataFrame, path: &Path, overwrite: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            info!(dir = %parent.display(), "Output directory does not exist. Creating...");
            std::fs::create_dir_all(parent)?;
        }
    }

    if !overwrite && path.exists() {
        return Err(FrameError::OutputExists {
            path: path.to_path_buf(),
        });
    }

    let bytes = match TableFormat::from_path(path) {
        TableFormat::Spreadsheet => {
            if !is_xlsx(path) {
                return Err(FrameError::UnsupportedOutput {
                    path: path.to_path_buf(),
                });
            }
            encode_xlsx(df)?
        }
        TableFormat::Delimited => encode_csv(df)?,
    };

    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut file = options.open(path).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => FrameError::OutputExists {
            path: path.to_path_buf(),
        },
        _ => FrameError::Io(e),
    })?;

    info!("Writing output file");
    file.write_all(&bytes)?;
    file.flush()?;

    Ok(())
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}

/// Serializes a table as CSV with a header row, using the same cell text as
/// the spreadsheet writer.
pub fn encode_csv(df: &DataFrame) -> Result<Vec<u8>> {
    let columns = materialized(df);
    let mut buf = Vec::new();
    {
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(&mut buf);

        writer.write_record(df.get_column_names_str())?;
        for row in 0..df.height() {
            let record = columns
                .iter()
                .map(|series| Ok(field_text(&series.get(row)?)))
                .collect::<Result<Vec<_>>>()?;
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// Serializes a table as a single-worksheet `.xlsx` workbook.
///
/// Infinite floats are written as the text `inf`/`-inf`; NaN and null leave
/// the cell blank.
pub fn encode_xlsx(df: &DataFrame) -> Result<Vec<u8>> {
    let sheet_limit = || FrameError::SheetLimit {
        rows: df.height(),
        columns: df.width(),
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (c, series) in materialized(df).iter().enumerate() {
        let col = u16::try_from(c).map_err(|_| sheet_limit())?;
        worksheet.write_string(0, col, series.name().as_str())?;

        for row in 0..series.len() {
            let row_num = u32::try_from(row + 1).map_err(|_| sheet_limit())?;
            write_cell(worksheet, row_num, col, &series.get(row)?)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn materialized(df: &DataFrame) -> Vec<Series> {
    df.get_columns()
        .iter()
        .map(|c| c.as_materialized_series().rechunk())
        .collect()
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &AnyValue) -> Result<()> {
    match value {
        AnyValue::Null => {}
        AnyValue::Boolean(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        AnyValue::Float32(_) | AnyValue::Float64(_) => {
            let f = value.extract::<f64>().unwrap_or(f64::NAN);
            if f.is_infinite() {
                worksheet.write_string(row, col, float_text(f))?;
            } else if !f.is_nan() {
                worksheet.write_number(row, col, f)?;
            }
        }
        other => match (other.get_str(), other.extract::<f64>()) {
            (Some(s), _) => {
                worksheet.write_string(row, col, s)?;
            }
            (None, Some(n)) => {
                worksheet.write_number(row, col, n)?;
            }
            (None, None) => {
                worksheet.write_string(row, col, other.to_string())?;
            }
        },
    }
    Ok(())
}

fn field_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Boolean(b) => if *b { "True" } else { "False" }.to_string(),
        AnyValue::Float32(_) | AnyValue::Float64(_) => {
            float_text(value.extract::<f64>().unwrap_or(f64::NAN))
        }
        other => other
            .get_str()
            .map_or_else(|| other.to_string(), str::to_string),
    }
}

fn float_text(f: f64) -> String {
    if f.is_nan() {
        String::new()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}
