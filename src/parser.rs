//! Loads location tables from spreadsheets or delimited text.
//!
//! The format is inferred from the file extension: `.xls` and `.xlsx` are read
//! as spreadsheets (first worksheet, first row as header), anything else as CSV.

use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{FrameError, Result};

/// Cell texts read as missing, in CSV files and spreadsheets alike.
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Tabular file formats understood by the loader and the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Spreadsheet,
    Delimited,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Self {
        let is_excel = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xls") || e.eq_ignore_ascii_case("xlsx"));
        if is_excel {
            TableFormat::Spreadsheet
        } else {
            TableFormat::Delimited
        }
    }
}

/// Loads a table from `path`, picking the reader from the extension.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_table(path: &Path) -> Result<DataFrame> {
    info!("Loading input file");
    let df = match TableFormat::from_path(path) {
        TableFormat::Spreadsheet => load_spreadsheet(path)?,
        TableFormat::Delimited => parse_csv(std::fs::read(path)?)?,
    };
    debug!(rows = df.height(), columns = df.width(), "Input table loaded");
    Ok(df)
}

/// Reads CSV with a header row. Empty headers are named `Unnamed: <position>`
/// and the [`NA_VALUES`] texts load as nulls.
pub fn parse_csv(data: Vec<u8>) -> Result<DataFrame> {
    let null_values = NullValues::AllColumns(NA_VALUES.iter().map(|v| (*v).into()).collect());
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
        .into_reader_with_file_handle(Cursor::new(data))
        .finish()?;

    // Blank CSV headers come back as `column_<n>`
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let generated = format!("column_{}", i + 1);
            if name.as_str() == generated {
                header_name(i, "")
            } else {
                header_name(i, name.as_str())
            }
        })
        .collect();
    df.set_column_names(names)?;

    Ok(untyped_as_float(df)?)
}

fn load_spreadsheet(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FrameError::EmptyWorkbook {
            path: path.to_path_buf(),
        })??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let body: Vec<&[Data]> = rows.collect();

    let columns = header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = header_name(i, &cell_text(cell).unwrap_or_default());
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(i).unwrap_or(&Data::Empty))
                .collect();
            spreadsheet_column(name, &cells)
        })
        .collect::<Vec<_>>();

    Ok(untyped_as_float(DataFrame::new(columns)?)?)
}

fn header_name(position: usize, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("Unnamed: {position}")
    } else {
        trimmed.to_string()
    }
}

/// Builds one column from worksheet cells, typed by what the cells hold:
/// whole numbers, any numbers, booleans, or text as a fallback.
fn spreadsheet_column(name: String, cells: &[&Data]) -> Column {
    let name = PlSmallStr::from(name);
    let present: Vec<&Data> = cells.iter().copied().filter(|c| !is_missing(c)).collect();

    if !present.is_empty() && present.iter().all(|c| cell_number(c).is_some()) {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| if is_missing(c) { None } else { cell_number(c) })
            .collect();
        let whole = values
            .iter()
            .flatten()
            .all(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64);
        if whole {
            let ints: Vec<Option<i64>> = values.iter().map(|v| v.map(|n| n as i64)).collect();
            return Series::new(name, ints).into();
        }
        return Series::new(name, values).into();
    }

    if !present.is_empty() && present.iter().all(|c| matches!(c, Data::Bool(_))) {
        let flags: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Data::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Series::new(name, flags).into();
    }

    let texts: Vec<Option<String>> = cells
        .iter()
        .map(|c| if is_missing(c) { None } else { cell_text(c) })
        .collect();
    Series::new(name, texts).into()
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        _ => None,
    }
}

fn is_missing(cell: &Data) -> bool {
    match cell {
        Data::Empty | Data::Error(_) => true,
        Data::String(s) => NA_VALUES.contains(&s.as_str()),
        _ => false,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::DateTime(dt) => Some(match dt.as_datetime() {
            Some(ts) => format_timestamp(ts),
            None => dt.as_f64().to_string(),
        }),
        Data::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        other => Some(other.to_string()),
    }
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Columns with no values at all load as float, the way blank numeric
/// columns do, so they still join against number keys.
fn untyped_as_float(mut df: DataFrame) -> PolarsResult<DataFrame> {
    let blank: Vec<PlSmallStr> = df
        .get_columns()
        .iter()
        .filter(|c| c.null_count() == c.len() && !c.dtype().is_float())
        .map(|c| c.name().clone())
        .collect();
    for name in blank {
        let cast = df.column(&name)?.cast(&DataType::Float64)?;
        df.with_column(cast)?;
    }
    Ok(df)
}
