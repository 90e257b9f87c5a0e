//! Column names used by the location tables, and checks on their contents.

use polars::prelude::*;

use crate::error::{FrameError, Result};

pub const FACILITY_ID: &str = "FacilityID";
pub const LOC_NAME: &str = "LocName";
pub const MERGE_ID: &str = "Merge_ID";
pub const MERGE_NUM: &str = "Merge_Num";
pub const REGION: &str = "Region";
pub const SUM_TURNOVER: &str = "Sum_Turnov";
pub const OUTLET_COUNT: &str = "OutletCt";

// Added by the merge stages
pub const FACILITY_ID_MERGE: &str = "FacilityID_merge";
pub const SUM_TURNOVER_LOC2: &str = "Sum_Turnov_loc2";
pub const OUTLET_COUNT_LOC2: &str = "OutletCt_loc2";

// Added by postprocessing
pub const TOTAL_TURNOVER: &str = "Total_TURNOV";
pub const TOTAL_OUTLET_COUNT: &str = "Total_OutletCt";
pub const AVG_TURNOVER: &str = "avg_TURNOV";

/// Leading index column left behind when a table was saved with its row index.
pub const INDEX_COLUMN: &str = "Unnamed: 0";

/// Fails with [`FrameError::MissingColumn`] on the first name `df` lacks.
pub fn require_columns(df: &DataFrame, names: &[&str]) -> Result<()> {
    match names.iter().find(|name| df.column(name).is_err()) {
        Some(name) => Err(FrameError::MissingColumn(name.to_string())),
        None => Ok(()),
    }
}

pub fn is_number(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float()
}

/// Fails with [`FrameError::NonNumeric`] unless `name` holds numbers, pointing
/// at the first value that is not one.
pub fn require_numeric(df: &DataFrame, name: &str) -> Result<()> {
    require_columns(df, &[name])?;
    let column = df.column(name)?.as_materialized_series().rechunk();
    if is_number(column.dtype()) || column.null_count() == column.len() {
        return Ok(());
    }
    let (row, value) = column
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_null())
        .map(|(row, v)| (row, v.get_str().map_or_else(|| v.to_string(), str::to_string)))
        .unwrap_or_default();
    Err(FrameError::NonNumeric {
        column: name.to_string(),
        row,
        value,
    })
}

/// Reads `name` as floats. Nulls stay `None`.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    require_numeric(df, name)?;
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.as_materialized_series().f64()?.into_iter().collect())
}
