use polars::prelude::*;
use tracing::debug;

use crate::columns::{
    FACILITY_ID, FACILITY_ID_MERGE, INDEX_COLUMN, LOC_NAME, MERGE_ID, OUTLET_COUNT, SUM_TURNOVER,
    is_number, require_columns,
};
use crate::error::Result;

const PARTNER_SUFFIX: &str = "_merge";
const DONOR_SUFFIX: &str = "_loc2";
const ROW_ORDER: &str = "__row_order";

/// Attaches each acceptor's partner (`LocName_merge`, `FacilityID_merge`) by
/// matching `Merge_ID` against the `FacilityID` of every row in the table.
///
/// Rows without a partner keep nulls in the new columns.
pub fn merge_facility_id(locations: &DataFrame) -> Result<DataFrame> {
    require_columns(locations, &[LOC_NAME, FACILITY_ID, MERGE_ID])?;
    let partners = locations.select([LOC_NAME, FACILITY_ID, MERGE_ID])?;

    let merged = left_join(locations, &partners, MERGE_ID, FACILITY_ID, PARTNER_SUFFIX)?
        .drop(&format!("{MERGE_ID}{PARTNER_SUFFIX}"))?;

    debug!(rows = merged.height(), "Facility IDs merged");
    Ok(merged)
}

/// Pulls the donor's turnover and outlet count (`Sum_Turnov_loc2`,
/// `OutletCt_loc2`) onto each row of `merged`, matching `FacilityID_merge`
/// against the `FacilityID` of `locations`.
pub fn merge_turnover_outlets(merged: &DataFrame, locations: &DataFrame) -> Result<DataFrame> {
    require_columns(merged, &[FACILITY_ID_MERGE])?;
    require_columns(locations, &[FACILITY_ID, SUM_TURNOVER, OUTLET_COUNT])?;
    let donors = locations.select([FACILITY_ID, SUM_TURNOVER, OUTLET_COUNT])?;

    let mut out = left_join(merged, &donors, FACILITY_ID_MERGE, FACILITY_ID, DONOR_SUFFIX)?;
    if out.drop_in_place(INDEX_COLUMN).is_ok() {
        debug!(column = INDEX_COLUMN, "Dropped stale index column");
    }
    let out = out.drop(&format!("{FACILITY_ID}{DONOR_SUFFIX}"))?;

    debug!(rows = out.height(), "Turnover and outlets merged");
    Ok(out)
}

/// Left join that keeps both key columns and the left row order. Right-hand
/// columns whose names clash with the left get `suffix`; null keys never
/// match.
fn left_join(
    left: &DataFrame,
    right: &DataFrame,
    left_on: &str,
    right_on: &str,
    suffix: &str,
) -> Result<DataFrame> {
    let (left, right) = align_key_types(left, left_on, right, right_on)?;
    let args = JoinArgs::new(JoinType::Left)
        .with_suffix(Some(suffix.into()))
        .with_coalesce(JoinCoalesce::KeepColumns);

    let joined = left
        .lazy()
        .with_row_index(ROW_ORDER, None)
        .join(right.lazy(), [col(left_on)], [col(right_on)], args)
        .sort([ROW_ORDER], SortMultipleOptions::default().with_maintain_order(true))
        .collect()?;
    Ok(joined.drop(ROW_ORDER)?)
}

/// Whole-number and fractional keys are compared as floats.
fn align_key_types(
    left: &DataFrame,
    left_on: &str,
    right: &DataFrame,
    right_on: &str,
) -> Result<(DataFrame, DataFrame)> {
    let mut left = left.clone();
    let mut right = right.clone();
    let left_type = left.column(left_on)?.dtype().clone();
    let right_type = right.column(right_on)?.dtype().clone();

    if left_type != right_type && is_number(&left_type) && is_number(&right_type) {
        let cast = left.column(left_on)?.cast(&DataType::Float64)?;
        left.with_column(cast)?;
        let cast = right.column(right_on)?.cast(&DataType::Float64)?;
        right.with_column(cast)?;
    }
    Ok((left, right))
}
