use polars::prelude::*;

use crate::columns::{
    AVG_TURNOVER, MERGE_NUM, OUTLET_COUNT, OUTLET_COUNT_LOC2, SUM_TURNOVER, SUM_TURNOVER_LOC2,
    TOTAL_OUTLET_COUNT, TOTAL_TURNOVER, require_columns, require_numeric,
};
use crate::error::Result;

/// Fills missing values (null and NaN) with zero, then adds `Total_TURNOV`,
/// `Total_OutletCt` and `avg_TURNOV` (turnover per outlet, the size measure
/// for sampling).
///
/// A zero outlet total gives `inf` or `NaN` in `avg_TURNOV`.
pub fn postprocess_turnover(merged: &DataFrame) -> Result<DataFrame> {
    let fills: Vec<Expr> = merged.get_columns().iter().map(zero_fill).collect();
    let filled = merged.clone().lazy().with_columns(fills).collect()?;

    for name in [SUM_TURNOVER, SUM_TURNOVER_LOC2, OUTLET_COUNT, OUTLET_COUNT_LOC2] {
        require_numeric(&filled, name)?;
    }

    let out = filled
        .lazy()
        .with_columns([
            (col(SUM_TURNOVER) + col(SUM_TURNOVER_LOC2)).alias(TOTAL_TURNOVER),
            (col(OUTLET_COUNT) + col(OUTLET_COUNT_LOC2)).alias(TOTAL_OUTLET_COUNT),
        ])
        .with_column(
            (col(TOTAL_TURNOVER).cast(DataType::Float64)
                / col(TOTAL_OUTLET_COUNT).cast(DataType::Float64))
            .alias(AVG_TURNOVER),
        )
        .collect()?;
    Ok(out)
}

/// Text columns take `"0"` and flag columns `false`; numbers take zero.
fn zero_fill(column: &Column) -> Expr {
    let name = column.name().as_str();
    match column.dtype() {
        dtype if dtype.is_float() => col(name).fill_nan(lit(0.0)).fill_null(lit(0.0)),
        dtype if dtype.is_integer() => col(name).fill_null(lit(0)),
        DataType::String => col(name).fill_null(lit("0")),
        DataType::Boolean => col(name).fill_null(lit(false)),
        _ => col(name),
    }
}

/// Keeps rows with at least `min_outlets` combined outlets that are not
/// donors (`Merge_Num == donor_role`). Row order is preserved.
pub fn filter_sample_frame(
    df: &DataFrame,
    min_outlets: f64,
    donor_role: f64,
) -> Result<DataFrame> {
    require_numeric(df, TOTAL_OUTLET_COUNT)?;
    require_columns(df, &[MERGE_NUM])?;

    let large_enough = col(TOTAL_OUTLET_COUNT)
        .cast(DataType::Float64)
        .gt_eq(lit(min_outlets));
    let not_donor = col(MERGE_NUM)
        .cast(DataType::Float64)
        .neq_missing(lit(donor_role));

    Ok(df
        .clone()
        .lazy()
        .filter(large_enough.and(not_donor))
        .collect()?)
}
