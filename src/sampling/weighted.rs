use polars::prelude::*;
use rand::Rng;
use tracing::info;

use crate::columns::{REGION, SUM_TURNOVER, numeric_values, require_columns};
use crate::error::Result;

const WEIGHT: &str = "__weight";

/// The region column read as text, so numeric region codes compare too.
fn region_text() -> Expr {
    col(REGION).cast(DataType::String)
}

/// Distinct regions in order of first appearance. Blank regions are skipped.
pub fn regions(df: &DataFrame) -> Result<Vec<String>> {
    require_columns(df, &[REGION])?;
    let distinct = df
        .clone()
        .lazy()
        .select([region_text().drop_nulls().unique_stable()])
        .collect()?;

    let column = distinct.column(REGION)?.as_materialized_series();
    Ok(column
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
}

/// Picks up to `n_locations` rows of `region`, favouring high turnover.
///
/// Each row's turnover share is multiplied by its own uniform draw from
/// `[0, 1)` and the rows are ranked by the result, largest first. Larger
/// locations are more likely to rank near the top without being certain to.
/// Rows with no turnover rank last. Asking for more rows than the region has
/// returns the whole region.
pub fn generate_replacement_locations<R: Rng + ?Sized>(
    df: &DataFrame,
    region: &str,
    n_locations: usize,
    rng: &mut R,
) -> Result<DataFrame> {
    info!(n_locations, region, "Generating replacement locations");
    require_columns(df, &[REGION, SUM_TURNOVER])?;

    let mut regional = df
        .clone()
        .lazy()
        .filter(region_text().eq(lit(region)))
        .collect()?;

    let turnover = numeric_values(&regional, SUM_TURNOVER)?;
    let total: f64 = turnover.iter().flatten().filter(|t| !t.is_nan()).sum();

    // One draw per row, so the sequence does not depend on missing turnover
    let weights: Vec<Option<f64>> = turnover
        .iter()
        .map(|t| {
            let draw = rng.gen_range(0.0..1.0);
            t.map(|t| t / total * draw).filter(|w| !w.is_nan())
        })
        .collect();
    regional.with_column(Series::new(WEIGHT.into(), weights))?;

    let ranked = regional.sort(
        [WEIGHT],
        SortMultipleOptions::default()
            .with_order_descending(true)
            .with_nulls_last(true)
            .with_maintain_order(true),
    )?;
    Ok(ranked.head(Some(n_locations)).drop(WEIGHT)?)
}
