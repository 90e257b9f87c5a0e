use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::weighted::{generate_replacement_locations, regions};
use crate::columns::{REGION, require_columns};
use crate::error::Result;
use crate::output::write_table;
use crate::parser::load_table;

/// Settings for a replacement sampling run.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Replacements drawn per region.
    pub n_locations: usize,
    pub overwrite: bool,
    /// Fixes the random draws so a run can be repeated. Without it the
    /// generator is seeded from the operating system.
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            n_locations: 5,
            overwrite: false,
            seed: None,
        }
    }
}

impl SamplingConfig {
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => {
                info!(seed, "Using fixed random seed");
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegionSelection {
    pub region: String,
    pub candidates: usize,
    pub selected: usize,
}

#[derive(Debug, Serialize)]
pub struct SamplingSummary {
    pub input_rows: usize,
    pub selected_rows: usize,
    pub regions: Vec<RegionSelection>,
    pub outfile: PathBuf,
}

/// Draws replacements for every region of `locations` and stacks them in
/// region order.
pub fn select_replacements<R: Rng + ?Sized>(
    locations: &DataFrame,
    n_locations: usize,
    rng: &mut R,
) -> Result<(DataFrame, Vec<RegionSelection>)> {
    require_columns(locations, &[REGION])?;
    let blank_regions = locations.column(REGION)?.null_count();
    if blank_regions > 0 {
        warn!(rows = blank_regions, "Skipping locations without a region");
    }

    let mut selections = Vec::new();
    let mut combined = locations.head(Some(0));
    for region in regions(locations)? {
        let candidates = locations
            .clone()
            .lazy()
            .filter(col(REGION).cast(DataType::String).eq(lit(region.as_str())))
            .collect()?
            .height();
        let selection = generate_replacement_locations(locations, &region, n_locations, rng)?;
        combined.vstack_mut(&selection)?;
        selections.push(RegionSelection {
            region,
            candidates,
            selected: selection.height(),
        });
    }

    Ok((combined, selections))
}

/// Loads `infile`, selects replacements per region and writes them to `outfile`.
#[tracing::instrument(
    skip_all,
    fields(infile = %infile.display(), outfile = %outfile.display(), n_locations = config.n_locations)
)]
pub fn sample_replacements(
    infile: &Path,
    outfile: &Path,
    config: &SamplingConfig,
) -> Result<SamplingSummary> {
    let locations = load_table(infile)?;
    let mut rng = config.rng();
    let (replacements, regions) = select_replacements(&locations, config.n_locations, &mut rng)?;

    write_table(&replacements, outfile, config.overwrite)?;
    info!(
        selected = replacements.height(),
        regions = regions.len(),
        "Replacement locations written"
    );

    Ok(SamplingSummary {
        input_rows: locations.height(),
        selected_rows: replacements.height(),
        regions,
        outfile: outfile.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{FACILITY_ID, SUM_TURNOVER};

    fn locations() -> DataFrame {
        DataFrame::new(vec![
            Series::new(FACILITY_ID.into(), &[1i64, 2, 3, 4, 5, 6]).into(),
            Series::new(
                REGION.into(),
                &[
                    Some("Wales"),
                    Some("London"),
                    Some("Wales"),
                    Some("London"),
                    Some("London"),
                    None,
                ],
            )
            .into(),
            Series::new(SUM_TURNOVER.into(), &[10i64, 20, 30, 40, 50, 60]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_select_replacements_per_region() {
        let mut rng = StdRng::seed_from_u64(5);
        let (df, regions) = select_replacements(&locations(), 2, &mut rng).unwrap();

        assert_eq!(df.height(), 4);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].region, "Wales");
        assert_eq!(regions[0].candidates, 2);
        assert_eq!(regions[1].region, "London");
        assert_eq!(regions[1].candidates, 3);
        assert_eq!(regions[1].selected, 2);

        // Wales picks come first, then London
        let region = df.column(REGION).unwrap().as_materialized_series();
        let order: Vec<_> = region.str().unwrap().into_iter().flatten().collect();
        assert_eq!(order, ["Wales", "Wales", "London", "London"]);
    }

    #[test]
    fn test_select_replacements_empty_input_keeps_columns() {
        let mut rng = StdRng::seed_from_u64(5);
        let empty = locations().head(Some(0));
        let (df, regions) = select_replacements(&empty, 5, &mut rng).unwrap();
        assert_eq!(df.height(), 0);
        assert!(regions.is_empty());
        assert_eq!(df.get_column_names_str(), empty.get_column_names_str());
    }

    #[test]
    fn test_seeded_runs_write_the_same_locations() {
        let dir = tempfile::tempdir().unwrap();
        let infile = dir.path().join("Currentsamplingframe.csv");
        write_table(&locations(), &infile, false).unwrap();

        let config = SamplingConfig {
            n_locations: 1,
            seed: Some(2022),
            ..SamplingConfig::default()
        };
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        sample_replacements(&infile, &first, &config).unwrap();
        sample_replacements(&infile, &second, &config).unwrap();

        assert_eq!(
            std::fs::read_to_string(&first).unwrap(),
            std::fs::read_to_string(&second).unwrap()
        );
    }
}
