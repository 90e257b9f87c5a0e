use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::duplicates::save_duplicates;
use super::merge::{merge_facility_id, merge_turnover_outlets};
use super::postproc::{filter_sample_frame, postprocess_turnover};
use crate::columns::{FACILITY_ID_MERGE, MERGE_ID};
use crate::error::Result;
use crate::output::write_table;
use crate::parser::load_table;

/// Settings for a frame preparation run.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Year stamped into the output file names.
    pub year: u16,
    /// Smallest combined outlet count kept in the frame.
    pub min_outlets: f64,
    /// `Merge_Num` value marking donor locations.
    pub donor_role: f64,
    pub overwrite: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig {
            year: 2022,
            min_outlets: 250.0,
            donor_role: 2.0,
            overwrite: false,
        }
    }
}

/// Files written by a frame preparation run, all next to the input file.
#[derive(Debug, Clone, Serialize)]
pub struct FrameOutputs {
    pub id_merge: PathBuf,
    pub intermediate: PathBuf,
    pub intermediate_totals: PathBuf,
    pub draft: PathBuf,
    pub duplicate_merge_id: PathBuf,
    pub duplicate_facility_id: PathBuf,
}

impl FrameOutputs {
    pub fn beside(infile: &Path, year: u16) -> Self {
        let dir = infile.parent().unwrap_or(Path::new(""));
        let stage = |name: &str| {
            dir.join(format!(
                "CPI_New_Sampling_Frame_TableToExcel__{name}_{year}.xlsx"
            ))
        };
        FrameOutputs {
            id_merge: stage("ID_Merge"),
            intermediate: stage("Intermediate"),
            intermediate_totals: stage("Intermediate2"),
            draft: dir.join(format!("CPI_New_Sampling_Frame_Draft_{year}.xlsx")),
            duplicate_merge_id: dir.join(format!("{year}_duplicate_1.xlsx")),
            duplicate_facility_id: dir.join(format!("{year}_duplicate_2.xlsx")),
        }
    }
}

/// Row counts and output paths of a finished run.
#[derive(Debug, Serialize)]
pub struct FrameSummary {
    pub input_rows: usize,
    pub merged_rows: usize,
    pub frame_rows: usize,
    pub duplicate_merge_id_rows: usize,
    pub duplicate_facility_id_rows: usize,
    pub outputs: FrameOutputs,
}

/// Runs the whole frame preparation: merge partners, merge donor turnover,
/// compute totals, filter, and report duplicated pairings.
///
/// Each stage's table is written as soon as it is built, so a failure part
/// way through leaves the earlier files in place.
#[tracing::instrument(skip_all, fields(infile = %infile.display(), year = config.year))]
pub fn prepare_sample_frame(infile: &Path, config: &FrameConfig) -> Result<FrameSummary> {
    let outputs = FrameOutputs::beside(infile, config.year);
    let locations = load_table(infile)?;

    let id_merged = merge_facility_id(&locations)?;
    write_table(&id_merged, &outputs.id_merge, config.overwrite)?;

    let turnover_merged = merge_turnover_outlets(&id_merged, &locations)?;
    write_table(&turnover_merged, &outputs.intermediate, config.overwrite)?;

    let totals = postprocess_turnover(&turnover_merged)?;
    write_table(&totals, &outputs.intermediate_totals, config.overwrite)?;

    let frame = filter_sample_frame(&totals, config.min_outlets, config.donor_role)?;
    write_table(&frame, &outputs.draft, config.overwrite)?;
    info!(
        before = totals.height(),
        after = frame.height(),
        "Removed donor and undersized locations"
    );

    // A donor claimed by more than one acceptor shows up in either report
    let duplicate_merge_id_rows =
        save_duplicates(&frame, MERGE_ID, &outputs.duplicate_merge_id, config.overwrite)?;
    let duplicate_facility_id_rows = save_duplicates(
        &frame,
        FACILITY_ID_MERGE,
        &outputs.duplicate_facility_id,
        config.overwrite,
    )?;

    Ok(FrameSummary {
        input_rows: locations.height(),
        merged_rows: turnover_merged.height(),
        frame_rows: frame.height(),
        duplicate_merge_id_rows,
        duplicate_facility_id_rows,
        outputs,
    })
}
