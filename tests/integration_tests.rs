use polars::prelude::*;
use sample_frame::error::FrameError;
use sample_frame::frame::{FrameConfig, FrameOutputs, prepare_sample_frame};
use sample_frame::parser::load_table;
use sample_frame::sampling::{SamplingConfig, sample_replacements};
use std::fs;
use std::path::Path;

const FRAME_CSV: &str = "\
FacilityID,LocName,Merge_ID,Merge_Num,Region,Sum_Turnov,OutletCt
1,High Street,2,1,North,100,300
2,Market Square,,2,North,50,100
";

const DUPLICATE_CSV: &str = "\
FacilityID,LocName,Merge_ID,Merge_Num,Region,Sum_Turnov,OutletCt
1,High Street,3,1,North,100,300
2,Station Road,3,1,North,200,400
3,Market Square,,2,North,50,100
4,Retail Park,,1,South,900,1200
";

fn write_input(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("SampleFrame2022.csv");
    fs::write(&path, contents).unwrap();
    path
}

fn number(df: &DataFrame, row: usize, column: &str) -> f64 {
    let series = df.column(column).unwrap().as_materialized_series();
    series
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .get(row)
        .unwrap_or_else(|| panic!("{column} missing at row {row}"))
}

#[test]
fn test_frame_preparation_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let infile = write_input(dir.path(), FRAME_CSV);

    let summary = prepare_sample_frame(&infile, &FrameConfig::default()).unwrap();
    assert_eq!(summary.input_rows, 2);
    assert_eq!(summary.frame_rows, 1);

    let outputs = FrameOutputs::beside(&infile, 2022);
    for path in [
        &outputs.id_merge,
        &outputs.intermediate,
        &outputs.intermediate_totals,
        &outputs.draft,
        &outputs.duplicate_merge_id,
        &outputs.duplicate_facility_id,
    ] {
        assert!(path.exists(), "{} not written", path.display());
    }

    let draft = load_table(&outputs.draft).unwrap();
    assert_eq!(draft.height(), 1);
    assert_eq!(number(&draft, 0, "FacilityID"), 1.0);
    assert_eq!(number(&draft, 0, "Total_TURNOV"), 150.0);
    assert_eq!(number(&draft, 0, "Total_OutletCt"), 400.0);
    assert_eq!(number(&draft, 0, "avg_TURNOV"), 0.375);

    let totals = load_table(&outputs.intermediate_totals).unwrap();
    assert_eq!(totals.height(), 2);
    assert_eq!(number(&totals, 1, "Sum_Turnov_loc2"), 0.0);
}

#[test]
fn test_frame_preparation_reports_shared_donor() {
    let dir = tempfile::tempdir().unwrap();
    let infile = write_input(dir.path(), DUPLICATE_CSV);

    let summary = prepare_sample_frame(&infile, &FrameConfig::default()).unwrap();
    // Retail Park has no partner, so its Merge_ID and FacilityID_merge are 0 alone
    assert_eq!(summary.frame_rows, 3);
    assert_eq!(summary.duplicate_merge_id_rows, 2);
    assert_eq!(summary.duplicate_facility_id_rows, 2);

    let dups = load_table(&summary.outputs.duplicate_facility_id).unwrap();
    let ids: Vec<f64> = (0..dups.height()).map(|r| number(&dups, r, "FacilityID")).collect();
    assert_eq!(ids, vec![1.0, 2.0]);
}

#[test]
fn test_frame_preparation_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let infile = write_input(dir.path(), FRAME_CSV);
    let outputs = FrameOutputs::beside(&infile, 2022);
    fs::write(&outputs.id_merge, "existing").unwrap();

    let err = prepare_sample_frame(&infile, &FrameConfig::default()).unwrap_err();
    assert!(matches!(err, FrameError::OutputExists { .. }));
    assert_eq!(fs::read_to_string(&outputs.id_merge).unwrap(), "existing");
    assert!(!outputs.intermediate.exists());

    let config = FrameConfig {
        overwrite: true,
        ..FrameConfig::default()
    };
    prepare_sample_frame(&infile, &config).unwrap();
    assert_eq!(load_table(&outputs.id_merge).unwrap().height(), 2);
}

#[test]
fn test_frame_preparation_treats_na_donor_cells_as_zero() {
    let dir = tempfile::tempdir().unwrap();
    let infile = write_input(
        dir.path(),
        "\
FacilityID,LocName,Merge_ID,Merge_Num,Region,Sum_Turnov,OutletCt
1,High Street,2,1,North,100,300
2,Market Square,,2,North,NA,NaN
",
    );

    let summary = prepare_sample_frame(&infile, &FrameConfig::default()).unwrap();
    assert_eq!(summary.frame_rows, 1);

    let draft = load_table(&summary.outputs.draft).unwrap();
    assert_eq!(number(&draft, 0, "Total_TURNOV"), 100.0);
    assert_eq!(number(&draft, 0, "Total_OutletCt"), 300.0);
}

#[test]
fn test_frame_preparation_missing_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    let infile = write_input(dir.path(), "FacilityID,LocName,Merge_Num\n1,High Street,1\n");

    let err = prepare_sample_frame(&infile, &FrameConfig::default()).unwrap_err();
    assert!(matches!(err, FrameError::MissingColumn(c) if c == "Merge_ID"));
}

#[test]
fn test_replacement_sampling_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let infile = write_input(dir.path(), DUPLICATE_CSV);
    let outfile = dir
        .path()
        .join("2022 Replacement Locations")
        .join("Replacement locations.csv");

    let config = SamplingConfig {
        n_locations: 2,
        seed: Some(11),
        ..SamplingConfig::default()
    };
    let summary = sample_replacements(&infile, &outfile, &config).unwrap();

    assert_eq!(summary.selected_rows, 3);
    let written = load_table(&outfile).unwrap();
    assert_eq!(written.height(), 3);
    assert_eq!(written.get_column_names_str()[0], "FacilityID");

    let err = sample_replacements(&infile, &outfile, &config).unwrap_err();
    assert!(matches!(err, FrameError::OutputExists { .. }));
}
