use polars::prelude::*;
use std::path::Path;
use tracing::info;

use crate::columns::require_columns;
use crate::error::Result;
use crate::output::write_table;

/// Returns every row whose value in `column` is shared with at least one other
/// row. All members of a repeated group are kept, in table order.
pub fn duplicated_rows(df: &DataFrame, column: &str) -> Result<DataFrame> {
    require_columns(df, &[column])?;
    Ok(df
        .clone()
        .lazy()
        .filter(col(column).is_duplicated())
        .collect()?)
}

/// Writes the rows duplicated on `column` to `outfile` and returns how many
/// there were. The source table is left as it is.
pub fn save_duplicates(
    df: &DataFrame,
    column: &str,
    outfile: &Path,
    overwrite: bool,
) -> Result<usize> {
    let duplicates = duplicated_rows(df, column)?;
    info!(
        column,
        duplicates = duplicates.height(),
        path = %outfile.display(),
        "Saving duplicated rows"
    );
    write_table(&duplicates, outfile, overwrite)?;
    Ok(duplicates.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("FacilityID".into(), &[1i64, 2, 3, 4, 5]).into(),
            Series::new("Merge_ID".into(), &[10i64, 11, 10, 12, 10]).into(),
        ])
        .unwrap()
    }

    fn ids(df: &DataFrame) -> Vec<Option<i64>> {
        let series = df.column("FacilityID").unwrap().as_materialized_series();
        series.i64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_duplicated_rows_marks_every_member() {
        let dups = duplicated_rows(&frame(), "Merge_ID").unwrap();
        assert_eq!(ids(&dups), vec![Some(1), Some(3), Some(5)]);
    }

    #[test]
    fn test_unique_values_never_reported() {
        let dups = duplicated_rows(&frame(), "FacilityID").unwrap();
        assert_eq!(dups.height(), 0);
        assert_eq!(dups.get_column_names_str(), frame().get_column_names_str());
    }

    #[test]
    fn test_blank_values_count_as_duplicates() {
        let df = DataFrame::new(vec![
            Series::new("FacilityID".into(), &[1i64, 2, 3]).into(),
            Series::new("Merge_ID".into(), &[None, None, Some(7.0)]).into(),
        ])
        .unwrap();
        let dups = duplicated_rows(&df, "Merge_ID").unwrap();
        assert_eq!(ids(&dups), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        assert!(matches!(
            duplicated_rows(&frame(), "FacilityID_merge"),
            Err(FrameError::MissingColumn(c)) if c == "FacilityID_merge"
        ));
    }

    #[test]
    fn test_save_duplicates_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2022_duplicate_1.csv");

        let n = save_duplicates(&frame(), "Merge_ID", &path, false).unwrap();
        assert_eq!(n, 3);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
    }
}
