//! Writes the per-item outcome report

use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::ReportError;
use crate::core::{ItemResult, ResultSet};

const HEADER: [&str; 5] = ["ID", "Name", "PrimaryDownloadURL", "FallbackDownloadURL", "DownloadState"];
const SHEET_NAME: &str = "Metadata";
// Widths for columns B to E; the id column keeps the default
const COLUMN_WIDTHS: [(u16, f64); 4] = [(1, 50.0), (2, 150.0), (3, 150.0), (4, 200.0)];

/// Output table format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
    Xlsx,
}

impl ReportFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "metadata.csv",
            ReportFormat::Json => "metadata.json",
            ReportFormat::Xlsx => "metadata.xlsx",
        }
    }

    /// Workbook input gets a workbook report, anything else CSV
    pub fn matching_input(input: &Path) -> Self {
        if super::is_workbook(input) {
            ReportFormat::Xlsx
        } else {
            ReportFormat::Csv
        }
    }
}

/// One output row; the outcome is flattened to a single line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "PrimaryDownloadURL")]
    pub primary_url: String,
    #[serde(rename = "FallbackDownloadURL")]
    pub fallback_url: String,
    #[serde(rename = "DownloadState")]
    pub outcome: String,
}

impl From<&ItemResult> for ReportRow {
    fn from(result: &ItemResult) -> Self {
        Self {
            id: result.item.id.clone(),
            name: result.item.name.clone(),
            primary_url: result.item.primary_url.clone(),
            fallback_url: result.item.fallback_url.clone(),
            outcome: result.outcome.single_line_description(),
        }
    }
}

/// Write `results` into `directory` and return the written path
pub fn write_results(results: &ResultSet, directory: &Path, format: ReportFormat) -> Result<PathBuf, ReportError> {
    let path = directory.join(format.file_name());
    info!("Writing download result metadata to '{}'", path.display());

    let rows: Vec<ReportRow> = results.iter().map(ReportRow::from).collect();
    match format {
        ReportFormat::Csv => write_csv(&path, &rows)?,
        ReportFormat::Json => write_json(&path, &rows)?,
        ReportFormat::Xlsx => write_xlsx(&path, &rows)?,
    }

    Ok(path)
}

fn write_csv(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let csv_error = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    if rows.is_empty() {
        writer
            .write_record(HEADER)
            .map_err(csv_error)?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let json = serde_json::to_vec_pretty(rows).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_xlsx(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let xlsx_error = |source| ReportError::WorkbookWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(xlsx_error)?;
    for (col, width) in COLUMN_WIDTHS {
        sheet.set_column_width(col, width).map_err(xlsx_error)?;
    }

    let bold = Format::new().set_bold();
    for (col, title) in HEADER.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *title, &bold)
            .map_err(xlsx_error)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let line = index as u32 + 1;
        let values = [&row.id, &row.name, &row.primary_url, &row.fallback_url, &row.outcome];
        for (col, value) in values.into_iter().enumerate() {
            sheet.write_string(line, col as u16, value.as_str()).map_err(xlsx_error)?;
        }
    }

    workbook.save(path).map_err(xlsx_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FetchError, Item, Outcome, Stage};
    use tempfile::tempdir;

    fn sample() -> ResultSet {
        ResultSet::from_results(vec![
            ItemResult {
                item: Item::new("A", "Alpha, Inc.", "http://a/a.pdf", ""),
                outcome: Outcome::Succeeded {
                    written_path: PathBuf::from("A.pdf"),
                },
            },
            ItemResult {
                item: Item::new("B", "Beta", "http://a/b.pdf", ""),
                outcome: Outcome::failed(FetchError::AllSourcesFailed {
                    primary: Box::new(FetchError::UnacceptableStatus {
                        url: "http://a/b.pdf".into(),
                        status: 404,
                    }),
                    fallback: Box::new(FetchError::NoLocation { stage: Stage::Fallback }),
                }),
            },
            ItemResult {
                item: Item::new("C", "Gamma", "", ""),
                outcome: Outcome::MissingSource,
            },
        ])
    }

    #[test]
    fn csv_report_has_one_line_per_result() {
        let dir = tempdir().unwrap();
        let path = write_results(&sample(), dir.path(), ReportFormat::Csv).unwrap();
        assert_eq!(path, dir.path().join("metadata.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap(),
            vec!["ID", "Name", "PrimaryDownloadURL", "FallbackDownloadURL", "DownloadState"]
        );

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[0][1], "Alpha, Inc.");
        assert_eq!(&records[0][4], "Done");
        assert!(records[1][4].starts_with("Error: all download links were broken:, "));
        assert!(!records[1][4].contains('\n'));
        assert_eq!(&records[2][4], "Missing URLs");
    }

    #[test]
    fn json_report() {
        let dir = tempdir().unwrap();
        let path = write_results(&sample(), dir.path(), ReportFormat::Json).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["ID"], "C");
        assert_eq!(rows[2]["DownloadState"], "Missing URLs");
    }

    #[test]
    fn xlsx_report_uses_metadata_sheet() {
        use calamine::{Data, Reader, open_workbook_auto};

        let dir = tempdir().unwrap();
        let path = write_results(&sample(), dir.path(), ReportFormat::Xlsx).unwrap();
        assert_eq!(path, dir.path().join("metadata.xlsx"));

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Metadata".to_string()]);

        let range = workbook.worksheet_range("Metadata").unwrap();
        assert_eq!(range.end(), Some((3, 4)));
        let text = |row: u32, col: u32| match range.get_value((row, col)) {
            Some(Data::String(s)) => s.clone(),
            other => panic!("unexpected cell at ({row}, {col}): {other:?}"),
        };

        let header: Vec<String> = (0..5).map(|col| text(0, col)).collect();
        assert_eq!(header, HEADER);
        assert_eq!(text(1, 0), "A");
        assert_eq!(text(1, 1), "Alpha, Inc.");
        assert_eq!(text(1, 4), "Done");
        assert!(text(2, 4).starts_with("Error: all download links were broken:, "));
        assert_eq!(text(3, 4), "Missing URLs");
    }

    #[test]
    fn report_format_follows_input() {
        assert_eq!(ReportFormat::matching_input(Path::new("reports.xlsx")), ReportFormat::Xlsx);
        assert_eq!(ReportFormat::matching_input(Path::new("reports.csv")), ReportFormat::Csv);
    }

    #[test]
    fn empty_result_set_still_gets_a_header() {
        let dir = tempdir().unwrap();
        let path = write_results(&ResultSet::default(), dir.path(), ReportFormat::Csv).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.trim(), "ID,Name,PrimaryDownloadURL,FallbackDownloadURL,DownloadState");
    }
}
