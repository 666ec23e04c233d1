//! Reads input items from a spreadsheet or a CSV table
//!
//! The first row is always a header and is skipped. Workbooks (`.xlsx`,
//! `.xlsm`, `.xls`, `.ods`) are read from their first sheet; anything else
//! is read as CSV. Columns are picked by letter (`A`, `AL`) or by header
//! name, so extra columns are fine.

use calamine::Reader;
use std::fmt;
use std::path::Path;
use tracing::debug;

use super::ReportError;
use crate::core::Item;

const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Whether `path` names a spreadsheet workbook rather than a CSV file
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Where one field of an item is found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    /// Zero-based position, written as a spreadsheet letter
    Letter(usize),
    /// Header text, matched case-insensitively
    Header(String),
}

impl Column {
    /// One to three uppercase ASCII letters name a column position;
    /// anything else is a header name.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        let is_letters = (1..=3).contains(&name.len()) && name.bytes().all(|b| b.is_ascii_uppercase());
        if is_letters {
            let index = name
                .bytes()
                .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1));
            Column::Letter(index - 1)
        } else {
            Column::Header(name.to_string())
        }
    }

    pub fn header(name: impl Into<String>) -> Self {
        Column::Header(name.into())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Letter(index) => {
                let mut letters = Vec::new();
                let mut n = index + 1;
                while n > 0 {
                    let rem = (n - 1) % 26;
                    letters.push(char::from(b'A' + rem as u8));
                    n = (n - 1) / 26;
                }
                letters.iter().rev().try_for_each(|c| write!(f, "{c}"))
            }
            Column::Header(name) => write!(f, "{name}"),
        }
    }
}

/// The four columns an item is built from
///
/// Defaults to the report workbook layout: id in `A`, name in `C`, primary
/// URL in `AL`, fallback URL in `AM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub id: Column,
    pub name: Column,
    pub primary_url: Column,
    pub fallback_url: Column,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: Column::parse("A"),
            name: Column::parse("C"),
            primary_url: Column::parse("AL"),
            fallback_url: Column::parse("AM"),
        }
    }
}

struct ColumnIndexes {
    id: usize,
    name: usize,
    primary_url: usize,
    fallback_url: usize,
}

impl ColumnMapping {
    fn resolve(&self, headers: &[String], path: &Path) -> Result<ColumnIndexes, ReportError> {
        let find = |column: &Column| match column {
            Column::Letter(index) => Ok(*index),
            Column::Header(name) => headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name.trim()))
                .ok_or_else(|| ReportError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.clone(),
                }),
        };

        Ok(ColumnIndexes {
            id: find(&self.id)?,
            name: find(&self.name)?,
            primary_url: find(&self.primary_url)?,
            fallback_url: find(&self.fallback_url)?,
        })
    }
}

/// Read every data row of the table at `path` as an `Item`
///
/// Missing cells read as empty strings.
pub fn read_items(path: &Path, mapping: &ColumnMapping) -> Result<Vec<Item>, ReportError> {
    let (headers, rows) = if is_workbook(path) {
        read_workbook(path)?
    } else {
        read_csv(path)?
    };

    let columns = mapping.resolve(&headers, path)?;
    let items: Vec<Item> = rows
        .into_iter()
        .map(|row| {
            let cell = |index: usize| row.get(index).cloned().unwrap_or_default();
            Item {
                id: cell(columns.id),
                name: cell(columns.name),
                primary_url: cell(columns.primary_url),
                fallback_url: cell(columns.fallback_url),
            }
        })
        .collect();

    debug!("Read {} items from {}", items.len(), path.display());
    Ok(items)
}

type Table = (Vec<String>, Vec<Vec<String>>);

fn read_csv(path: &Path) -> Result<Table, ReportError> {
    let csv_error = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let headers: Vec<String> = reader.headers().map_err(csv_error)?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(ReportError::Empty {
            path: path.to_path_buf(),
        });
    }

    let rows = reader
        .records()
        .map(|record| -> Result<Vec<String>, ReportError> {
            Ok(record.map_err(csv_error)?.iter().map(str::to_string).collect())
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((headers, rows))
}

fn read_workbook(path: &Path) -> Result<Table, ReportError> {
    let workbook_error = |source| ReportError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let empty = || ReportError::Empty {
        path: path.to_path_buf(),
    };

    let mut workbook = calamine::open_workbook_auto(path).map_err(workbook_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(empty)?
        .map_err(workbook_error)?;
    let (last_row, last_col) = range.end().ok_or_else(empty)?;

    // Positions are absolute, so leading blank rows or columns do not shift anything
    let row_cells = |row: u32| -> Vec<String> {
        (0..=last_col)
            .map(|col| {
                range
                    .get_value((row, col))
                    .map(|value| value.to_string().trim().to_string())
                    .unwrap_or_default()
            })
            .collect()
    };

    let headers = row_cells(0);
    let rows = (1..=last_row)
        .map(row_cells)
        .filter(|cells| cells.iter().any(|cell| !cell.is_empty()))
        .collect();

    Ok((headers, rows))
}
