//! Table Ingestion
//!
//! Turns uploaded bytes into a rectangular table of named columns with
//! best-effort cell typing. Only delimited text is understood; anything else
//! is reported as an unsupported format so the caller can ask for a CSV
//! export instead.
//!
//! ```ignore
//! let table = RawTable::from_path("survey.csv")?;
//! let dataset = TimeAligner::new(&config.alignment).align(&table, &TimeColumn::AutoDetect, None)?;
//! ```

pub mod csv;
pub mod datetime;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use datetime::parse_datetime;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file format '{extension}' for {filename} (export the sheet as CSV)")]
    UnsupportedFormat { filename: String, extension: String },

    #[error("Corrupt or unreadable file {filename}: {reason}")]
    Corrupt { filename: String, reason: String },

    #[error("I/O error reading {0}: {1}")]
    Io(String, #[source] std::io::Error),
}

/// One cell after type inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Infer a cell type from raw text. `decimal_comma` accepts `0,25`.
    pub fn infer(raw: &str, decimal_comma: bool) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Self::Empty;
        }
        if let Some(v) = parse_number(s, decimal_comma) {
            return Self::Number(v);
        }
        Self::Text(s.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric value of the cell; text holding a plain decimal number is
    /// coerced, anything else is missing. Decimal-comma cells were already
    /// inferred as numbers by a file that uses them, so a comma left in text
    /// is a thousands separator or a list and stays missing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) if v.is_finite() => Some(*v),
            Self::Text(s) => parse_number(s, false),
            _ => None,
        }
    }
}

fn parse_number(s: &str, decimal_comma: bool) -> Option<f64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<f64>() {
        return v.is_finite().then_some(v);
    }
    if decimal_comma && s.matches(',').count() == 1 && !s.contains('.') {
        if let Ok(v) = s.replace(',', ".").parse::<f64>() {
            return v.is_finite().then_some(v);
        }
    }
    None
}

/// Named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    pub cells: Vec<CellValue>,
}

/// Rectangular table: every column has the same number of cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTable {
    columns: Vec<RawColumn>,
    row_count: usize,
}

impl RawTable {
    /// Build from named columns, padding short columns with empty cells.
    pub fn from_columns(columns: Vec<(String, Vec<CellValue>)>) -> Self {
        let row_count = columns.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
        let columns = columns
            .into_iter()
            .map(|(name, mut cells)| {
                cells.resize(row_count, CellValue::Empty);
                RawColumn { name, cells }
            })
            .collect();
        Self { columns, row_count }
    }

    /// Convenience for tests and small tables: every cell inferred from text.
    pub fn from_text_columns(columns: Vec<(&str, Vec<&str>)>) -> Self {
        Self::from_columns(
            columns
                .into_iter()
                .map(|(name, cells)| {
                    (
                        name.to_string(),
                        cells.into_iter().map(|c| CellValue::infer(c, false)).collect(),
                    )
                })
                .collect(),
        )
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Read a file from disk and parse it by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|e| IngestError::Io(path_str.clone(), e))?;
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(&path_str)
            .to_string();
        Self::from_bytes(&bytes, &filename)
    }

    /// Parse uploaded bytes. The filename's extension selects the reader.
    pub fn from_bytes(bytes: &[u8], filename: &str) -> Result<Self, IngestError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "txt" | "tsv" | "" => Self::from_delimited(bytes, filename),
            _ => Err(IngestError::UnsupportedFormat {
                filename: filename.to_string(),
                extension,
            }),
        }
    }

    fn from_delimited(bytes: &[u8], filename: &str) -> Result<Self, IngestError> {
        let text = std::str::from_utf8(bytes).map_err(|e| IngestError::Corrupt {
            filename: filename.to_string(),
            reason: format!("not valid UTF-8 text ({e})"),
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let lines: Vec<&str> = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty())
            .collect();

        let Some(header_line) = lines.first() else {
            return Err(IngestError::Corrupt {
                filename: filename.to_string(),
                reason: "file is empty".to_string(),
            });
        };

        let delimiter = csv::sniff_delimiter(lines.iter().copied());
        let decimal_comma = delimiter != ',';

        let headers: Vec<String> = csv::split_line(header_line, delimiter)
            .into_iter()
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim().to_string();
                if h.is_empty() { format!("column_{}", i + 1) } else { h }
            })
            .collect();

        if headers.iter().all(|h| h.parse::<f64>().is_ok()) {
            return Err(IngestError::Corrupt {
                filename: filename.to_string(),
                reason: "first line has no column names".to_string(),
            });
        }

        let width = headers.len();
        let mut cells: Vec<Vec<CellValue>> = vec![Vec::with_capacity(lines.len()); width];
        let mut ragged = 0usize;

        for line in &lines[1..] {
            let fields = csv::split_line(line, delimiter);
            if fields.len() != width {
                ragged += 1;
            }
            for (col, column_cells) in cells.iter_mut().enumerate() {
                let raw = fields.get(col).map_or("", String::as_str);
                column_cells.push(CellValue::infer(raw, decimal_comma));
            }
        }

        if ragged > 0 {
            warn!(file = %filename, rows = ragged, "Rows with a different field count than the header");
        }
        debug!(file = %filename, delimiter = ?delimiter, "Delimiter detected");
        info!(
            file = %filename,
            columns = width,
            rows = lines.len() - 1,
            "Table ingested"
        );

        Ok(Self::from_columns(headers.into_iter().zip(cells).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_basic() {
        let data = b"Date,Crack A,Crack B\n01/01/2024,0.10,0.20\n02/01/2024,0.11,\n";
        let table = RawTable::from_bytes(data, "survey.csv").unwrap();
        assert_eq!(table.column_names(), vec!["Date", "Crack A", "Crack B"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("Crack A").unwrap().cells[1], CellValue::Number(0.11));
        assert_eq!(table.column("Crack B").unwrap().cells[1], CellValue::Empty);
        assert_eq!(
            table.column("Date").unwrap().cells[0],
            CellValue::Text("01/01/2024".to_string())
        );
    }

    #[test]
    fn test_bom_and_crlf() {
        let data = "\u{feff}Date,Gauge\r\n01/01/2024,1.5\r\n".as_bytes();
        let table = RawTable::from_bytes(data, "export.CSV").unwrap();
        assert_eq!(table.column_names(), vec!["Date", "Gauge"]);
        assert_eq!(table.column("Gauge").unwrap().cells[0], CellValue::Number(1.5));
    }

    #[test]
    fn test_semicolon_decimal_comma() {
        let data = b"Date;Crack\n01/01/2024;0,25\n";
        let table = RawTable::from_bytes(data, "eu.csv").unwrap();
        assert_eq!(table.column("Crack").unwrap().cells[0], CellValue::Number(0.25));
    }

    #[test]
    fn test_quoted_thousands_in_comma_file_is_missing() {
        let data = b"Date,Crack\n01/01/2024,\"1,234\"\n02/01/2024,0.5\n";
        let table = RawTable::from_bytes(data, "survey.csv").unwrap();
        let crack = table.column("Crack").unwrap();
        assert_eq!(crack.cells[0], CellValue::Text("1,234".to_string()));
        assert_eq!(crack.cells[0].as_number(), None);
        assert_eq!(crack.cells[1].as_number(), Some(0.5));
    }

    #[test]
    fn test_short_rows_padded() {
        let data = b"Date,A,B\n01/01/2024,1\n";
        let table = RawTable::from_bytes(data, "short.csv").unwrap();
        assert_eq!(table.column("B").unwrap().cells, vec![CellValue::Empty]);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = RawTable::from_bytes(b"PK\x03\x04", "survey.xlsx").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_binary_is_corrupt() {
        let err = RawTable::from_bytes(&[0xff, 0xfe, 0x00, 0x81], "survey.csv").unwrap_err();
        assert!(matches!(err, IngestError::Corrupt { .. }));
    }

    #[test]
    fn test_empty_file_is_corrupt() {
        let err = RawTable::from_bytes(b"\n\n", "survey.csv").unwrap_err();
        assert!(matches!(err, IngestError::Corrupt { .. }));
    }

    #[test]
    fn test_text_number_coerces() {
        assert_eq!(CellValue::Text(" 1.5 ".to_string()).as_number(), Some(1.5));
        assert_eq!(CellValue::Text("1,5".to_string()).as_number(), None);
        assert_eq!(CellValue::Text("offline".to_string()).as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }
}
