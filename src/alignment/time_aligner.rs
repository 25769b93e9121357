//! Time Aligner - raw table to AlignedDataset
//!
//! Picks (or validates) the time column, drops rows whose time cell does not
//! parse, sorts the rest stably by timestamp and coerces sensor columns to
//! numbers. Non-numeric sensor cells become missing values.

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::AlignmentError;
use crate::config::{AlignmentConfig, DuplicatePolicy};
use crate::ingest::{parse_datetime, CellValue, RawColumn, RawTable};
use crate::types::AlignedDataset;

/// Which column carries the timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeColumn {
    Named(String),
    /// First column whose cells mostly parse as date/times
    AutoDetect,
}

/// Parses, filters and orders a raw table onto one timeline.
#[derive(Debug, Clone)]
pub struct TimeAligner {
    min_parse_ratio: f64,
    duplicates: DuplicatePolicy,
}

impl TimeAligner {
    pub fn new(config: &AlignmentConfig) -> Self {
        Self {
            min_parse_ratio: config.min_time_parse_ratio,
            duplicates: config.duplicate_timestamps,
        }
    }

    /// Align `table` onto its time column.
    ///
    /// `sensors` names the sensor columns; `None` selects every other column
    /// holding at least one number.
    pub fn align(
        &self,
        table: &RawTable,
        time: &TimeColumn,
        sensors: Option<&[String]>,
    ) -> Result<AlignedDataset, AlignmentError> {
        let time_column = match time {
            TimeColumn::Named(name) => table
                .column(name)
                .ok_or_else(|| AlignmentError::TimeColumnMissing(name.clone()))?,
            TimeColumn::AutoDetect => self.detect_time_column(table)?,
        };

        let sensor_columns = Self::select_sensor_columns(table, &time_column.name, sensors)?;

        // (timestamp, original row index) for rows whose time parsed
        let mut rows: Vec<(NaiveDateTime, usize)> = time_column
            .cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell_timestamp(cell).map(|t| (t, i)))
            .collect();

        let dropped = table.row_count() - rows.len();
        if dropped > 0 {
            warn!(
                column = %time_column.name,
                dropped,
                "Rows dropped: time value did not parse"
            );
        }

        if rows.is_empty() {
            return Err(AlignmentError::EmptyAfterFiltering {
                time_column: time_column.name.clone(),
                rows_read: table.row_count(),
            });
        }

        // Stable: equal timestamps keep their input order
        rows.sort_by_key(|(t, _)| *t);

        if self.duplicates == DuplicatePolicy::KeepLast {
            let before = rows.len();
            rows = collapse_keep_last(rows);
            if rows.len() < before {
                info!(collapsed = before - rows.len(), "Duplicate timestamps collapsed to last reading");
            }
        }

        let timeline: Vec<NaiveDateTime> = rows.iter().map(|(t, _)| *t).collect();
        let columns: Vec<(String, Vec<Option<f64>>)> = sensor_columns
            .iter()
            .map(|col| {
                let values = rows.iter().map(|(_, i)| col.cells[*i].as_number()).collect();
                (col.name.clone(), values)
            })
            .collect();

        let dataset = AlignedDataset::new(timeline, columns)?;
        info!(
            time_column = %time_column.name,
            rows = dataset.row_count(),
            sensors = dataset.sensors().len(),
            "Dataset aligned"
        );
        Ok(dataset)
    }

    /// First column whose parse-success rate over non-empty cells exceeds
    /// the configured ratio.
    pub fn detect_time_column<'t>(&self, table: &'t RawTable) -> Result<&'t RawColumn, AlignmentError> {
        for column in table.columns() {
            let non_empty = column.cells.iter().filter(|c| !c.is_empty()).count();
            if non_empty == 0 {
                continue;
            }
            let parsed = column
                .cells
                .iter()
                .filter(|c| cell_timestamp(c).is_some())
                .count();
            let ratio = parsed as f64 / non_empty as f64;
            debug!(column = %column.name, ratio = format!("{ratio:.2}"), "Time column candidate");
            if ratio > self.min_parse_ratio {
                info!(column = %column.name, "Time column auto-detected");
                return Ok(column);
            }
        }
        Err(AlignmentError::NoTimeColumnFound {
            columns_checked: table.columns().len(),
        })
    }

    fn select_sensor_columns<'t>(
        table: &'t RawTable,
        time_name: &str,
        sensors: Option<&[String]>,
    ) -> Result<Vec<&'t RawColumn>, AlignmentError> {
        match sensors {
            Some(names) => names
                .iter()
                .map(|n| {
                    table
                        .column(n)
                        .ok_or_else(|| AlignmentError::SensorColumnMissing(n.clone()))
                })
                .collect(),
            None => Ok(table
                .columns()
                .iter()
                .filter(|c| c.name != time_name)
                .filter(|c| c.cells.iter().any(|cell| cell.as_number().is_some()))
                .collect()),
        }
    }
}

fn cell_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::Text(s) => parse_datetime(s),
        _ => None,
    }
}

/// Keep the last row of each run of equal timestamps (input is sorted).
fn collapse_keep_last(rows: Vec<(NaiveDateTime, usize)>) -> Vec<(NaiveDateTime, usize)> {
    let mut out: Vec<(NaiveDateTime, usize)> = Vec::with_capacity(rows.len());
    for row in rows {
        match out.last_mut() {
            Some(last) if last.0 == row.0 => *last = row,
            _ => out.push(row),
        }
    }
    out
}
