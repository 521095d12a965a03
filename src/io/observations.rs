//! Observation CSV files.
//!
//! Format: comma-separated, no header row, four integer columns in the order
//! of [`COLUMN_NAMES`] (`date,infected,cured,deaths`). The collector writes it
//! and the forecaster reads it; nothing else ties the two together.
//!
//! Loading is strict: a single malformed row fails the whole file.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::{COLUMN_NAMES, Observation};
use crate::error::AppError;

/// `<dir>/data_<last date>.csv`, or `None` if there is nothing to write.
pub fn default_output_path(dir: &Path, rows: &[Observation]) -> Option<PathBuf> {
    let last = rows.last()?;
    Some(dir.join(format!("data_{}.csv", last.date)))
}

/// Write observations as headerless CSV, creating the parent directory.
pub fn write_observations(path: &Path, rows: &[Observation]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
    }

    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    for row in rows {
        writer
            .write_record(&[
                row.date.to_string(),
                row.infected.to_string(),
                row.cured.to_string(),
                row.deaths.to_string(),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))?;
    Ok(())
}

/// Read a headerless observation CSV.
pub fn read_observations(path: &Path) -> Result<Vec<Observation>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 1;
        let record = result.map_err(|e| AppError::new(2, format!("Line {line}: CSV parse error: {e}")))?;
        let row = parse_record(&record).map_err(|msg| AppError::new(2, format!("Line {line}: {msg}")))?;
        rows.push(row);
    }

    Ok(rows)
}

fn parse_record(record: &StringRecord) -> Result<Observation, String> {
    if record.len() != COLUMN_NAMES.len() {
        return Err(format!(
            "expected {} columns ({}), found {}",
            COLUMN_NAMES.len(),
            COLUMN_NAMES.join(","),
            record.len()
        ));
    }

    let date = field(record, 0)?
        .parse::<u32>()
        .map_err(|_| format!("invalid `{}` value '{}'", COLUMN_NAMES[0], &record[0]))?;

    Ok(Observation {
        date,
        infected: parse_count(record, 1)?,
        cured: parse_count(record, 2)?,
        deaths: parse_count(record, 3)?,
    })
}

fn field(record: &StringRecord, idx: usize) -> Result<&str, String> {
    record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing `{}` value", COLUMN_NAMES[idx]))
}

fn parse_count(record: &StringRecord, idx: usize) -> Result<i64, String> {
    let raw = field(record, idx)?;
    raw.parse::<i64>()
        .map_err(|_| format!("invalid `{}` value '{raw}'", COLUMN_NAMES[idx]))
}
