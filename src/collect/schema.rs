//! Schema of the embedded report's batch data response.
//!
//! The response we care about looks like this (irrelevant fields omitted):
//!
//! ```text
//! )]}',
//! {"default": {"dataResponse": [
//!     {...},
//!     {"dataSubset": [{"dataset": {"tableDataset": {"column": [
//!         {"stringColumn": {"values": ["20200510", ...]}},
//!         {"doubleColumn": {"values": [100.0, ...]}},   // infected
//!         {"doubleColumn": {"values": [10.0, ...]}},    // cured
//!         {"doubleColumn": {"values": [1.0, ...]}}      // deaths
//!     ]}}}]}
//! ]}}
//! ```
//!
//! Walking it goes through named structs so an upstream layout change surfaces
//! as `ResponseError::UnexpectedShape` with the offending path.

use serde::Deserialize;
use thiserror::Error;

use crate::domain::Observation;

/// Length of the non-JSON guard prefix in front of every batch response.
pub const SENTINEL_LEN: usize = 6;

/// Position of the case table inside `default.dataResponse`.
const TABLE_RESPONSE_INDEX: usize = 1;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

fn shape(msg: impl Into<String>) -> ResponseError {
    ResponseError::UnexpectedShape(msg.into())
}

#[derive(Debug, Deserialize)]
struct BatchedResponse {
    default: BatchedDefault,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchedDefault {
    #[serde(default)]
    data_response: Vec<DataResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataResponse {
    #[serde(default)]
    data_subset: Vec<DataSubset>,
}

#[derive(Debug, Deserialize)]
struct DataSubset {
    dataset: Option<Dataset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Dataset {
    table_dataset: Option<TableDataset>,
}

#[derive(Debug, Deserialize)]
struct TableDataset {
    #[serde(default)]
    column: Vec<Column>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Column {
    string_column: Option<Values<Option<String>>>,
    double_column: Option<Values<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct Values<T> {
    #[serde(default)]
    values: Vec<T>,
}

/// Drop the guard prefix that makes the body invalid JSON on purpose.
pub fn strip_sentinel(body: &str) -> Result<&str, ResponseError> {
    body.get(SENTINEL_LEN..).ok_or_else(|| {
        shape(format!(
            "body ({} bytes) does not start with a {SENTINEL_LEN}-byte guard prefix",
            body.len()
        ))
    })
}

/// Parse a raw (prefixed) batch response body into observation rows.
pub fn parse_observations(body: &str) -> Result<Vec<Observation>, ResponseError> {
    let json = strip_sentinel(body)?;
    let response: BatchedResponse = serde_json::from_str(json)?;
    extract(response)
}

fn extract(response: BatchedResponse) -> Result<Vec<Observation>, ResponseError> {
    let entries = response.default.data_response.len();
    let table = response
        .default
        .data_response
        .into_iter()
        .nth(TABLE_RESPONSE_INDEX)
        .ok_or_else(|| {
            shape(format!(
                "default.dataResponse has {entries} entries, expected at least {}",
                TABLE_RESPONSE_INDEX + 1
            ))
        })?;

    let columns = table
        .data_subset
        .into_iter()
        .next()
        .ok_or_else(|| shape("dataResponse[1].dataSubset is empty"))?
        .dataset
        .ok_or_else(|| shape("dataSubset[0].dataset is missing"))?
        .table_dataset
        .ok_or_else(|| shape("dataset.tableDataset is missing"))?
        .column;

    if columns.len() < 4 {
        return Err(shape(format!(
            "tableDataset.column has {} columns, expected 4 (date, infected, cured, deaths)",
            columns.len()
        )));
    }

    let mut columns = columns.into_iter();
    let dates = date_column(columns.next())?;
    let infected = count_column(columns.next(), "infected")?;
    let cured = count_column(columns.next(), "cured")?;
    let deaths = count_column(columns.next(), "deaths")?;

    let n = dates.len();
    for (name, len) in [("infected", infected.len()), ("cured", cured.len()), ("deaths", deaths.len())] {
        if len != n {
            return Err(shape(format!(
                "column `{name}` has {len} values but the date column has {n}"
            )));
        }
    }

    Ok(dates
        .into_iter()
        .zip(infected)
        .zip(cured)
        .zip(deaths)
        .map(|(((date, infected), cured), deaths)| Observation::new(date, infected, cured, deaths))
        .collect())
}

fn date_column(column: Option<Column>) -> Result<Vec<u32>, ResponseError> {
    let values = column
        .and_then(|c| c.string_column)
        .ok_or_else(|| shape("column[0] is not a stringColumn of dates"))?
        .values;

    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            let raw = v.ok_or_else(|| shape(format!("date #{i} is null")))?;
            raw.trim()
                .parse::<u32>()
                .map_err(|_| shape(format!("date #{i} ('{raw}') is not a YYYYMMDD integer")))
        })
        .collect()
}

fn count_column(column: Option<Column>, name: &str) -> Result<Vec<i64>, ResponseError> {
    let values = column
        .and_then(|c| c.double_column)
        .ok_or_else(|| shape(format!("column `{name}` is not a doubleColumn")))?
        .values;

    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| match v {
            // Counts arrive as doubles; truncate toward zero.
            Some(x) if x.is_finite() => Ok(x.trunc() as i64),
            _ => Err(shape(format!("`{name}` value #{i} is missing or not finite"))),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Six-byte guard prefix as served upstream.
    pub const PREFIX: &str = ")]}',\n";

    /// A realistic batch response body, guard prefix included.
    pub fn response_body(dates: &[&str], infected: &[f64], cured: &[f64], deaths: &[f64]) -> String {
        let json = serde_json::json!({
            "default": {
                "dataResponse": [
                    { "dataSubset": [ { "dataset": { "tableDataset": { "column": [
                        { "doubleColumn": { "values": [42.0] } }
                    ] } } } ] },
                    { "dataSubset": [ { "dataset": { "tableDataset": { "column": [
                        { "stringColumn": { "values": dates } },
                        { "doubleColumn": { "values": infected } },
                        { "doubleColumn": { "values": cured } },
                        { "doubleColumn": { "values": deaths } }
                    ] } } } ] },
                    { "status": "ok" }
                ]
            }
        });
        format!("{PREFIX}{json}")
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{PREFIX, response_body};
    use super::*;

    #[test]
    fn parses_rows_in_delivered_order() {
        let body = response_body(
            &["20200510", "20200511", "20200512"],
            &[100.0, 120.0, 150.0],
            &[10.0, 12.0, 15.0],
            &[1.0, 1.0, 2.9],
        );

        let rows = parse_observations(&body).unwrap();
        assert_eq!(
            rows,
            vec![
                Observation::new(20200510, 100, 10, 1),
                Observation::new(20200511, 120, 12, 1),
                Observation::new(20200512, 150, 15, 2),
            ]
        );
    }

    #[test]
    fn short_body_is_a_shape_error() {
        let err = parse_observations(")]}'").unwrap_err();
        assert!(matches!(err, ResponseError::UnexpectedShape(_)));
    }

    #[test]
    fn missing_table_entry_names_the_path() {
        let body = format!("{PREFIX}{}", r#"{"default":{"dataResponse":[{}]}}"#);
        match parse_observations(&body).unwrap_err() {
            ResponseError::UnexpectedShape(msg) => assert!(msg.contains("dataResponse"), "{msg}"),
            other => panic!("expected shape error, got {other:?}"),
        }
    }

    #[test]
    fn unequal_columns_are_rejected() {
        let body = response_body(&["20200510", "20200511"], &[1.0], &[0.0, 0.0], &[0.0, 0.0]);
        assert!(matches!(
            parse_observations(&body),
            Err(ResponseError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn garbage_after_prefix_is_a_json_error() {
        assert!(matches!(
            parse_observations(&format!("{PREFIX}not json")),
            Err(ResponseError::Json(_))
        ));
    }
}
