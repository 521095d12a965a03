//! Collector: find the dashboard's data request in captured traffic.
//!
//! The dashboard page embeds a report widget that fetches its table through a
//! batched analytics endpoint. We never call that endpoint ourselves; instead a
//! browser loads the page and we pick the right exchange out of what it
//! captured.
//!
//! Capture is behind the [`ExchangeSource`] trait so the matching and parsing
//! logic runs the same against a live browser ([`browser::ChromeCapture`]) and
//! against saved captures ([`ReplaySource`]).

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::domain::{CollectConfig, Observation};
use crate::error::AppError;

pub mod browser;
pub mod schema;

pub use schema::{ResponseError, parse_observations};

/// Path fragment of the embedded report's batch data endpoint.
pub const BATCH_ENDPOINT: &str = "https://datastudio.google.com/embed/batchedDataV2";

/// The table request bundles exactly this many sub-requests; other batch
/// calls made by the widget carry a different count.
pub const EXPECTED_SUB_REQUESTS: usize = 5;

/// One completed request/response pair seen by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkExchange {
    pub url: String,
    #[serde(default)]
    pub request_body: Option<String>,
    /// `None` when the request never got a response.
    #[serde(default)]
    pub response_body: Option<String>,
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("navigation to {url} timed out")]
    NavigationTimeout { url: String },
    #[error("browser error: {0}")]
    Browser(String),
    #[error("no matching data request observed within {waited:?}")]
    NoMatchingExchange { waited: Duration },
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error("capture file error: {0}")]
    Capture(String),
}

impl From<CollectError> for AppError {
    fn from(err: CollectError) -> Self {
        AppError::new(4, err.to_string())
    }
}

/// A stream of captured exchanges.
pub trait ExchangeSource {
    /// Block until the next completed exchange is available.
    ///
    /// Returns `Ok(None)` when nothing arrived within `timeout` or when the
    /// source has nothing more to give.
    fn next_exchange(&mut self, timeout: Duration) -> Result<Option<NetworkExchange>, CollectError>;
}

/// Exchanges captured earlier, handed out in order.
#[derive(Debug, Default)]
pub struct ReplaySource {
    pending: VecDeque<NetworkExchange>,
}

impl ReplaySource {
    pub fn new(exchanges: Vec<NetworkExchange>) -> Self {
        Self {
            pending: exchanges.into(),
        }
    }

    /// Load a JSON array of exchanges.
    pub fn from_file(path: &Path) -> Result<Self, CollectError> {
        let file = File::open(path)
            .map_err(|e| CollectError::Capture(format!("failed to open '{}': {e}", path.display())))?;
        let exchanges: Vec<NetworkExchange> = serde_json::from_reader(file)
            .map_err(|e| CollectError::Capture(format!("failed to parse '{}': {e}", path.display())))?;
        Ok(Self::new(exchanges))
    }
}

impl ExchangeSource for ReplaySource {
    fn next_exchange(&mut self, _timeout: Duration) -> Result<Option<NetworkExchange>, CollectError> {
        Ok(self.pending.pop_front())
    }
}

/// Does this exchange carry the case table?
///
/// Requires a response, the batch endpoint in the URL, and a JSON request body
/// whose `dataRequest` array has [`EXPECTED_SUB_REQUESTS`] entries.
pub fn is_data_exchange(exchange: &NetworkExchange) -> bool {
    if exchange.response_body.is_none() || !exchange.url.contains(BATCH_ENDPOINT) {
        return false;
    }
    let Some(body) = exchange.request_body.as_deref() else {
        return false;
    };
    let Ok(request) = serde_json::from_str::<BatchRequest>(body) else {
        return false;
    };
    request.data_request.len() == EXPECTED_SUB_REQUESTS
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest {
    #[serde(default)]
    data_request: Vec<serde_json::Value>,
}

/// Extracts observations from a capture.
#[derive(Debug, Clone)]
pub struct Collector {
    source_url: String,
    capture_timeout: Duration,
}

impl Collector {
    pub fn new(config: &CollectConfig) -> Self {
        Self {
            source_url: config.source_url.clone(),
            capture_timeout: config.capture_timeout,
        }
    }

    /// Wait for the first matching exchange and parse it.
    ///
    /// Scanning stops at the first match. The wait is bounded by the capture
    /// timeout measured from the call, not per exchange.
    pub fn collect(&self, source: &mut dyn ExchangeSource) -> Result<Vec<Observation>, CollectError> {
        let started = Instant::now();
        let deadline = started + self.capture_timeout;
        let mut seen = 0usize;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let Some(exchange) = source.next_exchange(remaining)? else {
                break;
            };
            seen += 1;
            if !is_data_exchange(&exchange) {
                continue;
            }

            debug!(url = %exchange.url, "found request that contains required data");
            let body = exchange.response_body.as_deref().unwrap_or_default();
            let rows = parse_observations(body)?;
            info!(rows = rows.len(), exchanges_scanned = seen, "extracted observations");
            return Ok(rows);
        }

        Err(CollectError::NoMatchingExchange {
            waited: started.elapsed(),
        })
    }

    /// Collect, logging any failure and returning no rows instead.
    ///
    /// Callers must treat an empty result as "nothing collected".
    pub fn scrape(&self, source: &mut dyn ExchangeSource) -> Vec<Observation> {
        debug!("data gathering started");
        match self.collect(source) {
            Ok(rows) => rows,
            Err(err) => {
                self.report_failure(&err);
                Vec::new()
            }
        }
    }

    /// Log a failure the way `scrape` does. Used for errors raised while the
    /// capture source itself is being set up.
    pub fn report_failure(&self, err: &CollectError) {
        match err {
            CollectError::NavigationTimeout { .. } => {
                error!("request timed out, check if {} is up", self.source_url);
            }
            other => error!(error = ?other, "collection failed: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::schema::fixtures::response_body;
    use super::*;

    fn batch_request(sub_requests: usize) -> String {
        let entries: Vec<serde_json::Value> = (0..sub_requests)
            .map(|i| serde_json::json!({ "requestContext": { "reportContext": { "componentId": i } } }))
            .collect();
        serde_json::json!({ "dataRequest": entries }).to_string()
    }

    fn exchange(url: &str, request: Option<String>, response: Option<String>) -> NetworkExchange {
        NetworkExchange {
            url: url.to_string(),
            request_body: request,
            response_body: response,
        }
    }

    fn data_body() -> String {
        response_body(
            &["20200510", "20200511", "20200512"],
            &[100.0, 120.0, 150.0],
            &[10.0, 12.0, 15.0],
            &[1.0, 1.0, 2.0],
        )
    }

    fn collector() -> Collector {
        Collector::new(&CollectConfig {
            capture_timeout: Duration::from_secs(5),
            ..CollectConfig::default()
        })
    }

    #[test]
    fn picks_the_five_request_batch_among_noise() {
        let url = format!("{BATCH_ENDPOINT}?appVersion=20200512");
        let mut source = ReplaySource::new(vec![
            exchange("https://koronavirus.gov.mk/stat", None, Some("<html>".into())),
            exchange(&url, Some(batch_request(2)), Some(")]}',\n{}".into())),
            exchange(&url, Some(batch_request(5)), None),
            exchange(&url, Some(batch_request(5)), Some(data_body())),
            exchange(&url, Some(batch_request(5)), Some("not reached".into())),
        ]);

        let rows = collector().collect(&mut source).unwrap();
        assert_eq!(
            rows,
            vec![
                Observation::new(20200510, 100, 10, 1),
                Observation::new(20200511, 120, 12, 1),
                Observation::new(20200512, 150, 15, 2),
            ]
        );
        // The exchange after the match is never read.
        assert_eq!(source.pending.len(), 1);
    }

    #[test]
    fn no_match_yields_empty_scrape() {
        let capture = || {
            ReplaySource::new(vec![exchange(
                "https://example.com/api",
                Some(batch_request(5)),
                Some(data_body()),
            )])
        };

        let c = collector();
        assert!(matches!(
            c.collect(&mut capture()),
            Err(CollectError::NoMatchingExchange { .. })
        ));
        let (rows, logged) = crate::logging::capture(|| c.scrape(&mut capture()));
        assert!(rows.is_empty());
        assert!(
            logged
                .lines()
                .any(|l| l.contains("ERROR") && l.contains("no matching data request observed")),
            "{logged}"
        );
    }

    #[test]
    fn navigation_timeout_names_the_source() {
        let c = collector();
        let err = CollectError::NavigationTimeout {
            url: c.source_url.clone(),
        };
        let ((), logged) = crate::logging::capture(|| c.report_failure(&err));
        assert!(
            logged
                .lines()
                .any(|l| l.contains("ERROR") && l.contains("check if https://koronavirus.gov.mk/stat is up")),
            "{logged}"
        );
    }

    #[test]
    fn malformed_matching_response_is_reported_not_panicked() {
        let mut source = ReplaySource::new(vec![exchange(
            BATCH_ENDPOINT,
            Some(batch_request(5)),
            Some(")]}',\n{\"default\":{\"dataResponse\":[]}}".into()),
        )]);

        assert!(matches!(
            collector().collect(&mut source),
            Err(CollectError::Response(ResponseError::UnexpectedShape(_)))
        ));
    }

    #[test]
    fn request_body_must_be_json() {
        let ex = exchange(BATCH_ENDPOINT, Some("dataRequest=5".into()), Some(data_body()));
        assert!(!is_data_exchange(&ex));
    }

    #[test]
    fn replay_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        let exchanges = vec![exchange(BATCH_ENDPOINT, Some(batch_request(5)), Some(data_body()))];
        std::fs::write(&path, serde_json::to_string(&exchanges).unwrap()).unwrap();

        let mut source = ReplaySource::from_file(&path).unwrap();
        assert_eq!(collector().scrape(&mut source).len(), 3);
    }
}
