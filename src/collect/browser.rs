//! Live capture from a Chromium instance over the DevTools protocol.
//!
//! `chromiumoxide` is async; the rest of the crate is not. A current-thread
//! tokio runtime owned by [`ChromeCapture`] drives the protocol connection, and
//! only while the caller is blocked inside one of our methods.
//!
//! Network events are paired by request id: `requestWillBeSent` gives us the
//! URL and whether there is a post body, `loadingFinished` tells us both
//! bodies can be fetched, `loadingFailed` closes the exchange without a
//! response.
//!
//! The report widget is a cross-site iframe. With site isolation on, its
//! traffic lives on a separate out-of-process target that the page's Network
//! domain never reports, so Chromium is started with isolation disabled
//! ([`ISOLATION_ARGS`]) to keep the iframe in the page's renderer.

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, GetRequestPostDataParams,
    GetResponseBodyParams, RequestId,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::listeners::EventStream;
use futures::StreamExt;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CollectError, ExchangeSource, NetworkExchange};
use crate::domain::CollectConfig;

/// A browser tab that has navigated to the dashboard and records its traffic.
///
/// The browser process is shut down by [`ChromeCapture::close`] or, failing
/// that, when the value is dropped.
pub struct ChromeCapture {
    runtime: Runtime,
    session: Option<Session>,
    page: Page,
    requests: EventStream<EventRequestWillBeSent>,
    finished: EventStream<EventLoadingFinished>,
    failed: EventStream<EventLoadingFailed>,
    url_filter: String,
    in_flight: HashMap<RequestId, InFlight>,
}

struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Chromium flags that keep cross-site iframes in the top page's process.
pub const ISOLATION_ARGS: [&str; 2] = [
    "--disable-site-isolation-trials",
    "--disable-features=IsolateOrigins,site-per-process",
];

#[derive(Debug, PartialEq, Eq)]
struct InFlight {
    url: String,
    has_post_data: bool,
}

impl InFlight {
    fn new(url: &str, has_post_data: Option<bool>) -> Self {
        Self {
            url: url.to_string(),
            has_post_data: has_post_data.unwrap_or(false),
        }
    }

    /// The request failed before a response arrived.
    fn unanswered(self) -> NetworkExchange {
        NetworkExchange {
            url: self.url,
            request_body: None,
            response_body: None,
        }
    }
}

struct Listeners {
    page: Page,
    requests: EventStream<EventRequestWillBeSent>,
    finished: EventStream<EventLoadingFinished>,
    failed: EventStream<EventLoadingFailed>,
}

impl ChromeCapture {
    /// Launch Chromium, start recording, and navigate to `config.source_url`.
    ///
    /// Only requests whose URL contains `url_filter` are tracked.
    pub fn launch(config: &CollectConfig, url_filter: &str) -> Result<Self, CollectError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CollectError::Browser(format!("failed to start async runtime: {e}")))?;

        let mut builder = BrowserConfig::builder().args(ISOLATION_ARGS);
        if config.debug_mode {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(CollectError::Browser)?;

        debug!(headless = !config.debug_mode, "opening chromium");
        let (browser, mut handler) = runtime
            .block_on(Browser::launch(browser_config))
            .map_err(|e| cdp_error(e, &config.source_url))?;

        let handler = runtime.spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        let session = Session { browser, handler };

        let listeners = match runtime.block_on(attach(&session.browser, &config.source_url)) {
            Ok(listeners) => listeners,
            Err(err) => {
                runtime.block_on(shutdown(session));
                return Err(err);
            }
        };

        Ok(Self {
            runtime,
            session: Some(session),
            page: listeners.page,
            requests: listeners.requests,
            finished: listeners.finished,
            failed: listeners.failed,
            url_filter: url_filter.to_string(),
            in_flight: HashMap::new(),
        })
    }

    /// Shut the browser down now.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("closing chromium");
            self.runtime.block_on(shutdown(session));
        }
    }
}

impl Drop for ChromeCapture {
    fn drop(&mut self) {
        self.release();
    }
}

impl ExchangeSource for ChromeCapture {
    fn next_exchange(&mut self, timeout: Duration) -> Result<Option<NetworkExchange>, CollectError> {
        let Self {
            runtime,
            page,
            requests,
            finished,
            failed,
            url_filter,
            in_flight,
            ..
        } = self;
        let page = &*page;
        let url_filter = url_filter.as_str();

        let wait = async move {
            loop {
                tokio::select! {
                    Some(event) = requests.next() => {
                        if event.request.url.contains(url_filter) {
                            in_flight.insert(
                                event.request_id.clone(),
                                InFlight::new(&event.request.url, event.request.has_post_data),
                            );
                        }
                    }
                    Some(event) = finished.next() => {
                        if let Some(request) = in_flight.remove(&event.request_id) {
                            return Some(complete(page, &event.request_id, request).await);
                        }
                    }
                    Some(event) = failed.next() => {
                        if let Some(request) = in_flight.remove(&event.request_id) {
                            debug!(url = %request.url, reason = %event.error_text, "request failed");
                            return Some(request.unanswered());
                        }
                    }
                    else => return None,
                }
            }
        };

        Ok(runtime.block_on(async { tokio::time::timeout(timeout, wait).await.unwrap_or(None) }))
    }
}

async fn attach(browser: &Browser, url: &str) -> Result<Listeners, CollectError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| cdp_error(e, url))?;
    page.execute(EnableParams::default())
        .await
        .map_err(|e| cdp_error(e, url))?;

    let requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(|e| cdp_error(e, url))?;
    let finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(|e| cdp_error(e, url))?;
    let failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(|e| cdp_error(e, url))?;

    debug!(%url, "requesting page");
    page.goto(url).await.map_err(|e| cdp_error(e, url))?;

    Ok(Listeners {
        page,
        requests,
        finished,
        failed,
    })
}

async fn complete(page: &Page, request_id: &RequestId, request: InFlight) -> NetworkExchange {
    let request_body = if request.has_post_data {
        match page.execute(GetRequestPostDataParams::new(request_id.clone())).await {
            Ok(resp) => Some(resp.result.post_data.clone()),
            Err(e) => {
                warn!(url = %request.url, error = %e, "failed to read request body");
                None
            }
        }
    } else {
        None
    };

    let response_body = match page.execute(GetResponseBodyParams::new(request_id.clone())).await {
        Ok(resp) => decode_body(&resp.result.body, resp.result.base64_encoded),
        Err(e) => {
            warn!(url = %request.url, error = %e, "failed to read response body");
            None
        }
    };

    NetworkExchange {
        url: request.url,
        request_body,
        response_body,
    }
}

async fn shutdown(mut session: Session) {
    if let Err(e) = session.browser.close().await {
        warn!(error = %e, "failed to close chromium cleanly");
    }
    if let Err(e) = session.browser.wait().await {
        warn!(error = %e, "failed to wait for chromium to exit");
    }
    session.handler.abort();
}

fn cdp_error(err: CdpError, url: &str) -> CollectError {
    match err {
        CdpError::Timeout => CollectError::NavigationTimeout { url: url.to_string() },
        other => CollectError::Browser(other.to_string()),
    }
}

/// Response bodies come back either as text or base64 (binary / compressed
/// payloads); we only care about UTF-8 text.
fn decode_body(body: &str, base64_encoded: bool) -> Option<String> {
    if !base64_encoded {
        return Some(body.to_string());
    }
    let bytes = STANDARD.decode(body).ok()?;
    String::from_utf8(bytes).ok()
}
