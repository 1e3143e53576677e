use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS, USER_AGENT};
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config::{self, FetchConfig};
use crate::delay_manager::{self, RateLimiter};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("could not build HTTP client: {0}")]
    Build(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Only populated for 2xx responses.
    pub body: String,
}

/// One GET against a long-lived connection. The retry policy lives in [`Fetcher`].
pub trait Transport {
    fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport with a browser-like identity and a cookie jar.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(config::USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(config::ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(config::ACCEPT_LANGUAGE));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        let body = if status.is_success() { resp.text()? } else { String::new() };
        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// What a fetch produced. Callers never see transport errors, only these three outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Content(String),
    NotFound,
    Exhausted,
}

impl FetchOutcome {
    pub fn content(self) -> Option<String> {
        match self {
            FetchOutcome::Content(body) => Some(body),
            FetchOutcome::NotFound | FetchOutcome::Exhausted => None,
        }
    }

    pub fn is_content(&self) -> bool {
        matches!(self, FetchOutcome::Content(_))
    }
}

/// Polite, retrying document fetcher.
///
/// * one request in flight at a time, spaced by `request_delay`
/// * transient failures retried up to `max_retries` attempts
/// * 404 answered immediately with [`FetchOutcome::NotFound`]
/// * 429 sleeps an extended backoff and still counts as an attempt
///
/// The transport is released exactly once, by [`Fetcher::close`] or on drop.
pub struct Fetcher<T: Transport = HttpTransport> {
    transport: Option<T>,
    config: FetchConfig,
    limiter: RateLimiter,
}

impl Fetcher<HttpTransport> {
    pub fn http(config: FetchConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Fetcher::with_transport(transport, config))
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn with_transport(transport: T, config: FetchConfig) -> Self {
        let limiter = RateLimiter::new(config.request_delay);
        Fetcher {
            transport: Some(transport),
            config,
            limiter,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn fetch(&mut self, url: &str) -> FetchOutcome {
        let max_attempts = self.config.max_retries.max(1);

        for attempt in 1..=max_attempts {
            let Some(transport) = self.transport.as_ref() else {
                error!("Fetcher already closed, cannot fetch {}", url);
                return FetchOutcome::Exhausted;
            };

            self.limiter.wait();
            info!("Fetching: {} (attempt {}/{})", url, attempt, max_attempts);
            let result = transport.get(url);
            self.limiter.mark();

            match result {
                Ok(resp) if (200..300).contains(&resp.status) => {
                    debug!("Successfully fetched {}", url);
                    return FetchOutcome::Content(resp.body);
                }
                Ok(resp) if resp.status == 404 => {
                    warn!("HTTP error 404 fetching {}", url);
                    return FetchOutcome::NotFound;
                }
                Ok(resp) if resp.status == 429 => {
                    warn!("HTTP error 429 fetching {}", url);
                    if attempt < max_attempts {
                        delay_manager::rate_limit_backoff(self.config.rate_limit_backoff());
                    }
                }
                Ok(resp) => warn!("HTTP error {} fetching {}", resp.status, url),
                Err(TransportError::Timeout) => warn!("Timeout fetching {}", url),
                Err(e) => warn!("Request error fetching {}: {}", url, e),
            }

            if attempt < max_attempts {
                delay_manager::retry_pause(self.config.retry_delay);
            }
        }

        error!("Failed to fetch {} after {} attempts", url, max_attempts);
        FetchOutcome::Exhausted
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.transport.take().is_some() {
            debug!("Fetcher connection released");
        }
    }
}

impl<T: Transport> Drop for Fetcher<T> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    struct ScriptedTransport {
        script: RefCell<VecDeque<Result<TransportResponse, TransportError>>>,
        calls: Rc<Cell<usize>>,
        drops: Rc<Cell<usize>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<TransportResponse, TransportError>>) -> Self {
            ScriptedTransport {
                script: RefCell::new(script.into()),
                calls: Rc::new(Cell::new(0)),
                drops: Rc::new(Cell::new(0)),
            }
        }

        fn always(status: u16) -> Self {
            Self::new((0..20).map(|_| Ok(response(status, ""))).collect())
        }
    }

    impl Transport for ScriptedTransport {
        fn get(&self, _url: &str) -> Result<TransportResponse, TransportError> {
            self.calls.set(self.calls.get() + 1);
            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(response(200, "default")))
        }
    }

    impl Drop for ScriptedTransport {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn response(status: u16, body: &str) -> TransportResponse {
        TransportResponse { status, body: body.to_string() }
    }

    fn quick_config(max_retries: u32) -> FetchConfig {
        FetchConfig {
            request_delay: Duration::ZERO,
            timeout: Duration::from_secs(1),
            max_retries,
            retry_delay: Duration::ZERO,
            rate_limit_backoff_factor: 3,
        }
    }

    #[test]
    fn test_returns_content_on_success() {
        let mut fetcher = Fetcher::with_transport(
            ScriptedTransport::new(vec![Ok(response(200, "<html></html>"))]),
            quick_config(3),
        );
        assert_eq!(fetcher.fetch("http://a"), FetchOutcome::Content("<html></html>".into()));
    }

    #[test]
    fn test_retry_ceiling_on_transient_failures() {
        let transport = ScriptedTransport::always(503);
        let calls = transport.calls.clone();
        let mut fetcher = Fetcher::with_transport(transport, quick_config(3));

        assert_eq!(fetcher.fetch("http://a"), FetchOutcome::Exhausted);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_timeouts_and_connect_errors_are_retried() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Connect("refused".into())),
            Ok(response(200, "ok")),
        ]);
        let calls = transport.calls.clone();
        let mut fetcher = Fetcher::with_transport(transport, quick_config(3));

        assert_eq!(fetcher.fetch("http://a").content().as_deref(), Some("ok"));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_not_found_short_circuits() {
        let transport = ScriptedTransport::always(404);
        let calls = transport.calls.clone();
        let mut fetcher = Fetcher::with_transport(transport, quick_config(5));

        assert_eq!(fetcher.fetch("http://a"), FetchOutcome::NotFound);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_rate_limited_counts_toward_ceiling() {
        let transport = ScriptedTransport::always(429);
        let calls = transport.calls.clone();
        let mut fetcher = Fetcher::with_transport(transport, quick_config(2));

        assert_eq!(fetcher.fetch("http://a"), FetchOutcome::Exhausted);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_rate_limited_waits_extended_backoff() {
        let mut config = quick_config(2);
        config.retry_delay = Duration::from_millis(10);
        config.rate_limit_backoff_factor = 5;
        let transport = ScriptedTransport::new(vec![Ok(response(429, "")), Ok(response(200, "ok"))]);
        let mut fetcher = Fetcher::with_transport(transport, config);

        let start = Instant::now();
        assert!(fetcher.fetch("http://a").is_content());
        // backoff (50ms) plus the regular retry pause (10ms)
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_sequential_fetches_respect_min_interval() {
        let mut config = quick_config(1);
        config.request_delay = Duration::from_millis(50);
        let mut fetcher = Fetcher::with_transport(ScriptedTransport::always(200), config);

        let start = Instant::now();
        for _ in 0..4 {
            assert!(fetcher.fetch("http://a").is_content());
        }
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn test_transport_released_exactly_once() {
        let transport = ScriptedTransport::always(200);
        let drops = transport.drops.clone();
        let fetcher = Fetcher::with_transport(transport, quick_config(1));
        fetcher.close();
        assert_eq!(drops.get(), 1);

        let transport = ScriptedTransport::always(200);
        let drops = transport.drops.clone();
        {
            let mut fetcher = Fetcher::with_transport(transport, quick_config(1));
            let _ = fetcher.fetch("http://a");
        }
        assert_eq!(drops.get(), 1);
    }
}
