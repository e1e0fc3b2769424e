use crate::error::{ConfigError, RequestError, Result};
use crate::executor::Outcome;
use bytes::Bytes;
use reqwest::Method;
use std::collections::BTreeMap;
use std::time::Duration;

/// Seed for [`Stats::min_request_time`], so the first success always lowers it.
pub const MIN_REQUEST_TIME_SENTINEL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub url: String,
    /// Number of workers the runner starts; a worker never reads it.
    pub concurrency: usize,
    pub duration: Duration,
    /// Response-header timeout per request. Zero disables it.
    pub timeout: Duration,
    /// Raw `name:value;name:value` list, see [`parse_headers`].
    pub headers: String,
    pub method: Method,
    pub disable_keep_alive: bool,
    pub disable_compression: bool,
    pub follow_redirects: bool,
    pub body: Option<Bytes>,
}

impl WorkerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Checks what must hold before any worker is built.
    ///
    /// Only absoluteness of the URL is checked here; a scheme the client
    /// cannot speak fails each request instead of the run.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.url).map_err(|source| ConfigError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            concurrency: 10,
            duration: Duration::from_secs(10),
            timeout: Duration::from_millis(1000),
            headers: String::new(),
            method: Method::GET,
            disable_keep_alive: false,
            disable_compression: false,
            follow_redirects: true,
            body: None,
        }
    }
}

/// Splits `name:value` entries on `;`, each on its first `:`.
///
/// Entries without a `:` or with an empty name are dropped.
pub fn parse_headers(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|entry| entry.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Counters accumulated by one worker over its whole run.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    /// Responses that produced a size: 200, 405 and sized redirects
    pub num_requests: u64,
    pub num_errs: u64,
    pub num_2x: u64,
    pub num_5x: u64,
    /// Responses outside every other bucket, e.g. 404
    pub num_other: u64,
    /// Bytes received, body plus estimated headers
    pub resp_size: u64,
    /// Sum of successful request latencies
    pub duration: Duration,
    pub min_request_time: Duration,
    pub max_request_time: Duration,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            num_requests: 0,
            num_errs: 0,
            num_2x: 0,
            num_5x: 0,
            num_other: 0,
            resp_size: 0,
            duration: Duration::ZERO,
            min_request_time: MIN_REQUEST_TIME_SENTINEL,
            max_request_time: Duration::ZERO,
        }
    }
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the result of one request attempt into the counters.
    pub fn record(&mut self, result: &std::result::Result<Outcome, RequestError>) {
        match result {
            Ok(Outcome::Success { size, elapsed }) if *size > 0 => {
                self.record_sized(*size, *elapsed);
                self.num_2x += 1;
            }
            Ok(Outcome::Redirect { size, elapsed }) if *size > 0 => {
                self.record_sized(*size, *elapsed);
            }
            Ok(Outcome::ServerError { .. }) => self.num_5x += 1,
            Ok(Outcome::Unclassified { .. }) => self.num_other += 1,
            Ok(Outcome::Success { .. }) | Ok(Outcome::Redirect { .. }) | Err(_) => {
                self.num_errs += 1
            }
        }
    }

    fn record_sized(&mut self, size: u64, elapsed: Duration) {
        self.resp_size += size;
        self.duration += elapsed;
        self.max_request_time = self.max_request_time.max(elapsed);
        self.min_request_time = self.min_request_time.min(elapsed);
        self.num_requests += 1;
    }

    /// Attempts that reached a counter.
    pub fn total_attempts(&self) -> u64 {
        self.num_requests + self.num_errs + self.num_5x + self.num_other
    }

    /// Mean latency of successful requests.
    pub fn avg_request_time(&self) -> Option<Duration> {
        if self.num_requests == 0 {
            return None;
        }
        let nanos = self.duration.as_nanos() / u128::from(self.num_requests);
        Some(Duration::from_nanos(nanos as u64))
    }

    /// Merge counters from another worker
    pub fn merge(&mut self, other: &Stats) {
        self.num_requests += other.num_requests;
        self.num_errs += other.num_errs;
        self.num_2x += other.num_2x;
        self.num_5x += other.num_5x;
        self.num_other += other.num_other;
        self.resp_size += other.resp_size;
        self.duration += other.duration;
        self.min_request_time = self.min_request_time.min(other.min_request_time);
        self.max_request_time = self.max_request_time.max(other.max_request_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(size: u64, ms: u64) -> std::result::Result<Outcome, RequestError> {
        Ok(Outcome::Success {
            size,
            elapsed: Duration::from_millis(ms),
        })
    }

    #[test]
    fn test_parse_headers_drops_malformed() {
        let headers = parse_headers("A:1;B:2;garbage;C:3");
        let expected: BTreeMap<String, String> = [("A", "1"), ("B", "2"), ("C", "3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(headers, expected);
    }

    #[test]
    fn test_parse_headers_splits_on_first_colon() {
        let headers = parse_headers("Referer: http://example.com:8080/x ; X-Empty:");
        assert_eq!(headers["Referer"], "http://example.com:8080/x");
        assert_eq!(headers["X-Empty"], "");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_parse_headers_empty_input() {
        assert!(parse_headers("").is_empty());
        assert!(parse_headers(";;:nameless").is_empty());
    }

    #[test]
    fn test_parse_headers_is_idempotent() {
        let raw = "A:1;B:2;garbage;C:3";
        assert_eq!(parse_headers(raw), parse_headers(raw));
    }

    #[test]
    fn test_stats_defaults() {
        let stats = Stats::new();
        assert_eq!(stats.num_requests, 0);
        assert_eq!(stats.min_request_time, MIN_REQUEST_TIME_SENTINEL);
        assert_eq!(stats.max_request_time, Duration::ZERO);
        assert!(stats.avg_request_time().is_none());
    }

    #[test]
    fn test_stats_record_success_bounds() {
        let mut stats = Stats::new();
        for ms in [30, 10, 20] {
            stats.record(&success(100, ms));
        }
        assert_eq!(stats.num_requests, 3);
        assert_eq!(stats.num_2x, 3);
        assert_eq!(stats.resp_size, 300);
        assert_eq!(stats.duration, Duration::from_millis(60));
        assert_eq!(stats.min_request_time, Duration::from_millis(10));
        assert_eq!(stats.max_request_time, Duration::from_millis(30));
        assert_eq!(stats.avg_request_time(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_stats_record_redirect_not_2x() {
        let mut stats = Stats::new();
        stats.record(&Ok(Outcome::Redirect {
            size: 40,
            elapsed: Duration::from_millis(5),
        }));
        assert_eq!(stats.num_requests, 1);
        assert_eq!(stats.num_2x, 0);
        assert_eq!(stats.resp_size, 40);
    }

    #[test]
    fn test_stats_record_failures() {
        let mut stats = Stats::new();
        stats.record(&Ok(Outcome::ServerError { status: 503 }));
        stats.record(&Ok(Outcome::Unclassified { status: 404 }));
        stats.record(&Err(RequestError::EmptyResponse("none".into())));
        stats.record(&success(0, 1));

        assert_eq!(stats.num_5x, 1);
        assert_eq!(stats.num_other, 1);
        assert_eq!(stats.num_errs, 2);
        assert_eq!(stats.num_requests, 0);
        assert_eq!(stats.resp_size, 0);
        assert_eq!(stats.duration, Duration::ZERO);
        assert_eq!(stats.total_attempts(), 4);
    }

    #[test]
    fn test_stats_merge() {
        let mut a = Stats::new();
        a.record(&success(10, 5));
        a.record(&Err(RequestError::EmptyResponse("none".into())));

        let mut b = Stats::new();
        b.record(&success(20, 50));
        b.record(&Ok(Outcome::ServerError { status: 500 }));

        let idle = Stats::new();

        a.merge(&b);
        a.merge(&idle);

        assert_eq!(a.num_requests, 2);
        assert_eq!(a.num_errs, 1);
        assert_eq!(a.num_5x, 1);
        assert_eq!(a.resp_size, 30);
        assert_eq!(a.min_request_time, Duration::from_millis(5));
        assert_eq!(a.max_request_time, Duration::from_millis(50));
        assert!(a.min_request_time <= a.max_request_time);
    }

    #[test]
    fn test_config_validate() {
        assert!(WorkerConfig::new("http://127.0.0.1:8080/").validate().is_ok());
        assert!(WorkerConfig::new("ftp://127.0.0.1/").validate().is_ok());
        assert!(matches!(
            WorkerConfig::new("/relative/path").validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));

        let mut config = WorkerConfig::new("http://127.0.0.1/");
        config.concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroConcurrency)));
    }
}
