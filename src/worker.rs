use crate::error::Result;
use crate::executor::{do_request, wire_headers};
use crate::interrupt::InterruptFlag;
use crate::model::{parse_headers, Stats, WorkerConfig};
use reqwest::header::{HeaderMap, HeaderValue, CONNECTION};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One load-generation loop with its own client and counters.
pub struct Worker {
    rank: usize,
    config: WorkerConfig,
    client: Client,
    headers: HeaderMap,
    tx: mpsc::Sender<Stats>,
    interrupt: InterruptFlag,
}

/// Hops followed before the last redirect response is handed back.
pub const MAX_REDIRECTS: usize = 10;

/// Follows redirects, but stops on the last hop instead of failing, so an
/// endless redirect is still classified from the final 3xx.
fn follow_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

/// Builds the per-worker client from the transport knobs in `config`.
pub fn build_client(config: &WorkerConfig) -> Result<Client> {
    let compress = !config.disable_compression;
    let mut builder = Client::builder()
        .gzip(compress)
        .brotli(compress)
        .deflate(compress)
        .redirect(if config.follow_redirects {
            follow_policy()
        } else {
            Policy::none()
        });

    if config.disable_keep_alive {
        let mut defaults = HeaderMap::new();
        defaults.insert(CONNECTION, HeaderValue::from_static("close"));
        builder = builder.pool_max_idle_per_host(0).default_headers(defaults);
    }

    let secure = url::Url::parse(&config.url).is_ok_and(|url| url.scheme() == "https");
    if secure {
        builder = builder.danger_accept_invalid_certs(true);
    }

    if !config.duration.is_zero() {
        builder = builder.timeout(config.duration);
    }

    Ok(builder.build()?)
}

impl Worker {
    pub fn new(
        rank: usize,
        config: WorkerConfig,
        tx: mpsc::Sender<Stats>,
        interrupt: InterruptFlag,
    ) -> Result<Self> {
        let client = build_client(&config)?;
        let headers = wire_headers(&parse_headers(&config.headers));
        Ok(Self {
            rank,
            config,
            client,
            headers,
            tx,
            interrupt,
        })
    }

    /// Asks every worker sharing this flag to finish after its current request.
    pub fn stop(&self) {
        self.interrupt.stop();
    }

    fn header_timeout(&self) -> Option<Duration> {
        (!self.config.timeout.is_zero()).then_some(self.config.timeout)
    }

    /// Runs until the duration elapses or the flag is set, then sends the
    /// counters exactly once.
    pub async fn run(self) {
        let mut stats = Stats::new();
        let begin = Instant::now();
        let header_timeout = self.header_timeout();
        debug!(worker_id = self.rank, url = %self.config.url, "worker started");

        while begin.elapsed() <= self.config.duration && !self.interrupt.is_stopped() {
            let result = do_request(
                &self.client,
                &self.headers,
                &self.config.method,
                &self.config.url,
                self.config.body.as_ref(),
                header_timeout,
            )
            .await;

            if let Err(e) = &result {
                warn!(worker_id = self.rank, error = %e, "request failed");
            }
            stats.record(&result);
            if result.is_err() {
                // failures can resolve without ever suspending
                tokio::task::yield_now().await;
            }
        }

        debug!(
            worker_id = self.rank,
            requests = stats.num_requests,
            errors = stats.num_errs,
            elapsed_ms = begin.elapsed().as_millis() as u64,
            "worker finished"
        );

        if self.tx.send(stats).await.is_err() {
            warn!(worker_id = self.rank, "stats channel closed before worker reported");
        }
    }
}
