//! HTTP probe implementation.

use async_trait::async_trait;
use std::time::{Duration, Instant};

use super::{ProbeOutcome, Prober};

const MAX_REDIRECTS: usize = 10;

/// Probes endpoints with a single GET through a shared HTTP client.
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    /// Build a prober whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("upwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, timeout })
    }

    fn timed_out(&self) -> ProbeOutcome {
        ProbeOutcome::failure(
            Some(duration_ms(self.timeout)),
            format!("timed out after {:?}", self.timeout),
        )
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let request = match self.client.get(url).build() {
            Ok(r) => r,
            Err(e) => return ProbeOutcome::failure(None, e.to_string()),
        };

        let start = Instant::now();
        let sent = tokio::time::timeout(self.timeout, self.client.execute(request)).await;

        match sent {
            Err(_) => self.timed_out(),
            Ok(Ok(response)) => {
                ProbeOutcome::response(response.status().as_u16(), duration_ms(start.elapsed()))
            }
            Ok(Err(e)) if e.is_timeout() => self.timed_out(),
            Ok(Err(e)) if e.is_builder() => ProbeOutcome::failure(None, e.to_string()),
            Ok(Err(e)) => ProbeOutcome::failure(Some(duration_ms(start.elapsed())), e.to_string()),
        }
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}
