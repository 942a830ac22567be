//! Single-candidate availability probe.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::StatusCode;

/// Result of probing one candidate mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Responded with exactly `200 OK`.
    Available,
    /// Responded, but with some other status.
    Status(u16),
    /// Transport-level failure (DNS, connect, TLS, ...).
    Failed(String),
    TimedOut,
}

impl ProbeOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, ProbeOutcome::Available)
    }

    /// Short label used as a span/log field.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Available => "available",
            ProbeOutcome::Status(_) => "status",
            ProbeOutcome::Failed(_) => "failed",
            ProbeOutcome::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Available => write!(f, "available"),
            ProbeOutcome::Status(code) => write!(f, "unavailable (status {code})"),
            ProbeOutcome::Failed(reason) => write!(f, "unavailable ({reason})"),
            ProbeOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// HTTP client used for probing, with `timeout` as its per-request deadline.
pub fn probe_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// GET `url` and classify the response. Never fails; every error becomes an
/// unavailable outcome.
pub async fn probe(client: &reqwest::Client, url: &str, timeout: Duration) -> ProbeOutcome {
    let start = Instant::now();
    let result = tokio::time::timeout(timeout, client.get(url).send()).await;

    let latency = start.elapsed().as_millis() as u64;
    let span = tracing::Span::current();
    span.record("latency_ms", latency);

    let outcome = match result {
        Ok(Ok(resp)) => {
            let status = resp.status();
            span.record("status", status.as_u16());
            if status == StatusCode::OK {
                ProbeOutcome::Available
            } else {
                ProbeOutcome::Status(status.as_u16())
            }
        }
        Ok(Err(e)) if e.is_timeout() => ProbeOutcome::TimedOut,
        Ok(Err(e)) => ProbeOutcome::Failed(e.to_string()),
        Err(_) => ProbeOutcome::TimedOut,
    };

    span.record("outcome", outcome.label());
    tracing::debug!(url = %url, latency_ms = latency, outcome = %outcome, "Probe complete");
    outcome
}
