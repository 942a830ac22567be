//! Client-side redirector.
//!
//! Asks a check endpoint where to go and navigates exactly once: to the
//! server-supplied URL on success, to the fallback path on any failure. The
//! failure cause is kept in [`CheckOutcome`] for logs and tests even though
//! every failure navigates to the same place.

use std::io::Write;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::Instrument;

/// Why a check did not produce a destination.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckFailure {
    #[error("check request failed: {0}")]
    Network(String),

    #[error("check response is not valid JSON: {0}")]
    Decode(String),

    #[error("check reported no available destination")]
    NotOk,

    #[error("check succeeded without a destination url")]
    MissingUrl,
}

impl CheckFailure {
    pub fn label(&self) -> &'static str {
        match self {
            CheckFailure::Network(_) => "network",
            CheckFailure::Decode(_) => "decode",
            CheckFailure::NotOk => "not_ok",
            CheckFailure::MissingUrl => "missing_url",
        }
    }
}

/// Terminal state of one redirector run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Success { url: String },
    Failure { reason: CheckFailure },
}

impl CheckOutcome {
    fn failure(reason: CheckFailure) -> Self {
        CheckOutcome::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CheckOutcome::Success { .. })
    }

    /// Where this outcome navigates: the checked URL or `fallback`.
    pub fn target<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self {
            CheckOutcome::Success { url } => url,
            CheckOutcome::Failure { .. } => fallback,
        }
    }
}

/// Check body as sent by any server. `ok` stays untyped so that any truthy
/// value counts, not only `true`.
#[derive(Debug, Deserialize)]
struct RawCheck {
    #[serde(default)]
    ok: Value,
    #[serde(default)]
    url: Option<String>,
}

/// `false`, `null`, `0` and `""` are falsy; every other value is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Interpret a check response body. The HTTP status is ignored; only the
/// decoded body decides.
pub fn interpret(body: &[u8]) -> CheckOutcome {
    let response: RawCheck = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => return CheckOutcome::failure(CheckFailure::Decode(e.to_string())),
    };

    if !is_truthy(&response.ok) {
        return CheckOutcome::failure(CheckFailure::NotOk);
    }
    match response.url {
        Some(url) if !url.trim().is_empty() => CheckOutcome::Success { url },
        _ => CheckOutcome::failure(CheckFailure::MissingUrl),
    }
}

/// Destination sink for the redirector. Called exactly once per run.
pub trait Navigator {
    fn navigate(&self, target: &str);
}

/// Navigator for command-line use: prints the destination, resolved against
/// the checked server, to stdout.
pub struct StdoutNavigator {
    base: Url,
}

impl StdoutNavigator {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn resolve(&self, target: &str) -> String {
        self.base
            .join(target)
            .map(String::from)
            .unwrap_or_else(|_| target.to_string())
    }
}

impl Navigator for StdoutNavigator {
    fn navigate(&self, target: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", self.resolve(target)) {
            tracing::warn!(error = %e, "Failed to write navigation target");
        }
    }
}

/// Runs the check and navigates.
pub struct Redirector<N> {
    client: reqwest::Client,
    check_url: Url,
    fallback_path: String,
    navigator: N,
}

impl<N: Navigator> Redirector<N> {
    pub fn new(
        client: reqwest::Client,
        check_url: Url,
        fallback_path: impl Into<String>,
        navigator: N,
    ) -> Self {
        Self {
            client,
            check_url,
            fallback_path: fallback_path.into(),
            navigator,
        }
    }

    #[cfg(test)]
    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Issue one `GET` to the check endpoint, navigate once, and return the
    /// outcome. Each call is independent: no retry, no shared state.
    pub async fn run(&self) -> CheckOutcome {
        let span = redirect_tracing::check_span!(&self.check_url);

        async {
            let outcome = match self.fetch().await {
                Ok(body) => interpret(&body),
                Err(reason) => CheckOutcome::failure(reason),
            };

            let current = tracing::Span::current();
            let target = outcome.target(&self.fallback_path);
            match &outcome {
                CheckOutcome::Success { .. } => {
                    current.record("outcome", "success");
                    tracing::info!(target_url = %target, "Check succeeded");
                }
                CheckOutcome::Failure { reason } => {
                    current.record("outcome", reason.label());
                    tracing::warn!(reason = %reason, target_url = %target, "Check failed");
                }
            }
            current.record("target", target);

            self.navigator.navigate(target);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn fetch(&self) -> Result<Vec<u8>, CheckFailure> {
        let resp = self
            .client
            .get(self.check_url.clone())
            .send()
            .await
            .map_err(|e| CheckFailure::Network(e.to_string()))?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| CheckFailure::Network(e.to_string()))?;
        Ok(body.to_vec())
    }
}
