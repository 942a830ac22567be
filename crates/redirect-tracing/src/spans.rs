//! Span builder helpers for mirror-redirect instrumentation.

/// Span for one discovery run across all candidate mirrors.
///
/// Recorded later:
/// - `selected`: the chosen URL, if any
/// - `latency_ms`: wall time of the whole run
#[macro_export]
macro_rules! discovery_span {
    ($discovery_id:expr, $candidates:expr) => {
        tracing::info_span!(
            "discovery",
            discovery_id = %$discovery_id,
            candidates = $candidates,
            selected = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    };
}

/// Span for a single candidate probe.
#[macro_export]
macro_rules! probe_span {
    ($discovery_id:expr, $url:expr) => {
        tracing::debug_span!(
            "probe",
            discovery_id = %$discovery_id,
            url = %$url,
            status = tracing::field::Empty,
            outcome = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    };
}

/// Span for one redirector invocation against a check endpoint.
#[macro_export]
macro_rules! check_span {
    ($check_url:expr) => {
        tracing::info_span!(
            "check",
            check_url = %$check_url,
            outcome = tracing::field::Empty,
            target = tracing::field::Empty,
        )
    };
}
