//! Axum HTTP server: router, listener, graceful shutdown.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::check::CheckResponse;
use crate::config::RedirectConfig;
use crate::discovery::MirrorDiscovery;
use crate::pages::Pages;
use crate::stats::DiscoveryStats;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RedirectConfig,
    pub discovery: MirrorDiscovery,
    pub stats: DiscoveryStats,
    pub pages: Pages,
}

/// Fixed routes; the configurable check and fallback paths must avoid these.
pub const RESERVED_PATHS: &[&str] = &["/", "/go", "/health", "/api/stats", "/api/cache"];

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let check_path = state.config.redirect.check_path.clone();
    let fallback_path = state.config.redirect.fallback_path.clone();

    Router::new()
        .route("/", get(handle_checking_page))
        .route(&check_path, get(handle_check))
        .route(&fallback_path, get(handle_error_page))
        .route("/go", get(handle_go))
        .route("/health", get(handle_health))
        .route("/api/stats", get(handle_get_stats))
        .route("/api/cache", delete(handle_clear_cache))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Build and run the HTTP server.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.config.server.listen_address.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "mirror-redirect listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("mirror-redirect shut down gracefully");
    Ok(())
}

/// Landing page whose script asks the check endpoint where to go.
async fn handle_checking_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.pages.checking.clone())
}

/// Check endpoint: `{"ok":true,"url":...}` when a mirror is up, `{"ok":false}`
/// otherwise. Always 200; the body carries the verdict.
async fn handle_check(State(state): State<Arc<AppState>>) -> Json<CheckResponse> {
    state.stats.inc_checks();
    Json(CheckResponse::from(state.discovery.find_available().await))
}

/// Server-side redirect straight to the discovered mirror.
async fn handle_go(State(state): State<Arc<AppState>>) -> Response {
    match state.discovery.find_available().await {
        Some(url) => Redirect::temporary(&url).into_response(),
        None => error_page(&state),
    }
}

async fn handle_error_page(State(state): State<Arc<AppState>>) -> Response {
    error_page(&state)
}

fn error_page(state: &AppState) -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, Html(state.pages.error.clone())).into_response()
}

/// Health check endpoint.
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn handle_get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.stats.snapshot())
}

/// Forget the cached mirror so the next lookup probes again.
async fn handle_clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    let cleared = state.discovery.cache().clear().await;
    tracing::info!(cleared, "Mirror cache cleared");
    StatusCode::NO_CONTENT
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, draining connections...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::IntoFuture;
    use std::time::Duration;

    use axum::extract::Path;
    use reqwest::Url;
    use serde_json::json;

    use crate::config::DiscoveryConfig;
    use crate::redirector::{CheckFailure, CheckOutcome, Navigator, Redirector};

    /// Mirror host answering 200 only for `/m/{live}`.
    async fn spawn_mirror(live: String) -> String {
        let app = Router::new().route(
            "/m/{stamp}",
            get(move |Path(stamp): Path<String>| {
                let live = live.clone();
                async move {
                    if stamp == live {
                        StatusCode::OK
                    } else {
                        StatusCode::NOT_FOUND
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::serve(listener, app).into_future());
        format!("http://{addr}/m/{{}}")
    }

    /// Start the service with discovery pointed at `url_template`.
    async fn spawn_service(url_template: String) -> String {
        let config = RedirectConfig {
            discovery: DiscoveryConfig {
                url_template,
                window_days: 2,
                probe_timeout_secs: 2,
                cache_ttl_secs: 0,
            },
            ..Default::default()
        };
        let stats = DiscoveryStats::new();
        let discovery = MirrorDiscovery::new(
            reqwest::Client::new(),
            config.discovery.clone(),
            stats.clone(),
        );
        let pages = Pages::render(&config.redirect);
        let app = router(AppState {
            config,
            discovery,
            stats,
            pages,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::serve(listener, app).into_future());
        format!("http://{addr}")
    }

    fn today_stamp() -> String {
        crate::discovery::candidates::date_stamp(chrono::Local::now().date_naive())
    }

    fn no_redirect_client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    struct NullNavigator;

    impl Navigator for NullNavigator {
        fn navigate(&self, _target: &str) {}
    }

    #[tokio::test]
    async fn test_check_reports_live_mirror() {
        let template = spawn_mirror(today_stamp()).await;
        let base = spawn_service(template.clone()).await;

        let body: serde_json::Value = reqwest::get(format!("{base}/check"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            body,
            json!({ "ok": true, "url": template.replace("{}", &today_stamp()) })
        );
    }

    #[tokio::test]
    async fn test_check_reports_not_ok_without_mirror() {
        let template = spawn_mirror("000000".to_string()).await;
        let base = spawn_service(template).await;

        let resp = reqwest::get(format!("{base}/check")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "ok": false }));
    }

    #[tokio::test]
    async fn test_redirector_against_service() {
        let template = spawn_mirror(today_stamp()).await;
        let base = spawn_service(template.clone()).await;

        let check_url = Url::parse(&format!("{base}/check")).unwrap();
        let redirector = Redirector::new(reqwest::Client::new(), check_url, "/error", NullNavigator);
        assert_eq!(
            redirector.run().await,
            CheckOutcome::Success {
                url: template.replace("{}", &today_stamp())
            }
        );
    }

    #[tokio::test]
    async fn test_redirector_falls_back_without_mirror() {
        let template = spawn_mirror("000000".to_string()).await;
        let base = spawn_service(template).await;

        let check_url = Url::parse(&format!("{base}/check")).unwrap();
        let redirector = Redirector::new(reqwest::Client::new(), check_url, "/error", NullNavigator);
        assert_eq!(
            redirector.run().await,
            CheckOutcome::Failure {
                reason: CheckFailure::NotOk
            }
        );
    }

    #[tokio::test]
    async fn test_go_redirects_to_mirror() {
        let template = spawn_mirror(today_stamp()).await;
        let base = spawn_service(template.clone()).await;

        let resp = no_redirect_client()
            .get(format!("{base}/go"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            resp.headers()["location"].to_str().unwrap(),
            template.replace("{}", &today_stamp())
        );
    }

    #[tokio::test]
    async fn test_go_renders_error_page_without_mirror() {
        let template = spawn_mirror("000000".to_string()).await;
        let base = spawn_service(template).await;

        let resp = no_redirect_client()
            .get(format!("{base}/go"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert!(resp.text().await.unwrap().contains("No mirror available"));
    }

    #[tokio::test]
    async fn test_pages_and_health() {
        let template = spawn_mirror("000000".to_string()).await;
        let base = spawn_service(template).await;

        let index = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(index.status(), reqwest::StatusCode::OK);
        assert!(index.text().await.unwrap().contains(r#"fetch("/check")"#));

        let error = reqwest::get(format!("{base}/error")).await.unwrap();
        assert_eq!(error.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

        let health = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_stats_and_cache_clear() {
        let template = spawn_mirror(today_stamp()).await;
        let base = spawn_service(template).await;
        let client = reqwest::Client::new();

        client.get(format!("{base}/check")).send().await.unwrap();
        client.get(format!("{base}/check")).send().await.unwrap();

        let stats: serde_json::Value = client
            .get(format!("{base}/api/stats"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stats["checks_served"], 2);
        assert_eq!(stats["discoveries"], 1);
        assert_eq!(stats["cache_hits"], 1);
        assert_eq!(stats["probes_issued"], 2);

        let cleared = client
            .delete(format!("{base}/api/cache"))
            .send()
            .await
            .unwrap();
        assert_eq!(cleared.status(), reqwest::StatusCode::NO_CONTENT);

        client.get(format!("{base}/check")).send().await.unwrap();
        let stats: serde_json::Value = client
            .get(format!("{base}/api/stats"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stats["discoveries"], 2);
    }
}
