//! mirror-redirect: finds the newest reachable dated mirror and sends
//! visitors there, or to an error page when none answers.
//!
//! Usage:
//!   mirror-redirect [serve] [--config PATH]
//!   mirror-redirect check --base-url URL [--config PATH]

mod check;
mod config;
mod discovery;
mod pages;
mod redirector;
mod server;
mod stats;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use reqwest::Url;

use config::RedirectConfig;
use discovery::MirrorDiscovery;
use pages::Pages;
use redirector::{Redirector, StdoutNavigator};
use server::AppState;
use stats::DiscoveryStats;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Serve,
    Check { base_url: String },
}

/// Flags followed by a value. The value is never read as the command.
const VALUE_FLAGS: &[&str] = &["--config", "--base-url"];

fn flag_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1).cloned())
}

/// Pick the command from the first non-flag argument, wherever it appears.
fn parse_command(args: &[String]) -> anyhow::Result<Command> {
    let mut positional = Vec::new();
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            rest.next();
        } else if arg.starts_with('-') {
            anyhow::bail!("unknown flag `{arg}`");
        } else {
            positional.push(arg.as_str());
        }
    }

    match positional.as_slice() {
        [] | ["serve"] => Ok(Command::Serve),
        ["check"] => Ok(Command::Check {
            base_url: flag_value(args, "--base-url").context("`check` requires --base-url URL")?,
        }),
        [other] => anyhow::bail!("unknown command `{other}` (expected `serve` or `check`)"),
        _ => anyhow::bail!("expected a single command, got {positional:?}"),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args: Vec<String> = std::env::args().collect();

    let config_path = flag_value(&args, "--config")
        .or_else(|| std::env::var("MIRROR_REDIRECT_CONFIG").ok())
        .unwrap_or_else(|| "mirror-redirect.toml".to_string());
    let command = parse_command(&args)?;

    let config = RedirectConfig::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        // OTLP export is optional; without it only fmt logging is installed
        let tracing_guard = redirect_tracing::init_tracing(&config.tracing);

        match command {
            Command::Serve => {
                tracing::info!(
                    config_path = %config_path,
                    listen_address = %config.server.listen_address,
                    url_template = %config.discovery.url_template,
                    window_days = config.discovery.window_days,
                    otlp_export = tracing_guard.exporting(),
                    "Starting mirror-redirect"
                );
                serve(config).await.map(|()| ExitCode::SUCCESS)
            }
            Command::Check { base_url } => {
                tracing::debug!(
                    base_url = %base_url,
                    otlp_export = tracing_guard.exporting(),
                    "Running check"
                );
                check(config, &base_url).await
            }
        }
    })
}

async fn serve(config: RedirectConfig) -> anyhow::Result<()> {
    let probe_client =
        discovery::probe::probe_client(Duration::from_secs(config.discovery.probe_timeout_secs))?;

    let stats = DiscoveryStats::new();
    let discovery = MirrorDiscovery::new(probe_client, config.discovery.clone(), stats.clone());
    let pages = Pages::render(&config.redirect);

    let state = AppState {
        config,
        discovery,
        stats,
        pages,
    };

    server::run(state).await
}

/// Run the redirector once against a running server and print where it
/// would navigate. Exits non-zero when it lands on the fallback path.
async fn check(config: RedirectConfig, base_url: &str) -> anyhow::Result<ExitCode> {
    let base = Url::parse(base_url).with_context(|| format!("invalid --base-url {base_url}"))?;
    let check_url = base.join(&config.redirect.check_path)?;

    let redirector = Redirector::new(
        reqwest::Client::new(),
        check_url,
        config.redirect.fallback_path,
        StdoutNavigator::new(base),
    );

    let outcome = redirector.run().await;
    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("mirror-redirect")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_no_command_serves() {
        assert_eq!(parse_command(&args(&[])).unwrap(), Command::Serve);
        assert_eq!(
            parse_command(&args(&["--config", "x.toml"])).unwrap(),
            Command::Serve
        );
    }

    #[test]
    fn test_check_found_after_leading_flags() {
        let parsed =
            parse_command(&args(&["--config", "x.toml", "check", "--base-url", "http://h:1"]))
                .unwrap();
        assert_eq!(
            parsed,
            Command::Check {
                base_url: "http://h:1".to_string()
            }
        );
    }

    #[test]
    fn test_flag_values_are_not_commands() {
        // "check" here is the config file name, not the command.
        assert_eq!(
            parse_command(&args(&["--config", "check", "serve"])).unwrap(),
            Command::Serve
        );
    }

    #[test]
    fn test_check_without_base_url_rejected() {
        assert!(parse_command(&args(&["check"])).is_err());
    }

    #[test]
    fn test_unknown_command_and_flag_rejected() {
        assert!(parse_command(&args(&["launch"])).is_err());
        assert!(parse_command(&args(&["--verbose", "serve"])).is_err());
        assert!(parse_command(&args(&["serve", "check"])).is_err());
    }
}
