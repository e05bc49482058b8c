use crate::{
    cli::telemetry,
    client::ApiConfig,
    web::{self, AppState},
};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub api_url: String,
    pub api_timeout_seconds: u64,
    pub cookie_secure: bool,
}

/// Serve the storefront and dashboard until interrupted.
/// # Errors
/// Returns an error if the API client cannot be built or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        port = args.port,
        api_url = %args.api_url,
        api_timeout_seconds = args.api_timeout_seconds,
        cookie_secure = args.cookie_secure,
        "Starting reviewtap"
    );

    let api = ApiConfig::new(
        args.api_url.as_str(),
        Duration::from_secs(args.api_timeout_seconds),
    )
    .context("Failed to build API client")?;

    let result = web::serve(args.port, AppState::new(api, args.cookie_secure)).await;

    telemetry::shutdown_tracer();

    result
}
