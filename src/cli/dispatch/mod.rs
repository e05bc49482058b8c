//! Map validated CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{api, ARG_PORT};
use anyhow::Result;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let api_opts = api::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        api_url: api_opts.url,
        api_timeout_seconds: api_opts.timeout_seconds,
        cookie_secure: api_opts.cookie_secure,
    }))
}
