use crate::client::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECONDS};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_API_TIMEOUT_SECONDS: &str = "api-timeout-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub timeout_seconds: u64,
    pub cookie_secure: bool,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let url = matches
            .get_one::<String>(ARG_API_URL)
            .cloned()
            .context("missing required argument: --api-url")?;
        let timeout_seconds = matches
            .get_one::<u64>(ARG_API_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        Ok(Self {
            url,
            timeout_seconds,
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long("api-url")
                .help("Base URL of the backend REST API")
                .env("REVIEWTAP_API_URL")
                .default_value(DEFAULT_API_URL),
        )
        .arg(
            Arg::new(ARG_API_TIMEOUT_SECONDS)
                .long("api-timeout-seconds")
                .help("Timeout for each backend request in seconds")
                .env("REVIEWTAP_API_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long("cookie-secure")
                .help("Mark the session cookie Secure (site served over HTTPS)")
                .env("REVIEWTAP_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}
