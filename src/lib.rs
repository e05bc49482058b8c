//! # Reviewtap (storefront and business dashboard)
//!
//! `reviewtap` serves the customer-facing storefront and the business-owner
//! dashboard for the NFC/QR review devices. All business data lives behind a
//! remote REST API; this crate owns the client side of that relationship.
//!
//! ## Session lifecycle
//!
//! The session is a single bearer token persisted in the `auth_token` cookie.
//! [`session::SessionContext`] is the only owner of that cookie and of the
//! cached "current user"; everything else goes through its mutation API.
//!
//! - **Login / register:** the backend returns `{user, token}`. The token is
//!   written to the cookie first, then the user is seeded into the cache, so
//!   any reader woken by the cache update already has a token to send.
//! - **Logout:** the backend is told to revoke the token (best effort), then
//!   the cookie and every cached query are dropped locally, regardless of the
//!   backend outcome.
//! - **Races:** session mutations are sequenced; a mutation that resolves after
//!   a newer one started is discarded ([`auth::AuthError::Superseded`]).
//!
//! ## Route protection
//!
//! [`guard`] is a cheap presence check on the cookie: `/dashboard` needs a
//! token, the login/register/forgot-password pages need its absence. It never
//! validates the token; dashboard pages fetch the current user before
//! rendering anything sensitive.

pub mod auth;
pub mod cli;
pub mod client;
pub mod guard;
pub mod locale;
pub mod session;
pub mod web;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
