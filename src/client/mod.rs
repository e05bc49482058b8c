//! HTTP client wrapper for the backend REST API.
//!
//! Every request carries `Accept-Language` from the active locale and a bearer
//! token when the session store holds one. Responses are unwrapped from the
//! `{data: ...}` envelope; every failure is normalized into [`ApiError`]. The
//! wrapper never retries and never mutates session state.

mod endpoints;
mod error;
pub mod types;

pub use error::{
    ApiError, FieldErrors, DECODE_ERROR_MESSAGE, DEFAULT_ERROR_MESSAGE, NETWORK_ERROR_MESSAGE,
};

use crate::{locale::Locale, session::TokenStore, APP_USER_AGENT};
use reqwest::{
    header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE},
    Client, Method,
};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};
use types::Page;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
/// Default request timeout applied by the shared HTTP client.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Backend location plus the shared connection pool.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    base_url: String,
    http: Client,
}

impl ApiConfig {
    /// Build a config with its own `reqwest` client.
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Session-aware client; cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    store: Arc<dyn TokenStore>,
    locale: Locale,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn TokenStore>, locale: Locale) -> Self {
        Self {
            config,
            store,
            locale,
        }
    }

    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Derive the request locale from a browser-style location path.
    #[must_use]
    pub fn for_location(self, path: &str) -> Self {
        self.with_locale(Locale::detect(path))
    }

    #[must_use]
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Issue a request and return the unwrapped `data` payload.
    ///
    /// # Errors
    /// Returns [`ApiError`] for transport failures and non-2xx responses.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        self.execute(method, path, body).await.map(unwrap_envelope)
    }

    /// GET a single resource.
    ///
    /// # Errors
    /// Returns [`ApiError`] on failure or when the payload does not decode.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.request(Method::GET, path, None).await?;
        error::from_value(value)
    }

    /// GET a paginated collection, keeping the `meta` block.
    ///
    /// # Errors
    /// Returns [`ApiError`] on failure or when the payload does not decode.
    pub async fn get_page<T: DeserializeOwned>(&self, path: &str) -> Result<Page<T>, ApiError> {
        let value = self.execute(Method::GET, path, None).await?;
        error::from_value(value)
    }

    /// POST a JSON body and decode the unwrapped response.
    ///
    /// # Errors
    /// Returns [`ApiError`] on failure or when the payload does not decode.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode(body)?;
        let value = self.request(Method::POST, path, Some(&body)).await?;
        error::from_value(value)
    }

    /// PUT a JSON body and decode the unwrapped response.
    ///
    /// # Errors
    /// Returns [`ApiError`] on failure or when the payload does not decode.
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = encode(body)?;
        let value = self.request(Method::PUT, path, Some(&body)).await?;
        error::from_value(value)
    }

    /// POST without a body, ignoring any response payload.
    ///
    /// # Errors
    /// Returns [`ApiError`] for transport failures and non-2xx responses.
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::POST, path, None).await.map(|_| ())
    }

    /// DELETE a resource, ignoring any response payload.
    ///
    /// # Errors
    /// Returns [`ApiError`] for transport failures and non-2xx responses.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, None).await.map(|_| ())
    }

    /// Send the request and return the whole JSON body (`null` when empty).
    #[instrument(skip(self, body), fields(locale = %self.locale))]
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = build_url(&self.config.base_url, path);
        let mutating = method != Method::GET && method != Method::HEAD;

        let mut builder = self
            .config
            .http
            .request(method, &url)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, self.locale.as_str());

        if let Some(token) = self.store.token() {
            builder = builder.bearer_auth(token.expose_secret());
        }

        if mutating {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }

        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            warn!("Request to {url} failed: {err}");
            ApiError::network()
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|err| {
            warn!("Failed to read response body from {url}: {err}");
            ApiError::network()
        })?;

        if !status.is_success() {
            debug!("Request to {url} rejected with {status}");
            return Err(ApiError::rejected(status.as_u16(), &bytes));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            debug!("Failed to parse response from {url}: {err}");
            ApiError::decode(Some(status.as_u16()))
        })
    }
}

/// Strip the `{data: ...}` envelope; bodies without one pass through unchanged.
fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut object) if object.contains_key("data") => {
            object.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|err| {
        warn!("Failed to encode request body: {err}");
        ApiError::decode(None)
    })
}

/// Join the configured base URL and an endpoint path.
fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}
