use crate::client::ApiConfig;

/// Process-wide configuration shared by every request.
#[derive(Clone, Debug)]
pub struct AppState {
    pub api: ApiConfig,
    /// Add `Secure` to the session cookie.
    pub cookie_secure: bool,
}

impl AppState {
    #[must_use]
    pub fn new(api: ApiConfig, cookie_secure: bool) -> Self {
        Self { api, cookie_secure }
    }
}
