//! Session state: the token cookie, the query cache and the context object
//! that owns both.
//!
//! Callers outside this module go through [`SessionContext`]; it is the only
//! place that writes the token or touches cached queries.

pub mod cache;
pub mod cookie;
mod store;

pub use cache::{QueryCache, QueryKey};
pub use store::{CookieJarStore, TokenStore};

use crate::{
    client::{types::User, ApiClient, ApiConfig, ApiError},
    locale::Locale,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use std::{future::Future, sync::Arc};
use tracing::{debug, instrument, warn};

#[derive(Debug)]
pub struct SessionContext {
    store: Arc<dyn TokenStore>,
    cache: QueryCache,
    client: ApiClient,
}

impl SessionContext {
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn TokenStore>, locale: Locale) -> Self {
        Self::with_cache(config, store, locale, QueryCache::default())
    }

    #[must_use]
    pub fn with_cache(
        config: ApiConfig,
        store: Arc<dyn TokenStore>,
        locale: Locale,
        cache: QueryCache,
    ) -> Self {
        let client = ApiClient::new(config, Arc::clone(&store), locale);
        Self {
            store,
            cache,
            client,
        }
    }

    /// Client that authorizes with this session's token.
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn set_token(&self, token: &SecretString) {
        self.store.set_token(token);
    }

    pub fn clear_token(&self) {
        self.store.clear_token();
    }

    #[must_use]
    pub fn token_present(&self) -> bool {
        self.store.token().is_some()
    }

    /// Replace the cached current user without a round trip.
    pub fn set_user(&self, user: Option<&User>) {
        self.cache.set(&QueryKey::current_user(), &user);
    }

    /// Last known user, never fetching. Absent whenever no token is stored.
    #[must_use]
    pub fn cached_user(&self) -> Option<User> {
        if !self.token_present() {
            return None;
        }
        self.cache
            .peek::<Option<User>>(&QueryKey::current_user())
            .flatten()
    }

    /// Authoritative current user.
    ///
    /// Served from the cache while fresh, otherwise fetched from
    /// `/auth/user`. Any failure resolves to `None`; a 401 also clears the
    /// stale token. A fetch only acts on the session if the token it was
    /// issued with is still the stored one; otherwise the newer session's
    /// cached user is returned.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Option<User> {
        let Some(issued_with) = self.store.token() else {
            debug!("No session token; skipping user fetch");
            return None;
        };

        let key = QueryKey::current_user();
        let client = self.client.clone();
        let result = self
            .cache
            .fetch(&key, || async move { client.current_user().await.map(Some) })
            .await;

        if !self.holds_token(&issued_with) {
            debug!("Session token replaced during user fetch; ignoring the result");
            return self.cached_user();
        }

        match result {
            Ok(user) => user,
            Err(err) if err.is_unauthorized() => {
                if self.store.clear_token_if(&issued_with) {
                    debug!("Session token rejected; cleared it");
                    self.cache.invalidate(&key);
                    None
                } else {
                    debug!("Rejected session token was already replaced");
                    self.cached_user()
                }
            }
            Err(err) => {
                warn!("Failed to fetch current user: {err}");
                None
            }
        }
    }

    fn holds_token(&self, token: &SecretString) -> bool {
        self.store
            .token()
            .is_some_and(|current| current.expose_secret() == token.expose_secret())
    }

    /// Cached read of any backend resource.
    ///
    /// # Errors
    /// Returns the [`ApiError`] produced by `fetcher`.
    pub async fn query<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let client = self.client.clone();
        self.cache.fetch(key, || fetcher(client)).await
    }

    /// Drop every cached query, auth and business data alike.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}
