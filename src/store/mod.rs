// src/store/mod.rs

//! Snap store client
//!
//! This module provides functionality for:
//! - Resolving batched install/refresh/download actions against the store
//! - Deriving privacy-preserving instance keys for parallel installs
//! - Translating store error codes into a typed taxonomy
//! - Retrying a batch after refreshing soft-expired authorizations
//!
//! The HTTP round-trip sits behind the [`Transport`] trait so the resolver
//! can be driven against a scripted transport in tests.

mod action;
mod auth;
mod errors;
mod info;
mod transport;

pub use action::{
    ActionKind, CurrentSnap, RefreshOptions, SnapAction, SnapActionResult, ValidationFlag,
};
pub use auth::{AuthRefreshNeed, AuthRefresher, UserAuth};
pub use errors::{SnapActionError, SnapRelease, StoreError};
pub use transport::{HttpTransport, JsonReply, RequestOptions, Transport, JSON_CONTENT_TYPE};

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Default public store endpoint
pub const DEFAULT_STORE_URL: &str = "https://api.snapcraft.io/";

/// Path of the action endpoint under the store base URL
pub(crate) const SNAP_ACTION_ENDPOINT: &str = "v2/snaps/refresh";

/// Response header carrying the store's suggested payment currency
pub(crate) const SUGGESTED_CURRENCY_HEADER: &str = "X-Suggested-Currency";

/// Cooperative cancellation shared between a caller and an in-flight call.
///
/// Clones observe the same flag. The resolver honors cancellation at its
/// suspension points: around the transport round-trip and before an auth
/// refresh.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Observer for the suggested-currency hints the store attaches to
/// responses. Never consulted on the failure path.
pub trait CurrencySink: Send + Sync {
    fn suggested_currency(&self, currency: &str);
}

/// Store client configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL endpoint paths are joined to; keep the trailing slash
    pub base_url: Url,
    /// Delta format advertised to the store
    pub delta_format: String,
    /// Whether to advertise delta acceptance at all
    pub accept_deltas: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            base_url: Url::parse(DEFAULT_STORE_URL).expect("default store URL is well formed"),
            delta_format: "xdelta3".to_string(),
            accept_deltas: true,
        }
    }
}

/// Client for the store's snap-action API
pub struct Store {
    cfg: StoreConfig,
    transport: Arc<dyn Transport>,
    auth: Option<Arc<dyn AuthRefresher>>,
    currency: Option<Arc<dyn CurrencySink>>,
}

impl Store {
    /// Create a store client over the real HTTP transport
    pub fn new(cfg: StoreConfig) -> Result<Self> {
        Ok(Self::with_transport(cfg, Arc::new(HttpTransport::new()?)))
    }

    /// Create a store client over a caller-supplied transport
    pub fn with_transport(cfg: StoreConfig, transport: Arc<dyn Transport>) -> Self {
        Store {
            cfg,
            transport,
            auth: None,
            currency: None,
        }
    }

    /// Attach the collaborator that renews soft-expired authorizations
    pub fn with_auth_refresher(mut self, refresher: Arc<dyn AuthRefresher>) -> Self {
        self.auth = Some(refresher);
        self
    }

    /// Attach the observer for suggested-currency hints
    pub fn with_currency_sink(mut self, sink: Arc<dyn CurrencySink>) -> Self {
        self.currency = Some(sink);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    fn endpoint_url(&self, path: &str) -> Result<Url> {
        self.cfg
            .base_url
            .join(path)
            .map_err(|e| Error::Internal(format!("cannot build store URL for {path:?}: {e}")))
    }
}
