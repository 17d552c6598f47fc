//! Session aggregate
//!
//! Owns the selected store adapter and the cached locale for the lifetime of
//! the marketplace. The adapter is chosen exactly once, in `init`.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use secondop_db::{Backend, Store, StoreConfig};
use secondop_types::{Locale, Result};

/// The store is reachable only from inside this crate, so every write goes
/// through `Marketplace`:
///
/// ```compile_fail
/// # async fn f(session: secondop_marketplace::Session) {
/// use secondop_db::{Mutation, Store, WriteBatch};
/// let _ = session.store().commit(WriteBatch::new()).await;
/// # }
/// ```
pub struct Session {
    store: Arc<dyn Store>,
    locale: RwLock<Locale>,
}

impl Session {
    /// Open the configured backend and load session state
    pub async fn init(config: &StoreConfig) -> Result<Self> {
        let store = secondop_db::open(config).await?;
        Self::attach(store).await
    }

    /// Start a session over an already-open store
    pub async fn attach(store: Arc<dyn Store>) -> Result<Self> {
        let locale = store.locale().await?;
        info!(backend = store.backend().as_str(), locale = %locale, "Session started");
        Ok(Self {
            store,
            locale: RwLock::new(locale),
        })
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn backend(&self) -> Backend {
        self.store.backend()
    }

    /// Cached locale; updated after each successful locale write
    pub fn locale(&self) -> Locale {
        *self.locale.read()
    }

    pub(crate) fn remember_locale(&self, locale: Locale) {
        *self.locale.write() = locale;
    }

    /// Flush local state or close the connection pool
    pub async fn teardown(&self) -> Result<()> {
        self.store.close().await?;
        info!(backend = self.backend().as_str(), "Session closed");
        Ok(())
    }
}
