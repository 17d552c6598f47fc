//! Second Opinion persistence layer
//!
//! One port (`Store`) and two adapters:
//!
//! - **LocalStore**: in-process state, optionally snapshotted to a JSON file.
//!   Used for demos, tests and single-user runs.
//! - **PgStore**: PostgreSQL via SQLx. Every batch is one SQL transaction.
//!
//! The backend is selected once from `StoreConfig` by [`open`]; marketplace
//! code only ever sees `Arc<dyn Store>`.

pub mod config;
pub mod error;
pub mod models;
pub mod repos;
pub mod store;
pub mod local;
pub mod postgres;
pub mod seed;

use std::sync::Arc;

use tracing::info;

pub use config::{LocalConfig, RemoteConfig, StoreConfig};
pub use error::{DbError, DbResult};
pub use local::{LocalStore, Snapshot};
pub use postgres::PgStore;
pub use store::{Backend, CaseQuery, Mutation, Store, WriteBatch};

/// Open the configured adapter
pub async fn open(config: &StoreConfig) -> DbResult<Arc<dyn Store>> {
    info!(backend = config.backend_name(), "Opening marketplace store");
    match config {
        StoreConfig::Local(local) => Ok(Arc::new(LocalStore::open(local).await?)),
        StoreConfig::Remote(remote) => {
            let store = PgStore::connect(remote).await?;
            if remote.run_migrations {
                store.migrate().await?;
            }
            Ok(Arc::new(store))
        }
    }
}
