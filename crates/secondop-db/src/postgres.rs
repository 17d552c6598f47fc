//! PostgreSQL adapter
//!
//! Each `WriteBatch` runs in one SQL transaction. Wallet rows are locked with
//! `SELECT ... FOR UPDATE` before the balance check and case rows are guarded
//! by their `version` column, so two sessions racing on the same case cannot
//! both commit.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::PgConnection;
use tracing::{debug, info};

use secondop_types::{Case, CaseId, Locale, Transaction, User, UserId};

use crate::config::RemoteConfig;
use crate::error::{DbError, DbResult};
use crate::repos::{CaseRepo, SettingRepo, TransactionRepo, UserRepo};
use crate::store::{Backend, CaseQuery, Mutation, Store, WriteBatch};

/// Remote adapter over a PostgreSQL pool
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL
    pub async fn connect(config: &RemoteConfig) -> DbResult<Self> {
        info!("Connecting to PostgreSQL: {}", config.postgres_url_masked());

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.postgres_url)
            .await
            .map_err(|e| DbError::Connection(format!("PostgreSQL: {}", e)))?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> DbResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;
        info!("Migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn users(&self) -> UserRepo {
        UserRepo::new(self.pool.clone())
    }

    fn cases(&self) -> CaseRepo {
        CaseRepo::new(self.pool.clone())
    }

    fn transactions(&self) -> TransactionRepo {
        TransactionRepo::new(self.pool.clone())
    }

    fn settings(&self) -> SettingRepo {
        SettingRepo::new(self.pool.clone())
    }
}

async fn apply(conn: &mut PgConnection, mutation: &Mutation) -> DbResult<()> {
    match mutation {
        Mutation::InsertUser(user) => UserRepo::insert(conn, user).await,
        Mutation::SetApproval { user_id, approved } => {
            UserRepo::set_approval(conn, user_id, *approved).await
        }
        Mutation::UpdateProfile { user_id, update } => {
            UserRepo::update_profile(conn, user_id, update).await
        }
        Mutation::DeleteUser { user_id } => {
            UserRepo::delete(conn, user_id).await?;
            let released = CaseRepo::release_direct_requests(conn, user_id).await?;
            if released > 0 {
                debug!(user_id = %user_id, released, "Released direct requests to the pool");
            }
            Ok(())
        }
        Mutation::AdjustWallet { user_id, delta } => {
            UserRepo::adjust_wallet(conn, user_id, *delta).await.map(|_| ())
        }
        Mutation::AppendTransaction(tx) => TransactionRepo::append(conn, tx).await,
        Mutation::InsertCase(case) => CaseRepo::insert(conn, case).await,
        Mutation::UpdateCase {
            case,
            expected_version,
        } => CaseRepo::update(conn, case, *expected_version).await,
        Mutation::IncrementCasesClosed { user_id } => {
            UserRepo::increment_cases_closed(conn, user_id).await
        }
        Mutation::RecomputeReputation {
            user_id,
            bonus_award,
        } => UserRepo::recompute_reputation(conn, user_id, *bonus_award).await,
        Mutation::SetLocale(locale) => SettingRepo::set_locale(conn, *locale).await,
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> Backend {
        Backend::Remote
    }

    async fn get_user(&self, id: &UserId) -> DbResult<Option<User>> {
        self.users().find_by_id(*id.as_uuid()).await
    }

    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        self.users().find_by_email(email).await
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        self.users().list().await
    }

    async fn get_case(&self, id: &CaseId) -> DbResult<Option<Case>> {
        self.cases().find_by_id(*id.as_uuid()).await
    }

    async fn list_cases(&self, query: &CaseQuery) -> DbResult<Vec<Case>> {
        self.cases().list(query).await
    }

    async fn list_transactions(&self, user_id: Option<&UserId>) -> DbResult<Vec<Transaction>> {
        self.transactions().list(user_id).await
    }

    async fn locale(&self) -> DbResult<Locale> {
        self.settings().locale().await
    }

    async fn commit(&self, batch: WriteBatch) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        // Dropping `tx` on an early return rolls the batch back.
        for mutation in batch.mutations() {
            apply(&mut *tx, mutation).await?;
        }

        tx.commit().await?;
        debug!(mutations = batch.len(), "Committed remote batch");
        Ok(())
    }

    async fn health_check(&self) -> DbResult<bool> {
        Ok(sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok())
    }

    async fn close(&self) -> DbResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
