//! In-process store
//!
//! State lives behind one async `RwLock`. A batch is applied to a copy of the
//! state, the copy is optionally written to the snapshot file, and only then
//! swapped in, so a failed mutation or a failed write leaves nothing behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use secondop_types::{
    doctor_rating, Case, CaseId, CaseStatus, Locale, Transaction, User, UserId,
};

use crate::config::LocalConfig;
use crate::error::{DbError, DbResult};
use crate::seed;
use crate::store::{Backend, CaseQuery, Mutation, Store, WriteBatch};

/// Everything the local store persists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Registration order
    pub users: Vec<User>,
    /// Insertion order
    pub cases: Vec<Case>,
    /// Append order
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub locale: Locale,
}

impl Snapshot {
    fn user_mut(&mut self, id: &UserId) -> DbResult<&mut User> {
        self.users
            .iter_mut()
            .find(|u| &u.id == id)
            .ok_or_else(|| DbError::UserNotFound(id.to_string()))
    }

    fn apply(&mut self, mutation: Mutation) -> DbResult<()> {
        match mutation {
            Mutation::InsertUser(user) => {
                if self.users.iter().any(|u| u.email == user.email) {
                    return Err(DbError::Duplicate(user.email));
                }
                self.users.push(user);
            }
            Mutation::SetApproval { user_id, approved } => {
                self.user_mut(&user_id)?.is_approved = approved;
            }
            Mutation::UpdateProfile { user_id, update } => {
                update.apply(self.user_mut(&user_id)?);
            }
            Mutation::DeleteUser { user_id } => {
                let before = self.users.len();
                self.users.retain(|u| u.id != user_id);
                if self.users.len() == before {
                    return Err(DbError::UserNotFound(user_id.to_string()));
                }
                for case in self.cases.iter_mut() {
                    if case.status == CaseStatus::Open
                        && case.opinion.is_none()
                        && case.assigned_doctor_id.as_ref() == Some(&user_id)
                    {
                        case.assigned_doctor_id = None;
                        case.version += 1;
                    }
                }
            }
            Mutation::AdjustWallet { user_id, delta } => {
                let user = self.user_mut(&user_id)?;
                let next = user.wallet_balance.checked_add(delta).ok_or_else(|| {
                    DbError::BalanceOverflow {
                        user_id: user_id.to_string(),
                    }
                })?;
                if next.is_negative() {
                    return Err(DbError::InsufficientBalance {
                        user_id: user_id.to_string(),
                        requested: delta.abs(),
                        available: user.wallet_balance,
                    });
                }
                user.wallet_balance = next;
            }
            Mutation::AppendTransaction(tx) => {
                self.transactions.push(tx);
            }
            Mutation::InsertCase(case) => {
                self.cases.push(case);
            }
            Mutation::UpdateCase {
                mut case,
                expected_version,
            } => {
                let stored = self
                    .cases
                    .iter_mut()
                    .find(|c| c.id == case.id)
                    .ok_or_else(|| DbError::CaseNotFound(case.id.to_string()))?;
                if stored.version != expected_version {
                    return Err(DbError::Conflict(case.id.to_string()));
                }
                case.version = expected_version + 1;
                *stored = case;
            }
            Mutation::IncrementCasesClosed { user_id } => {
                let profile = self
                    .user_mut(&user_id)?
                    .doctor
                    .as_mut()
                    .ok_or_else(|| DbError::InvalidData(format!("{} has no doctor profile", user_id)))?;
                profile.cases_closed += 1;
            }
            Mutation::RecomputeReputation {
                user_id,
                bonus_award,
            } => {
                let rating = doctor_rating(&user_id, &self.cases);
                let profile = self
                    .user_mut(&user_id)?
                    .doctor
                    .as_mut()
                    .ok_or_else(|| DbError::InvalidData(format!("{} has no doctor profile", user_id)))?;
                profile.rating = rating;
                profile.bonus_points += bonus_award;
            }
            Mutation::SetLocale(locale) => {
                self.locale = locale;
            }
        }
        Ok(())
    }
}

/// Process-local adapter with an optional JSON snapshot file
pub struct LocalStore {
    state: RwLock<Snapshot>,
    snapshot_path: Option<PathBuf>,
}

impl LocalStore {
    /// Empty, purely in-memory store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Snapshot::default()),
            snapshot_path: None,
        }
    }

    /// In-memory store starting from `snapshot`
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            snapshot_path: None,
        }
    }

    /// Load from the configured snapshot file, or start empty (or seeded).
    pub async fn open(config: &LocalConfig) -> DbResult<Self> {
        let mut snapshot = match &config.snapshot_path {
            Some(path) if tokio::fs::try_exists(path).await? => {
                let bytes = tokio::fs::read(path).await?;
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                info!(
                    path = %path.display(),
                    users = snapshot.users.len(),
                    cases = snapshot.cases.len(),
                    "Loaded local snapshot"
                );
                snapshot
            }
            _ => Snapshot::default(),
        };

        if config.seed_demo && snapshot.users.is_empty() {
            info!("Seeding demo marketplace data");
            snapshot = seed::demo_snapshot();
        }

        let store = Self {
            state: RwLock::new(snapshot),
            snapshot_path: config.snapshot_path.clone(),
        };
        if let Some(path) = &store.snapshot_path {
            let state = store.state.read().await;
            write_snapshot(path, &state).await?;
        }
        Ok(store)
    }

    /// Copy of the full state
    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Write to a sibling temp file, then rename over the target.
async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> DbResult<()> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Newest first; ties keep the later insertion first.
fn newest_first<T>(
    items: impl DoubleEndedIterator<Item = T>,
    key: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = items.rev().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

#[async_trait]
impl Store for LocalStore {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    async fn get_user(&self, id: &UserId) -> DbResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| &u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        Ok(self.state.read().await.users.clone())
    }

    async fn get_case(&self, id: &CaseId) -> DbResult<Option<Case>> {
        let state = self.state.read().await;
        Ok(state.cases.iter().find(|c| &c.id == id).cloned())
    }

    async fn list_cases(&self, query: &CaseQuery) -> DbResult<Vec<Case>> {
        let state = self.state.read().await;
        Ok(newest_first(
            state.cases.iter().filter(|c| query.matches(c)).cloned(),
            |c| c.created_at,
        ))
    }

    async fn list_transactions(&self, user_id: Option<&UserId>) -> DbResult<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(newest_first(
            state
                .transactions
                .iter()
                .filter(|t| user_id.map(|u| &t.user_id == u).unwrap_or(true))
                .cloned(),
            |t| t.created_at,
        ))
    }

    async fn locale(&self) -> DbResult<Locale> {
        Ok(self.state.read().await.locale)
    }

    async fn commit(&self, batch: WriteBatch) -> DbResult<()> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let size = batch.len();
        for mutation in batch.into_mutations() {
            next.apply(mutation)?;
        }
        if let Some(path) = &self.snapshot_path {
            write_snapshot(path, &next).await?;
        }
        *state = next;
        debug!(mutations = size, "Committed local batch");
        Ok(())
    }

    async fn health_check(&self) -> DbResult<bool> {
        Ok(true)
    }

    async fn close(&self) -> DbResult<()> {
        if let Some(path) = &self.snapshot_path {
            let state = self.state.read().await;
            if let Err(e) = write_snapshot(path, &state).await {
                warn!(error = %e, "Failed to flush local snapshot on close");
                return Err(e);
            }
        }
        Ok(())
    }
}
