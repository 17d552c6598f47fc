//! The persistence port
//!
//! Every marketplace operation reads through `Store` and writes through one
//! `WriteBatch`. An adapter applies a batch all-or-nothing: either every
//! mutation in it becomes visible, or none does and the error is returned.

use async_trait::async_trait;
use secondop_types::{
    Case, CaseId, Locale, Money, ProfileUpdate, Specialty, Transaction, User, UserId,
};

use crate::error::DbResult;

/// Which adapter is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Remote,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Local => "local",
            Backend::Remote => "remote",
        }
    }
}

/// Case listing filters. Results are newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseQuery {
    All,
    /// Cases filed by one patient
    ByPatient(UserId),
    /// Cases carrying an opinion by one doctor
    ByOpinionDoctor(UserId),
    /// Open cases addressed to `doctor`, plus unassigned open cases in
    /// `specialty`
    Open {
        specialty: Specialty,
        doctor: UserId,
    },
}

impl CaseQuery {
    /// In-memory predicate equivalent to the SQL filter
    pub fn matches(&self, case: &Case) -> bool {
        match self {
            CaseQuery::All => true,
            CaseQuery::ByPatient(patient) => &case.patient_id == patient,
            CaseQuery::ByOpinionDoctor(doctor) => case.opinion_doctor() == Some(doctor),
            CaseQuery::Open { specialty, doctor } => {
                case.status == secondop_types::CaseStatus::Open
                    && match &case.assigned_doctor_id {
                        Some(assigned) => assigned == doctor,
                        None => case.specialty == *specialty,
                    }
            }
        }
    }
}

/// One state change inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Fails with `Duplicate` if the email is taken
    InsertUser(User),
    SetApproval { user_id: UserId, approved: bool },
    UpdateProfile { user_id: UserId, update: ProfileUpdate },
    /// Also releases the user's unclaimed direct requests back to the pool
    DeleteUser { user_id: UserId },
    /// Fails with `InsufficientBalance` if the result would go below zero
    AdjustWallet { user_id: UserId, delta: Money },
    AppendTransaction(Transaction),
    InsertCase(Case),
    /// Fails with `Conflict` unless the stored version equals `expected_version`.
    /// The stored version becomes `expected_version + 1`.
    UpdateCase { case: Case, expected_version: u64 },
    IncrementCasesClosed { user_id: UserId },
    /// Recompute the doctor's rating from the stored cases, including any
    /// case updated earlier in the same batch, and add `bonus_award`
    RecomputeReputation { user_id: UserId, bonus_award: u32 },
    SetLocale(Locale),
}

/// Ordered list of mutations applied as one unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    pub fn with(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// Persistence port shared by the local and remote adapters
#[async_trait]
pub trait Store: Send + Sync {
    fn backend(&self) -> Backend;

    async fn get_user(&self, id: &UserId) -> DbResult<Option<User>>;

    /// Lookup by normalized email
    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>>;

    /// All users in registration order
    async fn list_users(&self) -> DbResult<Vec<User>>;

    async fn get_case(&self, id: &CaseId) -> DbResult<Option<Case>>;

    async fn list_cases(&self, query: &CaseQuery) -> DbResult<Vec<Case>>;

    /// Ledger entries, newest first, optionally for one user
    async fn list_transactions(&self, user_id: Option<&UserId>) -> DbResult<Vec<Transaction>>;

    async fn locale(&self) -> DbResult<Locale>;

    /// Apply a batch atomically
    async fn commit(&self, batch: WriteBatch) -> DbResult<()>;

    async fn health_check(&self) -> DbResult<bool>;

    /// Flush and release resources
    async fn close(&self) -> DbResult<()>;
}
