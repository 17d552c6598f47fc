//! Database models - mapped from PostgreSQL tables

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use secondop_types::{
    Case, CaseId, DoctorProfile, Money, Opinion, Role, Transaction, TransactionId, User, UserId,
};

use crate::error::{DbError, DbResult};

// ============================================================================
// User Models
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub wallet_balance: Decimal,
    pub opening_balance: Decimal,
    pub is_approved: bool,
    pub avatar_url: Option<String>,
    pub specialty: Option<String>,
    pub hospital: Option<String>,
    pub country: Option<String>,
    pub linkedin: Option<String>,
    pub bio: Option<String>,
    pub rating: Decimal,
    pub cases_closed: i32,
    pub bonus_points: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = DbError;

    fn try_from(row: DbUser) -> DbResult<Self> {
        let role: Role = row.role.parse()?;
        let doctor = match (role, row.specialty) {
            (Role::Doctor, Some(specialty)) => Some(DoctorProfile {
                specialty: specialty.parse()?,
                hospital: row.hospital,
                country: row.country,
                linkedin: row.linkedin,
                bio: row.bio,
                rating: row.rating,
                cases_closed: to_u32(row.cases_closed)?,
                bonus_points: to_u32(row.bonus_points)?,
            }),
            (Role::Doctor, None) => {
                return Err(DbError::InvalidData(format!("doctor {} has no specialty", row.id)))
            }
            _ => None,
        };
        Ok(User {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            role,
            wallet_balance: Money::new(row.wallet_balance)?,
            opening_balance: Money::new(row.opening_balance)?,
            is_approved: row.is_approved,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
            doctor,
        })
    }
}

fn to_u32(v: i32) -> DbResult<u32> {
    u32::try_from(v).map_err(|_| DbError::InvalidData(format!("negative counter {}", v)))
}

// ============================================================================
// Case Models
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct DbCase {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub specialty: String,
    pub status: String,
    pub symptoms: String,
    pub assigned_doctor_id: Option<Uuid>,
    pub opinion: Option<Json<Opinion>>,
    pub patient_rating: Option<i16>,
    pub patient_feedback: Option<String>,
    pub is_rare: bool,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl TryFrom<DbCase> for Case {
    type Error = DbError;

    fn try_from(row: DbCase) -> DbResult<Self> {
        Ok(Case {
            id: CaseId::from_uuid(row.id),
            patient_id: UserId::from_uuid(row.patient_id),
            patient_name: row.patient_name,
            specialty: row.specialty.parse()?,
            status: row.status.parse()?,
            symptoms: row.symptoms,
            assigned_doctor_id: row.assigned_doctor_id.map(UserId::from_uuid),
            opinion: row.opinion.map(|Json(opinion)| opinion),
            patient_rating: row
                .patient_rating
                .map(|r| {
                    u8::try_from(r).map_err(|_| DbError::InvalidData(format!("rating {}", r)))
                })
                .transpose()?,
            patient_feedback: row.patient_feedback,
            is_rare: row.is_rare,
            created_at: row.created_at,
            version: u64::try_from(row.version)
                .map_err(|_| DbError::InvalidData(format!("version {}", row.version)))?,
        })
    }
}

// ============================================================================
// Ledger Models
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct DbTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub kind: String,
    pub description: String,
    pub case_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbTransaction> for Transaction {
    type Error = DbError;

    fn try_from(row: DbTransaction) -> DbResult<Self> {
        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            amount: Money::new(row.amount)?,
            kind: row.kind.parse()?,
            description: row.description,
            case_id: row.case_id.map(CaseId::from_uuid),
            created_at: row.created_at,
        })
    }
}

/// Convert a batch of rows, failing on the first malformed one
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> DbResult<Vec<T>>
where
    T: TryFrom<R, Error = DbError>,
{
    rows.into_iter().map(T::try_from).collect()
}
