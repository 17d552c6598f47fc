//! Case repository

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use secondop_types::{Case, UserId};

use crate::models::{convert_all, DbCase};
use crate::store::CaseQuery;
use crate::{DbError, DbResult};

const CASE_COLUMNS: &str = "id, patient_id, patient_name, specialty, status, symptoms, \
     assigned_doctor_id, opinion, patient_rating, patient_feedback, is_rare, created_at, version";

/// Case repository
pub struct CaseRepo {
    pool: PgPool,
}

impl CaseRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find case by ID
    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Case>> {
        let row = sqlx::query_as::<_, DbCase>(&format!(
            "SELECT {} FROM cases WHERE id = $1",
            CASE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Case::try_from).transpose()
    }

    /// List cases matching a query, newest first
    pub async fn list(&self, query: &CaseQuery) -> DbResult<Vec<Case>> {
        let rows = match query {
            CaseQuery::All => {
                sqlx::query_as::<_, DbCase>(&format!(
                    "SELECT {} FROM cases ORDER BY created_at DESC",
                    CASE_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
            CaseQuery::ByPatient(patient) => {
                sqlx::query_as::<_, DbCase>(&format!(
                    "SELECT {} FROM cases WHERE patient_id = $1 ORDER BY created_at DESC",
                    CASE_COLUMNS
                ))
                .bind(patient.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
            CaseQuery::ByOpinionDoctor(doctor) => {
                sqlx::query_as::<_, DbCase>(&format!(
                    "SELECT {} FROM cases WHERE opinion ->> 'doctor_id' = $1 ORDER BY created_at DESC",
                    CASE_COLUMNS
                ))
                .bind(doctor.as_uuid().to_string())
                .fetch_all(&self.pool)
                .await?
            }
            CaseQuery::Open { specialty, doctor } => {
                sqlx::query_as::<_, DbCase>(&format!(
                    r#"
                    SELECT {} FROM cases
                    WHERE status = 'open'
                      AND (assigned_doctor_id = $2
                           OR (assigned_doctor_id IS NULL AND specialty = $1))
                    ORDER BY created_at DESC
                    "#,
                    CASE_COLUMNS
                ))
                .bind(specialty.as_str())
                .bind(doctor.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
        };

        convert_all(rows)
    }

    // =========================================================================
    // Writes (inside a batch transaction)
    // =========================================================================

    pub async fn insert(conn: &mut PgConnection, case: &Case) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cases
                (id, patient_id, patient_name, specialty, status, symptoms, assigned_doctor_id,
                 opinion, patient_rating, patient_feedback, is_rare, created_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(case.id.as_uuid())
        .bind(case.patient_id.as_uuid())
        .bind(&case.patient_name)
        .bind(case.specialty.as_str())
        .bind(case.status.as_str())
        .bind(&case.symptoms)
        .bind(case.assigned_doctor_id.as_ref().map(|d| *d.as_uuid()))
        .bind(case.opinion.as_ref().map(Json))
        .bind(case.patient_rating.map(i16::from))
        .bind(&case.patient_feedback)
        .bind(case.is_rare)
        .bind(case.created_at)
        .bind(case.version as i64)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Compare-and-set on `version`
    pub async fn update(conn: &mut PgConnection, case: &Case, expected_version: u64) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cases SET
                status = $3,
                assigned_doctor_id = $4,
                opinion = $5,
                patient_rating = $6,
                patient_feedback = $7,
                is_rare = $8,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(case.id.as_uuid())
        .bind(expected_version as i64)
        .bind(case.status.as_str())
        .bind(case.assigned_doctor_id.as_ref().map(|d| *d.as_uuid()))
        .bind(case.opinion.as_ref().map(Json))
        .bind(case.patient_rating.map(i16::from))
        .bind(&case.patient_feedback)
        .bind(case.is_rare)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT version FROM cases WHERE id = $1")
                .bind(case.id.as_uuid())
                .fetch_optional(&mut *conn)
                .await?;
            return Err(match exists {
                Some(_) => DbError::Conflict(case.id.to_string()),
                None => DbError::CaseNotFound(case.id.to_string()),
            });
        }
        Ok(())
    }

    /// Return a deleted doctor's unclaimed direct requests to the pool
    pub async fn release_direct_requests(conn: &mut PgConnection, doctor: &UserId) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE cases
            SET assigned_doctor_id = NULL, version = version + 1
            WHERE assigned_doctor_id = $1 AND status = 'open' AND opinion IS NULL
            "#,
        )
        .bind(doctor.as_uuid())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}
