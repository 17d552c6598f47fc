//! User and wallet repository

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use secondop_types::{mean_rating, Money, ProfileUpdate, User, UserId};

use crate::models::{convert_all, DbUser};
use crate::{DbError, DbResult};

const USER_COLUMNS: &str = "id, name, email, role, wallet_balance, opening_balance, is_approved, \
     avatar_url, specialty, hospital, country, linkedin, bio, rating, cases_closed, bonus_points, \
     created_at";

/// User repository
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Find user by normalized email
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// All users in registration order
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let rows = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {} FROM users ORDER BY seq ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    // =========================================================================
    // Writes (inside a batch transaction)
    // =========================================================================

    pub async fn insert(conn: &mut PgConnection, user: &User) -> DbResult<()> {
        let doctor = user.doctor.as_ref();
        let result = sqlx::query(
            r#"
            INSERT INTO users
                (id, name, email, role, wallet_balance, opening_balance, is_approved, avatar_url,
                 specialty, hospital, country, linkedin, bio, rating, cases_closed, bonus_points,
                 created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.wallet_balance.amount())
        .bind(user.opening_balance.amount())
        .bind(user.is_approved)
        .bind(&user.avatar_url)
        .bind(doctor.map(|d| d.specialty.as_str()))
        .bind(doctor.and_then(|d| d.hospital.clone()))
        .bind(doctor.and_then(|d| d.country.clone()))
        .bind(doctor.and_then(|d| d.linkedin.clone()))
        .bind(doctor.and_then(|d| d.bio.clone()))
        .bind(doctor.map(|d| d.rating).unwrap_or(Decimal::ZERO))
        .bind(doctor.map(|d| d.cases_closed as i32).unwrap_or(0))
        .bind(doctor.map(|d| d.bonus_points as i32).unwrap_or(0))
        .bind(user.created_at)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.constraint() == Some("users_email_key") => {
                Err(DbError::Duplicate(user.email.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set_approval(conn: &mut PgConnection, id: &UserId, approved: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_approved = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(approved)
            .execute(&mut *conn)
            .await?;
        expect_row(result.rows_affected(), id)
    }

    /// Apply a profile patch; NULL parameters keep the stored value
    pub async fn update_profile(
        conn: &mut PgConnection,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                name       = COALESCE($2, name),
                avatar_url = COALESCE($3, avatar_url),
                hospital   = CASE WHEN role = 'doctor' THEN COALESCE($4, hospital) ELSE hospital END,
                country    = CASE WHEN role = 'doctor' THEN COALESCE($5, country) ELSE country END,
                linkedin   = CASE WHEN role = 'doctor' THEN COALESCE($6, linkedin) ELSE linkedin END,
                bio        = CASE WHEN role = 'doctor' THEN COALESCE($7, bio) ELSE bio END
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.name.as_ref().map(|n| n.trim().to_string()))
        .bind(&update.avatar_url)
        .bind(&update.hospital)
        .bind(&update.country)
        .bind(&update.linkedin)
        .bind(&update.bio)
        .execute(&mut *conn)
        .await?;
        expect_row(result.rows_affected(), id)
    }

    pub async fn delete(conn: &mut PgConnection, id: &UserId) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *conn)
            .await?;
        expect_row(result.rows_affected(), id)
    }

    /// Lock the wallet row, check the result stays non-negative, and apply
    pub async fn adjust_wallet(conn: &mut PgConnection, id: &UserId, delta: Money) -> DbResult<Money> {
        let current: Option<Decimal> =
            sqlx::query_scalar("SELECT wallet_balance FROM users WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *conn)
                .await?;
        let available = Money::new(current.ok_or_else(|| DbError::UserNotFound(id.to_string()))?)?;

        let next = available
            .checked_add(delta)
            .ok_or_else(|| DbError::BalanceOverflow {
                user_id: id.to_string(),
            })?;
        if next.is_negative() {
            return Err(DbError::InsufficientBalance {
                user_id: id.to_string(),
                requested: delta.abs(),
                available,
            });
        }

        sqlx::query("UPDATE users SET wallet_balance = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(next.amount())
            .execute(&mut *conn)
            .await?;

        Ok(next)
    }

    pub async fn increment_cases_closed(conn: &mut PgConnection, id: &UserId) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE users SET cases_closed = cases_closed + 1 WHERE id = $1 AND role = 'doctor'",
        )
        .bind(id.as_uuid())
        .execute(&mut *conn)
        .await?;
        expect_row(result.rows_affected(), id)
    }

    /// Lock the doctor row, then average every rated closed case they
    /// answered. Taking the lock first means a concurrent rating of another
    /// case commits before this read or waits for this transaction.
    pub async fn recompute_reputation(
        conn: &mut PgConnection,
        id: &UserId,
        bonus_award: u32,
    ) -> DbResult<()> {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 AND role = 'doctor' FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *conn)
                .await?;
        if locked.is_none() {
            return Err(DbError::UserNotFound(id.to_string()));
        }

        let stars: Vec<i16> = sqlx::query_scalar(
            r#"
            SELECT patient_rating FROM cases
            WHERE opinion ->> 'doctor_id' = $1
              AND status = 'closed'
              AND patient_rating IS NOT NULL
            "#,
        )
        .bind(id.as_uuid().to_string())
        .fetch_all(&mut *conn)
        .await?;
        let rating = mean_rating(stars.into_iter().filter_map(|s| u8::try_from(s).ok()))
            .unwrap_or(Decimal::ZERO);

        sqlx::query(
            r#"
            UPDATE users
            SET rating = $2, bonus_points = bonus_points + $3
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(rating)
        .bind(bonus_award as i32)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

fn expect_row(rows: u64, id: &UserId) -> DbResult<()> {
    if rows == 0 {
        Err(DbError::UserNotFound(id.to_string()))
    } else {
        Ok(())
    }
}
