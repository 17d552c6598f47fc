//! Ledger repository (append-only)

use sqlx::{PgConnection, PgPool};

use secondop_types::{Transaction, UserId};

use crate::models::{convert_all, DbTransaction};
use crate::DbResult;

const TX_COLUMNS: &str = "id, user_id, amount, kind, description, case_id, created_at";

/// Transaction repository
pub struct TransactionRepo {
    pool: PgPool,
}

impl TransactionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Entries newest first, optionally for one user
    pub async fn list(&self, user_id: Option<&UserId>) -> DbResult<Vec<Transaction>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, DbTransaction>(&format!(
                    "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC",
                    TX_COLUMNS
                ))
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DbTransaction>(&format!(
                    "SELECT {} FROM transactions ORDER BY created_at DESC",
                    TX_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        convert_all(rows)
    }

    pub async fn append(conn: &mut PgConnection, tx: &Transaction) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, amount, kind, description, case_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(tx.id.as_uuid())
        .bind(tx.user_id.as_uuid())
        .bind(tx.amount.amount())
        .bind(tx.kind.as_str())
        .bind(&tx.description)
        .bind(tx.case_id.as_ref().map(|c| *c.as_uuid()))
        .bind(tx.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
