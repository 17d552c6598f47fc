//! Scalar settings repository

use sqlx::{PgConnection, PgPool};

use secondop_types::Locale;

use crate::DbResult;

const LOCALE_KEY: &str = "locale";

pub struct SettingRepo {
    pool: PgPool,
}

impl SettingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stored locale, or the default when unset
    pub async fn locale(&self) -> DbResult<Locale> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
            .bind(LOCALE_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match value {
            Some(v) => Ok(v.parse()?),
            None => Ok(Locale::default()),
        }
    }

    pub async fn set_locale(conn: &mut PgConnection, locale: Locale) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(LOCALE_KEY)
        .bind(locale.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
