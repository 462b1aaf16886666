//! PostgreSQL rate store.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{error, info};
use rust_decimal::Decimal;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

use super::{
    CODE_WIDTH, CodeColumnAction, RateConnector, RateStore, TABLE_NAME, UNIQUE_CONSTRAINT,
    plan_code_column,
};
use crate::config::DbConfig;
use crate::currency_rate::{CurrencyRateRecord, UpsertOutcome};
use crate::error::StoreError;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS currency_rates (
        id SERIAL PRIMARY KEY,
        date DATE NOT NULL,
        currency_code VARCHAR(10) NOT NULL,
        rate DECIMAL NOT NULL
    )"#;

const CODE_COLUMN_INFO: &str = r#"
    SELECT data_type::text, character_maximum_length::int4
    FROM information_schema.columns
    WHERE table_schema = current_schema()
      AND table_name = 'currency_rates'
      AND column_name = 'currency_code'"#;

const WIDEN_CODE_COLUMN: &str =
    r#"ALTER TABLE currency_rates ALTER COLUMN currency_code TYPE VARCHAR(10)"#;

const CONSTRAINT_EXISTS: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM pg_constraint
        WHERE conrelid = 'currency_rates'::regclass AND conname = $1
    )"#;

const ADD_CONSTRAINT: &str = r#"
    ALTER TABLE currency_rates
    ADD CONSTRAINT uq_date_currency_code UNIQUE (date, currency_code)"#;

const INSERT_RATE: &str = r#"
    INSERT INTO currency_rates (date, currency_code, rate)
    VALUES ($1, $2, $3)
    ON CONFLICT (date, currency_code) DO NOTHING"#;

/// Opens PostgreSQL connections from [`DbConfig`].
pub struct PgConnector {
    db: DbConfig,
}

impl PgConnector {
    pub fn new(db: DbConfig) -> Self {
        Self { db }
    }

    fn connect_options(&self) -> Result<PgConnectOptions, StoreError> {
        let host = self.db.host.as_deref().ok_or(StoreError::MissingCredential("DB_HOST"))?;
        let name = self.db.name.as_deref().ok_or(StoreError::MissingCredential("DB_NAME"))?;
        let user = self.db.user.as_deref().ok_or(StoreError::MissingCredential("DB_USER"))?;
        let password = self
            .db
            .password
            .as_deref()
            .ok_or(StoreError::MissingCredential("DB_PASSWORD"))?;

        Ok(PgConnectOptions::new()
            .host(host)
            .port(self.db.port)
            .database(name)
            .username(user)
            .password(password))
    }
}

#[async_trait]
impl RateConnector for PgConnector {
    type Store = PgStore;

    async fn connect(&self) -> Result<PgStore, StoreError> {
        let options = self.connect_options()?;
        let conn = PgConnection::connect_with(&options).await.map_err(|e| {
            error!("Error connecting to PostgreSQL: {}", e);
            StoreError::Connection(e.to_string())
        })?;
        info!("Successfully connected to the PostgreSQL database.");
        Ok(PgStore::new(conn))
    }
}

/// A single PostgreSQL connection used for one run.
pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    pub fn new(conn: PgConnection) -> Self {
        Self { conn }
    }

    /// Opens a store from a connection URL.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let conn = PgConnection::connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::new(conn))
    }

    /// Returns the underlying connection.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.conn
    }

    /// Declared type and width of the `currency_code` column, if the table exists.
    pub async fn code_column(&mut self) -> Result<Option<(String, Option<i32>)>, StoreError> {
        sqlx::query_as(CODE_COLUMN_INFO)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))
    }

    /// All stored records, oldest first.
    pub async fn records(&mut self) -> Result<Vec<CurrencyRateRecord>, StoreError> {
        sqlx::query_as("SELECT id, date, currency_code, rate FROM currency_rates ORDER BY id")
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

async fn apply_schema(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_TABLE).execute(&mut *conn).await?;

    let column: Option<(String, Option<i32>)> = sqlx::query_as(CODE_COLUMN_INFO)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some((data_type, max_length)) = column {
        match plan_code_column(&data_type, max_length) {
            CodeColumnAction::Widen => {
                info!("Altering currency_code column from VARCHAR(3) to VARCHAR({CODE_WIDTH})...");
                sqlx::query(WIDEN_CODE_COLUMN).execute(&mut *conn).await?;
                info!("Successfully altered currency_code column type to VARCHAR({CODE_WIDTH}).");
            }
            CodeColumnAction::AlreadyCurrent => {
                info!("currency_code column is already VARCHAR({CODE_WIDTH}).");
            }
            CodeColumnAction::Leave => {
                info!("currency_code column type is {data_type}({max_length:?}), not altering.");
            }
        }
    }

    let has_constraint: bool = sqlx::query_scalar(CONSTRAINT_EXISTS)
        .bind(UNIQUE_CONSTRAINT)
        .fetch_one(&mut *conn)
        .await?;
    if has_constraint {
        info!("Unique constraint {UNIQUE_CONSTRAINT} already exists on {TABLE_NAME} table.");
    } else {
        sqlx::query(ADD_CONSTRAINT).execute(&mut *conn).await?;
        info!("Added unique constraint {UNIQUE_CONSTRAINT} to {TABLE_NAME} table.");
    }

    Ok(())
}

#[async_trait]
impl RateStore for PgStore {
    async fn ensure_schema(&mut self) -> Result<(), StoreError> {
        let schema_err = |e: sqlx::Error| {
            error!("Error initializing schema: {}", e);
            StoreError::Schema(e.to_string())
        };

        let mut tx = self.conn.begin().await.map_err(schema_err)?;
        if let Err(e) = apply_schema(&mut tx).await {
            let _ = tx.rollback().await;
            return Err(schema_err(e));
        }
        tx.commit().await.map_err(schema_err)?;

        info!("Database schema initialized successfully ({TABLE_NAME} table created/verified).");
        Ok(())
    }

    async fn upsert(
        &mut self,
        date: NaiveDate,
        code: &str,
        rate: Decimal,
    ) -> Result<UpsertOutcome, StoreError> {
        let write_err = |e: sqlx::Error| {
            error!("Error inserting currency rate for {} on {}: {}", code, date, e);
            StoreError::Write {
                code: code.to_string(),
                message: e.to_string(),
            }
        };

        let mut tx = self.conn.begin().await.map_err(write_err)?;
        let result = sqlx::query(INSERT_RATE)
            .bind(date)
            .bind(code)
            .bind(rate)
            .execute(&mut *tx)
            .await;
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(write_err(e));
            }
        };
        tx.commit().await.map_err(write_err)?;

        if result.rows_affected() > 0 {
            info!("Inserted rate for {} on {}: {}", code, date, rate);
            Ok(UpsertOutcome::Inserted)
        } else {
            info!("Rate for {} on {} already exists. Skipped insertion.", code, date);
            Ok(UpsertOutcome::SkippedDuplicate)
        }
    }

    async fn close(self) -> Result<(), StoreError> {
        self.conn
            .close()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!("Database connection closed.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(host: Option<&str>, password: Option<&str>) -> DbConfig {
        DbConfig {
            host: host.map(str::to_string),
            port: 5432,
            name: Some("rates".to_string()),
            user: Some("app".to_string()),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn test_connect_options_from_config() {
        let connector = PgConnector::new(db(Some("localhost"), Some("pw")));
        let options = connector.connect_options().unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_database(), Some("rates"));
        assert_eq!(options.get_username(), "app");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_connecting() {
        let err = PgConnector::new(db(None, Some("pw"))).connect().await.err().unwrap();
        assert!(matches!(err, StoreError::MissingCredential("DB_HOST")));

        let err = PgConnector::new(db(Some("localhost"), None)).connect().await.err().unwrap();
        assert!(matches!(err, StoreError::MissingCredential("DB_PASSWORD")));
    }
}
