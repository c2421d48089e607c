//! SQLite connection for the execution gateway.
//!
//! Each statement runs on a connection checked out of a small pool. The
//! checkout is returned to the pool when it is dropped, so every exit path
//! (success, driver error, cancelled future) releases it. Statements run in
//! autocommit mode.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Column, Executor, Row, SqlitePool, TypeInfo, ValueRef};

use super::gateway::{QueryRows, SqlConnection};
use crate::core::config::AppPaths;
use crate::core::errors::EngineError;

pub struct SqliteDatabase {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteDatabase {
    pub async fn new(paths: &AppPaths) -> Result<Self, EngineError> {
        let db_path = paths.user_data_dir.join("engine.db");
        Self::with_path(db_path).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, EngineError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(EngineError::database)?;

        tracing::info!("SQLite database ready at {}", db_path.display());
        Ok(Self { pool, db_path })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn column_names(&self, sql: &str, rows: &[SqliteRow]) -> Vec<String> {
        if let Some(first) = rows.first() {
            return first
                .columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect();
        }

        // Empty result: ask the driver for the statement's shape instead.
        match self.pool.describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect(),
            Err(e) => {
                tracing::debug!("Could not describe statement columns: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SqlConnection for SqliteDatabase {
    async fn fetch_all(&self, sql: &str) -> Result<QueryRows, EngineError> {
        let rows = {
            let mut conn = self.pool.acquire().await?;
            sqlx::query(sql).fetch_all(&mut *conn).await?
        };

        let columns = self.column_names(sql, &rows).await;
        let rows = rows
            .iter()
            .map(row_values)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryRows { columns, rows })
    }
}

/// Converts one row by the storage class of each value.
fn row_values(row: &SqliteRow) -> Result<Vec<Value>, EngineError> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let storage = {
            let raw = row.try_get_raw(idx)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_string())
            }
        };

        let value = match storage.as_deref() {
            None | Some("NULL") => Value::Null,
            Some("INTEGER") => Value::from(row.try_get::<i64, _>(idx)?),
            Some("REAL") => Value::from(row.try_get::<f64, _>(idx)?),
            Some("BLOB") => Value::String(hex::encode(row.try_get::<Vec<u8>, _>(idx)?)),
            Some(_) => Value::String(row.try_get::<String, _>(idx)?),
        };
        values.push(value);
    }
    Ok(values)
}
