//! SQL execution against the materialized protein database.
//!
//! Every call opens its own connection and releases it before returning.
//! SQLite handles are not safe to share across concurrent requests, so no
//! connection is cached or reused; per-call isolation replaces locking.

use crate::domain::error::{AppError, Result};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row, TypeInfo};
use std::path::{Path, PathBuf};

/// Ordered rows with named columns, cells already normalized to plain JSON
/// values. The success half of an execution outcome; the failure half is the
/// `AppError` carried by `Result`.
#[derive(Debug, Clone)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

pub struct QueryExecutor {
    db_path: PathBuf,
}

impl QueryExecutor {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }

    /// Run one SELECT statement on a fresh read-only connection.
    ///
    /// The connection lives only for this call; it is closed before either
    /// arm returns, so a failed statement cannot leak a handle into a later
    /// request.
    pub async fn execute(&self, sql: &str) -> Result<QueryTable> {
        let options = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .read_only(true);

        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to open database: {}", e)))?;

        let fetched = sqlx::query(sql).fetch_all(&mut conn).await;
        let _ = conn.close().await;

        let rows = fetched
            .map_err(|e| AppError::DatabaseError(format!("SQL execution error: {}", e)))?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut cells = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                cells.push(decode_cell(row, idx)?);
            }
            data.push(cells);
        }

        Ok(QueryTable {
            columns,
            rows: data,
        })
    }
}

/// Decode one SQLite cell into a portable JSON value.
///
/// Cells are normalized by declared type, so a database INTEGER arrives at
/// the API boundary as a plain JSON integer, indistinguishable from a native
/// one; non-finite REALs become null.
fn decode_cell(row: &SqliteRow, idx: usize) -> Result<Value> {
    let type_name = row
        .column(idx)
        .type_info()
        .name()
        .to_ascii_uppercase();

    let decode_err =
        |e: sqlx::Error| AppError::DatabaseError(format!("Failed to decode column {}: {}", idx, e));

    match type_name.as_str() {
        "INTEGER" => {
            let value: Option<i64> = row.try_get(idx).map_err(decode_err)?;
            Ok(value.map(Value::from).unwrap_or(Value::Null))
        }
        "REAL" => {
            let value: Option<f64> = row.try_get(idx).map_err(decode_err)?;
            Ok(value
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        "BOOLEAN" => {
            let value: Option<bool> = row.try_get(idx).map_err(decode_err)?;
            Ok(value.map(Value::from).unwrap_or(Value::Null))
        }
        _ => {
            let value: Option<String> = row.try_get(idx).map_err(decode_err)?;
            Ok(value.map(Value::from).unwrap_or(Value::Null))
        }
    }
}
