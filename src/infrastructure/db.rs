//! SQLite materialization of the protein table.
//!
//! The dataset is written to a throwaway database file once at startup.
//! Request-time execution never touches the handle used here; it reopens the
//! file per call (see `query_executor`), so nothing created in this module
//! outlives initialization.

use crate::domain::error::{AppError, Result};
use crate::domain::protein::{resolve_column, ProteinTable};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::fs;
use std::path::Path;
use tracing::info;

/// Create the database file and bulk-load the protein table into it.
pub async fn init_database(db_path: &Path, table_name: &str, proteins: &ProteinTable) -> Result<()> {
    if db_path.exists() {
        // Leftover from a previous run with the same pid; rebuild from scratch.
        fs::remove_file(db_path)
            .map_err(|e| AppError::IoError(format!("Failed to remove stale database: {}", e)))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let mut conn = SqliteConnection::connect_with(&options)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create database: {}", e)))?;

    let numeric_columns = numeric_column_names();
    let column_defs: Vec<String> = proteins
        .columns
        .iter()
        .map(|column| {
            let sql_type = if numeric_columns.contains(column) {
                "INTEGER"
            } else {
                "TEXT"
            };
            format!("\"{}\" {}", column, sql_type)
        })
        .collect();

    sqlx::query(&format!(
        "CREATE TABLE \"{}\" ({})",
        table_name,
        column_defs.join(", ")
    ))
    .execute(&mut conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to create table: {}", e)))?;

    let placeholders = vec!["?"; proteins.columns.len()].join(", ");
    let insert_sql = format!("INSERT INTO \"{}\" VALUES ({})", table_name, placeholders);

    let mut tx = conn
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

    for row in &proteins.rows {
        let mut query = sqlx::query(&insert_sql);
        for (column, value) in proteins.columns.iter().zip(row) {
            if numeric_columns.contains(column) {
                query = query.bind(parse_numeric(value));
            } else {
                query = query.bind(value);
            }
        }
        query
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert row: {}", e)))?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to commit rows: {}", e)))?;

    let _ = conn.close().await;

    info!(
        rows = proteins.len(),
        table = table_name,
        path = %db_path.display(),
        "Materialized protein table"
    );
    Ok(())
}

/// Columns stored as INTEGER so numeric predicates compare numerically.
fn numeric_column_names() -> Vec<String> {
    ["mass", "length"]
        .iter()
        .filter_map(|concept| resolve_column(concept))
        .collect()
}

/// Comma-tolerant integer parse; unparseable values load as NULL.
pub fn parse_numeric(value: &str) -> Option<i64> {
    let cleaned: String = value.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::dataset::parse_protein_table;

    fn temp_db(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("bioquery-test-{}-{}.db", name, std::process::id()))
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("70037"), Some(70037));
        assert_eq!(parse_numeric("83,268"), Some(83268));
        assert_eq!(parse_numeric(" 52602 "), Some(52602));
        assert_eq!(parse_numeric("n/a"), None);
        assert_eq!(parse_numeric(""), None);
    }

    #[tokio::test]
    async fn test_init_database_loads_rows() {
        let table = parse_protein_table(
            "Entry\tEntry Name\tMass\nP00734\tTHRB_HUMAN\t70,037\nP01008\tANT3_HUMAN\t52602\n",
        )
        .unwrap();
        let db_path = temp_db("init");

        init_database(&db_path, "proteins", &table).await.unwrap();

        let options = SqliteConnectOptions::new().filename(&db_path);
        let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM proteins WHERE Mass > 60000")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let _ = conn.close().await;
        let _ = fs::remove_file(&db_path);
    }
}
