//! Execution-result shaping for the API boundary.

use crate::application::use_cases::query_executor::QueryTable;
use crate::domain::error::{AppError, Result};
use crate::domain::protein::resolve_column;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

/// Result column the translator's only aggregate produces.
const COUNT_COLUMN: &str = "COUNT(*)";

/// Columns worth returning for row results, in display order. Resolved from
/// concepts once; columns absent from a given result are skipped.
static KEY_COLUMNS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "entry",
        "entry_name",
        "protein_names",
        "mass",
        "length",
        "location",
    ]
    .iter()
    .filter_map(|concept| resolve_column(concept))
    .collect()
});

/// Bounded, portable result shape: `count` always reflects the total match
/// count, `data` at most one page of rows.
#[derive(Debug, Clone)]
pub struct FormattedResult {
    pub count: i64,
    pub data: Vec<Value>,
    pub message: String,
}

pub struct ResultFormatter {
    top_results: usize,
}

impl ResultFormatter {
    pub fn new(top_results: usize) -> Self {
        Self { top_results }
    }

    pub fn format(&self, table: &QueryTable) -> Result<FormattedResult> {
        if table.columns.iter().any(|c| c == COUNT_COLUMN) {
            return self.format_count(table);
        }
        Ok(self.format_rows(table))
    }

    fn format_count(&self, table: &QueryTable) -> Result<FormattedResult> {
        let count = table
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                AppError::Internal("Aggregate result is missing its count value".to_string())
            })?;

        Ok(FormattedResult {
            count,
            data: Vec::new(),
            message: success_message(count),
        })
    }

    fn format_rows(&self, table: &QueryTable) -> FormattedResult {
        // (position in result, column name) for each interesting column present.
        let projection: Vec<(usize, &String)> = KEY_COLUMNS
            .iter()
            .filter_map(|name| {
                table
                    .columns
                    .iter()
                    .position(|c| c == name)
                    .map(|idx| (idx, name))
            })
            .collect();

        let count = table.rows.len() as i64;
        let data: Vec<Value> = table
            .rows
            .iter()
            .take(self.top_results)
            .map(|row| {
                let mut object = Map::new();
                for (idx, name) in &projection {
                    let cell = row.get(*idx).cloned().unwrap_or(Value::Null);
                    object.insert((*name).clone(), cell);
                }
                Value::Object(object)
            })
            .collect();

        FormattedResult {
            count,
            data,
            message: success_message(count),
        }
    }
}

fn success_message(count: i64) -> String {
    format!("Query executed successfully, found {} records.", count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn formatter() -> ResultFormatter {
        ResultFormatter::new(5)
    }

    #[test]
    fn test_count_result_formats_to_scalar() {
        let table = QueryTable {
            columns: vec!["COUNT(*)".to_string()],
            rows: vec![vec![json!(42)]],
        };
        let formatted = formatter().format(&table).unwrap();
        assert_eq!(formatted.count, 42);
        assert!(formatted.data.is_empty());
        assert_eq!(
            formatted.message,
            "Query executed successfully, found 42 records."
        );
    }

    #[test]
    fn test_count_result_with_bad_shape_is_error() {
        let table = QueryTable {
            columns: vec!["COUNT(*)".to_string()],
            rows: vec![],
        };
        assert!(formatter().format(&table).is_err());
    }

    #[test]
    fn test_rows_truncate_but_count_total() {
        let rows: Vec<Vec<Value>> = (0..10)
            .map(|i| vec![json!(format!("P{:05}", i)), json!(i * 1000)])
            .collect();
        let table = QueryTable {
            columns: vec!["Entry".to_string(), "Mass".to_string()],
            rows,
        };
        let formatted = formatter().format(&table).unwrap();
        assert_eq!(formatted.count, 10);
        assert_eq!(formatted.data.len(), 5);
    }

    #[test]
    fn test_projection_keeps_only_present_key_columns() {
        let table = QueryTable {
            columns: vec![
                "Entry_Name".to_string(),
                "Mass".to_string(),
                "Context_NLP".to_string(),
            ],
            rows: vec![vec![json!("THRB_HUMAN"), json!(70037), json!("ctx")]],
        };
        let formatted = formatter().format(&table).unwrap();
        let row = formatted.data[0].as_object().unwrap();
        assert_eq!(row.get("Entry_Name"), Some(&json!("THRB_HUMAN")));
        assert_eq!(row.get("Mass"), Some(&json!(70037)));
        // Non-key columns are projected away.
        assert!(!row.contains_key("Context_NLP"));
    }

    #[test]
    fn test_integer_cells_stay_plain_integers() {
        let table = QueryTable {
            columns: vec!["Mass".to_string()],
            rows: vec![vec![json!(123)]],
        };
        let formatted = formatter().format(&table).unwrap();
        assert_eq!(formatted.data[0]["Mass"], json!(123));
    }

    #[test]
    fn test_empty_row_result() {
        let table = QueryTable {
            columns: Vec::new(),
            rows: Vec::new(),
        };
        let formatted = formatter().format(&table).unwrap();
        assert_eq!(formatted.count, 0);
        assert!(formatted.data.is_empty());
    }
}
