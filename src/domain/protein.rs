//! Tabular protein dataset types.
//!
//! The dataset is a UniProt TSV export: one row per protein, free-text
//! descriptive columns, numeric mass/length columns, plus a context string
//! synthesized at load time for semantic retrieval. Columns are addressed by
//! sanitized identifiers; user-facing concepts ("mass", "location", ...) map
//! to raw headers through a fixed table and are resolved via the sanitizer.

/// Name of the synthesized retrieval-context column appended at load time.
pub const CONTEXT_COLUMN: &str = "Context_NLP";

/// Fixed mapping of semantic concept -> raw dataset header.
///
/// Predicate and projection rules refer to concepts, never to literal column
/// names; resolution goes through [`sanitize_column_name`] so the identifiers
/// always agree with the ones the loader produced.
const CONCEPT_COLUMNS: &[(&str, &str)] = &[
    ("entry", "Entry"),
    ("entry_name", "Entry Name"),
    ("protein_names", "Protein names"),
    ("organism", "Organism"),
    ("mass", "Mass"),
    ("length", "Length"),
    ("location", "Subcellular location [CC]"),
    ("process", "Gene Ontology (biological process)"),
    ("function", "Gene Ontology (molecular function)"),
];

/// Resolve a semantic concept to its sanitized column identifier.
pub fn resolve_column(concept: &str) -> Option<String> {
    CONCEPT_COLUMNS
        .iter()
        .find(|(key, _)| *key == concept)
        .map(|(_, raw)| sanitize_column_name(raw))
}

/// Turn a raw TSV header into a valid SQL column identifier.
///
/// Special characters become underscores, runs collapse to one, edges are
/// trimmed, and digit-leading names get a `col_` prefix. Applying the
/// function to its own output is a no-op, so concept resolution can be
/// repeated safely. Two distinct raw headers can still collapse to the same
/// identifier; that collision is inherited from the source data pipeline and
/// not resolved here.
pub fn sanitize_column_name(raw: &str) -> String {
    let mut name: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '[' | ']' | '(' | ')' | '-' | '/' | '\\' | '.' | ',' | ';' | ':' => '_',
            other => other,
        })
        .collect();

    while name.contains("__") {
        name = name.replace("__", "_");
    }

    let mut name = name.trim_matches('_').to_string();
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        name = format!("col_{}", name);
    }
    name
}

/// Read-only, row-ordered protein table.
///
/// `columns` holds sanitized identifiers in dataset order (with
/// [`CONTEXT_COLUMN`] appended last); `rows` holds raw cell text in the same
/// order. The table is built once at startup and never mutated afterwards —
/// the embedding matrix is index-aligned with `rows`, and any reordering
/// would silently corrupt retrieval.
#[derive(Debug, Clone)]
pub struct ProteinTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ProteinTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value by row index and sanitized column name; missing columns
    /// read as empty text (documented silent default).
    pub fn value(&self, row: usize, column: &str) -> &str {
        self.column_index(column)
            .and_then(|idx| self.rows.get(row).and_then(|r| r.get(idx)))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn entry_name(&self, row: usize) -> &str {
        match resolve_column("entry_name") {
            Some(column) => {
                // resolve_column allocates; look the index up directly.
                match self.column_index(&column) {
                    Some(idx) => self
                        .rows
                        .get(row)
                        .and_then(|r| r.get(idx))
                        .map(String::as_str)
                        .unwrap_or(""),
                    None => "",
                }
            }
            None => "",
        }
    }

    pub fn context(&self, row: usize) -> &str {
        self.value(row, CONTEXT_COLUMN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_special_characters() {
        assert_eq!(
            sanitize_column_name("Subcellular location [CC]"),
            "Subcellular_location_CC"
        );
        assert_eq!(
            sanitize_column_name("Gene Ontology (biological process)"),
            "Gene_Ontology_biological_process"
        );
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for (_, raw) in CONCEPT_COLUMNS {
            let once = sanitize_column_name(raw);
            assert_eq!(sanitize_column_name(&once), once);
        }
    }

    #[test]
    fn test_sanitize_digit_prefix() {
        assert_eq!(sanitize_column_name("3D structure"), "col_3D_structure");
    }

    #[test]
    fn test_resolve_column_twice_equals_once() {
        let once = resolve_column("location").unwrap();
        assert_eq!(sanitize_column_name(&once), once);
    }

    #[test]
    fn test_resolve_unknown_concept() {
        assert!(resolve_column("no_such_concept").is_none());
    }

    #[test]
    fn test_table_value_lookup() {
        let table = ProteinTable::new(
            vec!["Entry_Name".to_string(), "Mass".to_string()],
            vec![vec!["THRB_HUMAN".to_string(), "70037".to_string()]],
        );
        assert_eq!(table.value(0, "Mass"), "70037");
        assert_eq!(table.value(0, "Missing"), "");
        assert_eq!(table.entry_name(0), "THRB_HUMAN");
    }
}
