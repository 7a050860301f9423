//! TSV dataset ingestion.
//!
//! Reads the UniProt export, sanitizes headers into SQL-safe identifiers and
//! synthesizes the per-record retrieval context as an extra column. Runs once
//! at startup; the resulting [`ProteinTable`] is immutable afterwards.

use crate::domain::error::{AppError, Result};
use crate::domain::protein::{resolve_column, sanitize_column_name, ProteinTable, CONTEXT_COLUMN};
use csv::{ReaderBuilder, Trim};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load a protein table from a tab-separated file.
pub fn load_protein_table(path: &Path) -> Result<ProteinTable> {
    let content = read_with_encoding_fallback(path)?;
    parse_protein_table(&content)
}

/// Parse TSV content into a [`ProteinTable`].
///
/// Split out from file loading so tests can feed content directly.
pub fn parse_protein_table(content: &str) -> Result<ProteinTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::ParseError(format!("Failed to read TSV headers: {}", e)))?
        .clone();

    let mut columns: Vec<String> = headers.iter().map(sanitize_column_name).collect();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::ParseError(format!("Failed to parse TSV row {}: {}", index + 1, e))
        })?;

        // Short records read as empty cells rather than failing the load.
        let row: Vec<String> = (0..headers.len())
            .map(|idx| record.get(idx).unwrap_or("").to_string())
            .collect();
        rows.push(row);
    }

    let context_rows: Vec<String> = rows
        .iter()
        .map(|row| context_text(&columns, row))
        .collect();
    for (row, context) in rows.iter_mut().zip(context_rows) {
        row.push(context);
    }
    columns.push(CONTEXT_COLUMN.to_string());

    debug!(
        rows = rows.len(),
        columns = columns.len(),
        "Parsed protein dataset"
    );

    Ok(ProteinTable::new(columns, rows))
}

/// Synthesize the retrieval context for one record.
///
/// Concatenates the key descriptive fields with fixed labels; columns missing
/// from the source contribute empty text.
fn context_text(columns: &[String], row: &[String]) -> String {
    let field = |concept: &str| -> String {
        resolve_column(concept)
            .and_then(|name| columns.iter().position(|c| *c == name))
            .and_then(|idx| row.get(idx))
            .cloned()
            .unwrap_or_default()
    };

    format!(
        "Protein: {}. Organism: {}. Subcellular Location: {}. Biological Process: {}. Molecular Function: {}",
        field("protein_names"),
        field("organism"),
        field("location"),
        field("process"),
        field("function"),
    )
}

/// Read a file as UTF-8, falling back to Windows-1252 for legacy exports.
fn read_with_encoding_fallback(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;

    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(err) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(err.as_bytes());
            Ok(decoded.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TSV: &str = "Entry\tEntry Name\tProtein names\tOrganism\tLength\tMass\tSubcellular location [CC]\tGene Ontology (biological process)\tGene Ontology (molecular function)\n\
P00734\tTHRB_HUMAN\tProthrombin\tHomo sapiens\t622\t70037\tSecreted\tblood coagulation\tserine-type endopeptidase activity\n\
P01008\tANT3_HUMAN\tAntithrombin-III\tHomo sapiens\t464\t52602\tSecreted\tblood coagulation\tserine-type endopeptidase inhibitor activity\n";

    #[test]
    fn test_headers_are_sanitized() {
        let table = parse_protein_table(SAMPLE_TSV).unwrap();
        assert!(table
            .columns
            .contains(&"Subcellular_location_CC".to_string()));
        assert!(table
            .columns
            .contains(&"Gene_Ontology_biological_process".to_string()));
        assert_eq!(table.columns.last().unwrap(), CONTEXT_COLUMN);
    }

    #[test]
    fn test_context_synthesis() {
        let table = parse_protein_table(SAMPLE_TSV).unwrap();
        assert_eq!(table.len(), 2);
        let context = table.context(0);
        assert!(context.starts_with("Protein: Prothrombin. Organism: Homo sapiens."));
        assert!(context.contains("Biological Process: blood coagulation"));
    }

    #[test]
    fn test_missing_column_reads_empty() {
        let table = parse_protein_table("Entry\tEntry Name\nP1\tX_HUMAN\n").unwrap();
        assert!(table.context(0).contains("Protein: . Organism: ."));
    }

    #[test]
    fn test_short_record_pads_cells() {
        let table = parse_protein_table("Entry\tEntry Name\tMass\nP1\tX_HUMAN\n").unwrap();
        assert_eq!(table.value(0, "Mass"), "");
    }
}
