//! Rule-based natural-language-to-SQL translation.
//!
//! Translation is a pure function over a declarative rule table: each rule
//! names its trigger phrases, the concept whose column it constrains and the
//! predicate template to append. Rules are independent and AND-combinable;
//! trigger order in the input does not matter. No escaping is applied to the
//! query-derived numeric literal — the input surface is closed and
//! non-adversarial, and the translator only ever emits SELECT statements.

use crate::domain::protein::resolve_column;
use tracing::debug;

/// Threshold used when a mass query names no number.
pub const DEFAULT_MASS_THRESHOLD: i64 = 50_000;

/// WHERE-clause fragment a rule appends when triggered.
enum PredicateTemplate {
    /// `AND <column> LIKE '<pattern>'`
    Like(&'static str),
    /// `AND <column> > <n>`, n taken from the query or the default.
    GreaterThanNumber { default: i64 },
}

struct PredicateRule {
    /// Any of these phrases activates the rule.
    triggers: &'static [&'static str],
    /// If non-empty, at least one of these must also appear.
    qualifiers: &'static [&'static str],
    /// Concept resolved to a column identifier at translation time.
    concept: &'static str,
    template: PredicateTemplate,
}

static PREDICATE_RULES: &[PredicateRule] = &[
    PredicateRule {
        triggers: &["mass"],
        qualifiers: &["above", "greater than"],
        concept: "mass",
        template: PredicateTemplate::GreaterThanNumber {
            default: DEFAULT_MASS_THRESHOLD,
        },
    },
    PredicateRule {
        triggers: &["secreted", "location"],
        qualifiers: &[],
        concept: "location",
        template: PredicateTemplate::Like("%Secreted%"),
    },
    PredicateRule {
        triggers: &["coagulation", "clotting"],
        qualifiers: &[],
        concept: "process",
        template: PredicateTemplate::Like("%coagulation%"),
    },
    PredicateRule {
        triggers: &["inhibitor", "protease"],
        qualifiers: &[],
        concept: "function",
        template: PredicateTemplate::Like("%inhibitor activity%"),
    },
    PredicateRule {
        triggers: &["complement"],
        qualifiers: &[],
        concept: "process",
        template: PredicateTemplate::Like("%complement%"),
    },
];

/// Concepts projected when the user asks for protein names.
static NAME_PROJECTION: &[&str] = &["entry_name", "protein_names", "mass", "location"];

pub struct SqlTranslator {
    table_name: String,
}

impl SqlTranslator {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
        }
    }

    /// Translate a natural-language query into a SELECT statement.
    ///
    /// Deterministic and case-insensitive; unrecognized queries fall through
    /// to `SELECT * ... WHERE 1=1`.
    pub fn translate(&self, text_query: &str) -> String {
        let query = text_query.to_lowercase();

        let mut sql = format!(
            "SELECT {} FROM {} WHERE 1=1",
            self.select_clause(&query),
            self.table_name
        );

        for rule in PREDICATE_RULES {
            if !contains_any(&query, rule.triggers) {
                continue;
            }
            if !rule.qualifiers.is_empty() && !contains_any(&query, rule.qualifiers) {
                continue;
            }
            let column = match resolve_column(rule.concept) {
                Some(column) => column,
                None => continue,
            };
            match &rule.template {
                PredicateTemplate::Like(pattern) => {
                    sql.push_str(&format!(" AND {} LIKE '{}'", column, pattern));
                }
                PredicateTemplate::GreaterThanNumber { default } => {
                    let value = first_numeric_token(&query).unwrap_or(*default);
                    sql.push_str(&format!(" AND {} > {}", column, value));
                }
            }
        }

        debug!(sql = %sql, "Translated query");
        sql
    }

    fn select_clause(&self, query: &str) -> String {
        if contains_any(query, &["count", "how many"]) {
            return "COUNT(*)".to_string();
        }
        if contains_any(query, &["protein name", "what proteins"]) {
            let columns: Vec<String> = NAME_PROJECTION
                .iter()
                .filter_map(|concept| resolve_column(concept))
                .collect();
            return columns.join(", ");
        }
        "*".to_string()
    }
}

fn contains_any(query: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| query.contains(phrase))
}

/// First whitespace-delimited token consisting solely of digits.
fn first_numeric_token(query: &str) -> Option<i64> {
    query
        .split_whitespace()
        .find(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
        .and_then(|token| token.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> SqlTranslator {
        SqlTranslator::new("proteins")
    }

    #[test]
    fn test_count_queries_select_count_star() {
        for query in ["count the secreted proteins", "How many proteins have mass above 50000?"] {
            let sql = translator().translate(query);
            assert!(sql.starts_with("SELECT COUNT(*) FROM proteins"), "{}", sql);
        }
    }

    #[test]
    fn test_name_queries_use_fixed_projection() {
        let sql = translator().translate("what proteins are secreted?");
        assert!(
            sql.starts_with(
                "SELECT Entry_Name, Protein_names, Mass, Subcellular_location_CC FROM proteins"
            ),
            "{}",
            sql
        );
    }

    #[test]
    fn test_default_select_star() {
        let sql = translator().translate("secreted");
        assert!(sql.starts_with("SELECT * FROM proteins WHERE 1=1"));
    }

    #[test]
    fn test_mass_with_number() {
        let sql = translator().translate("proteins with mass above 50000");
        assert!(sql.contains("AND Mass > 50000"), "{}", sql);
    }

    #[test]
    fn test_mass_without_number_uses_default() {
        let sql = translator().translate("proteins with mass above");
        assert!(
            sql.contains(&format!("AND Mass > {}", DEFAULT_MASS_THRESHOLD)),
            "{}",
            sql
        );
    }

    #[test]
    fn test_mass_without_comparator_adds_no_predicate() {
        let sql = translator().translate("tell me about protein mass");
        assert!(!sql.contains("Mass >"), "{}", sql);
    }

    #[test]
    fn test_no_mass_keyword_no_mass_predicate() {
        let sql = translator().translate("secreted proteins above 90000");
        assert!(!sql.contains("Mass >"), "{}", sql);
    }

    #[test]
    fn test_location_predicate() {
        let sql = translator().translate("show secreted proteins");
        assert!(
            sql.contains("AND Subcellular_location_CC LIKE '%Secreted%'"),
            "{}",
            sql
        );
    }

    #[test]
    fn test_coagulation_predicate() {
        let sql = translator().translate("proteins involved in clotting");
        assert!(
            sql.contains("AND Gene_Ontology_biological_process LIKE '%coagulation%'"),
            "{}",
            sql
        );
    }

    #[test]
    fn test_inhibitor_predicate() {
        let sql = translator().translate("list protease inhibitors");
        assert!(
            sql.contains("AND Gene_Ontology_molecular_function LIKE '%inhibitor activity%'"),
            "{}",
            sql
        );
    }

    #[test]
    fn test_complement_predicate() {
        let sql = translator().translate("complement cascade members");
        assert!(
            sql.contains("AND Gene_Ontology_biological_process LIKE '%complement%'"),
            "{}",
            sql
        );
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let sql = translator().translate("how many secreted proteins with mass above 60000 are involved in coagulation");
        assert!(sql.starts_with("SELECT COUNT(*)"));
        assert!(sql.contains("AND Mass > 60000"));
        assert!(sql.contains("LIKE '%Secreted%'"));
        assert!(sql.contains("LIKE '%coagulation%'"));
    }

    #[test]
    fn test_translation_is_case_insensitive() {
        assert_eq!(
            translator().translate("SECRETED PROTEINS WITH MASS ABOVE 70000"),
            translator().translate("secreted proteins with mass above 70000")
        );
    }

    #[test]
    fn test_first_numeric_token_ignores_mixed_tokens() {
        assert_eq!(first_numeric_token("mass above 50,000 daltons"), None);
        assert_eq!(first_numeric_token("mass above 50000 daltons"), Some(50000));
        assert_eq!(first_numeric_token("top5 proteins by 123"), Some(123));
    }
}
