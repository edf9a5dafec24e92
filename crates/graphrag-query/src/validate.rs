//! The Query Validator (spec §4.8), ported from
//! `original_source/src/mcp/utils/cypher_validator.py::CypherValidator`:
//! forbidden-operation rejection, declared-vocabulary enforcement against a
//! live schema snapshot, and non-fatal warnings for expensive shapes.

use std::sync::LazyLock;

use graphrag_store::SchemaSnapshot;
use regex::Regex;

/// Case-insensitive, checked in order; the first match wins for the
/// rejection message but every pattern is still checked so `errors` reports
/// all violations at once.
static FORBIDDEN_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\bDETACH\s+DELETE\b", "DETACH DELETE operations"),
        (r"(?i)\bDROP\b", "DROP operations"),
        (r"(?i)\bCREATE\s+INDEX\b", "CREATE INDEX operations"),
        (r"(?i)\bCREATE\s+CONSTRAINT\b", "CREATE CONSTRAINT operations"),
        (r"(?i)\bCALL\s+db\.", "db.* procedure calls"),
        (r"(?i)\bCALL\s+apoc\.", "APOC procedure calls"),
        (r"(?i)\bDELETE\b", "DELETE operations"),
        (r"(?i)\bREMOVE\b", "REMOVE operations"),
        (r"(?i)\bSET\b", "SET operations"),
        (r"(?i)\bCREATE\b", "CREATE operations"),
        (r"(?i)\bMERGE\b", "MERGE operations"),
    ]
    .into_iter()
    .map(|(pat, desc)| (Regex::new(pat).expect("forbidden pattern is valid regex"), desc))
    .collect()
});

static WARNING_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\[\*\]", "Unbounded variable-length path"),
        (r"\[\*\d+\.\.\]", "Open-ended variable-length path"),
        (r"(?i)\bRETURN\s+\*", "RETURN * without LIMIT"),
    ]
    .into_iter()
    .map(|(pat, desc)| (Regex::new(pat).expect("warning pattern is valid regex"), desc))
    .collect()
});

static LABEL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([\w]*:([\w]+)\)").expect("label pattern is valid regex"));
static REL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[\w]*:([\w]+)\]").expect("rel pattern is valid regex"));
static LIMIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\s+\d+").expect("limit pattern is valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Parses the translated query against a live schema snapshot and enforces
/// spec §4.8's three checks.
pub fn validate(query: &str, schema: &SchemaSnapshot) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (pattern, description) in FORBIDDEN_PATTERNS.iter() {
        if pattern.is_match(query) {
            errors.push(format!("Forbidden: {description}"));
        }
    }

    let labels_used: std::collections::HashSet<&str> =
        LABEL_PATTERN.captures_iter(query).map(|c| c.get(1).unwrap().as_str()).collect();
    let unknown_labels: Vec<&str> = labels_used
        .iter()
        .filter(|l| !schema.node_labels.contains(**l))
        .copied()
        .collect();
    if !unknown_labels.is_empty() {
        errors.push(format!("Unknown node labels: {unknown_labels:?}"));
    }

    let rels_used: std::collections::HashSet<&str> =
        REL_PATTERN.captures_iter(query).map(|c| c.get(1).unwrap().as_str()).collect();
    let unknown_rels: Vec<&str> = rels_used
        .iter()
        .filter(|r| !schema.relationship_types.contains(**r))
        .copied()
        .collect();
    if !unknown_rels.is_empty() {
        errors.push(format!("Unknown relationship types: {unknown_rels:?}"));
    }

    for (pattern, description) in WARNING_PATTERNS.iter() {
        if pattern.is_match(query) {
            warnings.push((*description).to_string());
        }
    }
    if !LIMIT_PATTERN.is_match(query) {
        warnings.push("No LIMIT clause (will be added automatically)".to_string());
    }

    ValidationResult { is_valid: errors.is_empty(), errors, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn schema() -> SchemaSnapshot {
        SchemaSnapshot {
            node_labels: HashSet::from(["Playbook".to_string(), "Task".to_string()]),
            relationship_types: HashSet::from(["HAS_TASK".to_string()]),
        }
    }

    #[test]
    fn rejects_mutation_verbs() {
        let result = validate("MATCH (p:Playbook) DETACH DELETE p", &schema());
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("DETACH DELETE")));
    }

    #[test]
    fn rejects_unknown_node_label() {
        let result = validate("MATCH (x:Ghost) RETURN x LIMIT 10", &schema());
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("Ghost")));
    }

    #[test]
    fn accepts_known_vocabulary_with_limit() {
        let result = validate(
            "MATCH (p:Playbook)-[:HAS_TASK]->(t:Task) RETURN t LIMIT 50",
            &schema(),
        );
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn warns_on_missing_limit() {
        let result = validate("MATCH (p:Playbook) RETURN p", &schema());
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("No LIMIT")));
    }

    #[test]
    fn warns_on_unbounded_variable_length_path() {
        let result = validate("MATCH (p:Playbook)-[*]->(t:Task) RETURN t LIMIT 10", &schema());
        assert!(result.warnings.iter().any(|w| w.contains("Unbounded")));
    }
}
