//! Row-cap enforcer (spec §4.10), ported from
//! `original_source/src/mcp/utils/query_guardrails.py`.

use std::sync::LazyLock;

use regex::Regex;

pub const MAX_RESULTS_DEFAULT: usize = 100;
pub const MAX_RESULTS_ABSOLUTE: usize = 1000;

static LIMIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)").expect("limit pattern is valid regex"));

/// Ensures `query` carries a `LIMIT` clause, adding the default if absent
/// and capping an excessive one at [`MAX_RESULTS_ABSOLUTE`].
pub fn enforce_limit(query: &str, max_results: usize) -> String {
    let effective_limit = max_results.min(MAX_RESULTS_ABSOLUTE);

    if let Some(caps) = LIMIT_PATTERN.captures(query) {
        let existing: usize = caps[1].parse().unwrap_or(MAX_RESULTS_ABSOLUTE);
        if existing > MAX_RESULTS_ABSOLUTE {
            tracing::warn!(existing, cap = MAX_RESULTS_ABSOLUTE, "capping LIMIT");
            let whole = caps.get(0).unwrap();
            return format!(
                "{}LIMIT {MAX_RESULTS_ABSOLUTE}{}",
                &query[..whole.start()],
                &query[whole.end()..]
            );
        }
        return query.to_string();
    }

    tracing::debug!(limit = effective_limit, "adding LIMIT to query");
    let trimmed = query.trim_end().trim_end_matches(';');
    format!("{trimmed} LIMIT {effective_limit}")
}

/// Clamps a user-supplied `limit` tool argument into `[1, MAX_RESULTS_ABSOLUTE]`.
pub fn validate_limit_param(limit: Option<usize>) -> usize {
    match limit {
        None => MAX_RESULTS_DEFAULT,
        Some(0) => 1,
        Some(n) if n > MAX_RESULTS_ABSOLUTE => {
            tracing::warn!(requested = n, cap = MAX_RESULTS_ABSOLUTE, "limit exceeds max");
            MAX_RESULTS_ABSOLUTE
        }
        Some(n) => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_limit_when_absent() {
        assert_eq!(enforce_limit("MATCH (n) RETURN n", 100), "MATCH (n) RETURN n LIMIT 100");
    }

    #[test]
    fn strips_trailing_semicolon_before_adding_limit() {
        assert_eq!(enforce_limit("MATCH (n) RETURN n;", 100), "MATCH (n) RETURN n LIMIT 100");
    }

    #[test]
    fn leaves_compliant_limit_untouched() {
        assert_eq!(enforce_limit("MATCH (n) RETURN n LIMIT 10", 100), "MATCH (n) RETURN n LIMIT 10");
    }

    #[test]
    fn caps_excessive_limit_at_absolute_max() {
        let out = enforce_limit("MATCH (n) RETURN n LIMIT 50000", 100);
        assert_eq!(out, "MATCH (n) RETURN n LIMIT 1000");
    }

    #[test]
    fn validate_limit_param_defaults_and_clamps() {
        assert_eq!(validate_limit_param(None), MAX_RESULTS_DEFAULT);
        assert_eq!(validate_limit_param(Some(0)), 1);
        assert_eq!(validate_limit_param(Some(5_000)), MAX_RESULTS_ABSOLUTE);
        assert_eq!(validate_limit_param(Some(42)), 42);
    }
}
