//! 9 of the 10 code-intelligence tools (spec §4.9), ported from
//! `original_source/src/mcp/tools/{query,dependency,variable,role,playbook}_tools.py`.
//! `set_repository_context` is the tenth; it only touches session state and
//! lives in [`crate::dispatch`] instead.
//!
//! Every query here binds its arguments through `params`, never through
//! string interpolation: the original's `find_role_usage` built a `WHERE`
//! clause with an f-string that was otherwise harmless only because the
//! value came from a prior validated match, which this port does not rely
//! on (spec §9 flags the general pattern as worth closing off for good).

use std::collections::BTreeMap;
use std::time::Duration;

use graphrag_core::Result;
use graphrag_llm::LlmClient;
use graphrag_query::guards::path_sanitizer::sanitize_path;
use graphrag_query::{validate_query, Translator};
use graphrag_store::{schema_snapshot, GraphStore, Row};
use serde_json::Value;

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// The 10 tool names this gateway exposes (spec §4.9), in the order
/// they're documented there. `set_repository_context` is handled directly
/// by the dispatcher (it only touches session state, no store/LLM call),
/// so it has no function in this module — it's listed here only so
/// `tools.list` reports the complete surface.
pub const NAMES: &[&str] = &[
    "set_repository_context",
    "query_codebase",
    "query_with_rag",
    "find_dependencies",
    "trace_variable",
    "get_role_usage",
    "analyze_playbook",
    "find_tasks_by_module",
    "get_task_hierarchy",
    "find_template_usage",
];

fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

fn format_results(rows: &[Row]) -> String {
    if rows.is_empty() {
        return "No results found.".to_string();
    }
    let mut lines = vec![format!("Found {} result(s):\n", rows.len())];
    for (i, row) in rows.iter().enumerate() {
        lines.push(format!("**{}.**", i + 1));
        let parts: Vec<String> = row
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(col, value)| {
                let clean_col = col.rsplit('.').next().unwrap_or(col.as_str());
                format!("{clean_col}: {}", truncate(value_display(value), 100))
            })
            .collect();
        lines.push(parts.join(" | "));
        lines.push(String::new());
    }
    lines.join("\n")
}

fn repo_param(params: &mut BTreeMap<String, Value>, repository_id: Option<&str>) {
    params.insert(
        "repo".to_string(),
        repository_id.map_or(Value::Null, Value::from),
    );
}

struct CodebaseQueryOutcome {
    cypher: String,
    text: String,
}

async fn run_codebase_query<S: GraphStore, L: LlmClient>(
    store: &S,
    translator: &Translator<L>,
    question: &str,
    repository_id: Option<&str>,
) -> Result<CodebaseQueryOutcome> {
    let schema = schema_snapshot(store).await?;
    let cypher = translator.translate(question, repository_id, &schema).await?;
    tracing::info!(cypher, "generated cypher");

    let validation = validate_query(&cypher, &schema);
    if !validation.is_valid {
        let errors: Vec<String> = validation.errors.iter().map(|e| format!("  - {e}")).collect();
        return Ok(CodebaseQueryOutcome {
            text: format!(
                "Invalid query generated:\n{}\n\nTry rephrasing your question.",
                errors.join("\n")
            ),
            cypher,
        });
    }
    for warning in &validation.warnings {
        tracing::warn!(warning, "cypher warning");
    }

    let rows = store.execute(&cypher, &BTreeMap::new(), QUERY_TIMEOUT).await?;
    Ok(CodebaseQueryOutcome { text: format_results(&rows), cypher })
}

/// spec §4.9, P1: natural-language question to Cypher, validated, executed,
/// formatted as readable text.
pub async fn query_codebase<S: GraphStore, L: LlmClient>(
    store: &S,
    translator: &Translator<L>,
    question: &str,
    repository_id: Option<&str>,
) -> Result<String> {
    Ok(run_codebase_query(store, translator, question, repository_id).await?.text)
}

/// spec §4.9, P2: the original's hybrid LlamaIndex retrieval has no
/// equivalent crate in this workspace's dependency pack, so this falls
/// back to [`query_codebase`]'s graph path, optionally appending the
/// generated Cypher the way the original appends it when `include_cypher`
/// is set.
pub async fn query_with_rag<S: GraphStore, L: LlmClient>(
    store: &S,
    translator: &Translator<L>,
    question: &str,
    repository_id: Option<&str>,
    include_cypher: bool,
) -> Result<String> {
    let outcome = run_codebase_query(store, translator, question, repository_id).await?;
    if include_cypher {
        Ok(format!("{}\n\nGenerated Cypher:\n{}", outcome.text, outcome.cypher))
    } else {
        Ok(outcome.text)
    }
}

/// spec §4.9, P3: includes, imports, and variable-load dependencies for a
/// file.
pub async fn find_dependencies<S: GraphStore>(
    store: &S,
    file_path: &str,
    repository_id: Option<&str>,
) -> Result<String> {
    let safe_path = sanitize_path(file_path, None)?;
    let path = safe_path.to_string_lossy().to_string();

    let query = if repository_id.is_some() {
        "MATCH (f:File {path: $path, repository: $repo}) \
         OPTIONAL MATCH (f)-[:INCLUDES|IMPORTS|LOADS_VARS]->(dep) \
         WHERE dep.repository = $repo OR dep:Role \
         RETURN dep.path as dependency, dep.repository as repository, labels(dep)[0] as type"
    } else {
        "MATCH (f:File {path: $path}) \
         OPTIONAL MATCH (f)-[:INCLUDES|IMPORTS|LOADS_VARS]->(dep) \
         RETURN dep.path as dependency, dep.repository as repository, labels(dep)[0] as type"
    };
    let mut params = BTreeMap::from([("path".to_string(), Value::from(path.clone()))]);
    repo_param(&mut params, repository_id);

    let rows = store.execute(query, &params, QUERY_TIMEOUT).await?;
    let formatted: Vec<String> = rows
        .iter()
        .filter(|r| r.get("dependency").is_some_and(|v| !v.is_null()))
        .map(|r| {
            let kind = r.get("type").map_or("Unknown", |v| v.as_str().unwrap_or("Unknown"));
            let dep = r.get("dependency").map_or(String::new(), value_display);
            let repo = r
                .get("repository")
                .filter(|v| !v.is_null())
                .map_or_else(|| "global".to_string(), value_display);
            format!("- {kind}: {dep} (Repo: {repo})")
        })
        .collect();

    if rows.is_empty() {
        return Ok(format!("No dependencies found for {path}"));
    }
    if formatted.is_empty() {
        return Ok(format!("File found but no dependencies for {path}"));
    }
    Ok(format!("Dependencies for {path}:\n{}", formatted.join("\n")))
}

/// spec §4.9, P4: definitions and usages of a named variable.
pub async fn trace_variable<S: GraphStore>(
    store: &S,
    variable_name: &str,
    repository_id: Option<&str>,
) -> Result<String> {
    let (def_query, usage_query) = if repository_id.is_some() {
        (
            "MATCH (v:Variable {name: $name, repository: $repo}) \
             OPTIONAL MATCH (source)-[:DEFINES_VAR]->(v) \
             RETURN source.path as path, source.name as source_name, labels(source)[0] as type",
            "MATCH (v:Variable {name: $name, repository: $repo}) \
             OPTIONAL MATCH (source)-[:USES_VAR]->(v) \
             RETURN source.path as path, source.name as source_name, labels(source)[0] as type",
        )
    } else {
        (
            "MATCH (v:Variable {name: $name}) \
             OPTIONAL MATCH (source)-[:DEFINES_VAR]->(v) \
             RETURN source.path as path, source.name as source_name, labels(source)[0] as type",
            "MATCH (v:Variable {name: $name}) \
             OPTIONAL MATCH (source)-[:USES_VAR]->(v) \
             RETURN source.path as path, source.name as source_name, labels(source)[0] as type",
        )
    };
    let mut params = BTreeMap::from([("name".to_string(), Value::from(variable_name))]);
    repo_param(&mut params, repository_id);

    let definitions = store.execute(def_query, &params, QUERY_TIMEOUT).await?;
    let usages = store.execute(usage_query, &params, QUERY_TIMEOUT).await?;

    if definitions.is_empty() && usages.is_empty() {
        return Ok(format!("Variable '{variable_name}' not found in the graph."));
    }

    let mut output = vec![format!("Trace for variable '{variable_name}':\n")];
    let render_source = |r: &Row| {
        r.get("source_name")
            .filter(|v| !v.is_null())
            .or_else(|| r.get("path"))
            .map_or_else(String::new, value_display)
    };
    let render_type = |r: &Row| r.get("type").map_or("Unknown".to_string(), value_display);

    if definitions.is_empty() {
        output.push("Definitions: None found".to_string());
    } else {
        output.push("Definitions:".to_string());
        for d in &definitions {
            output.push(format!("  - Defined in {}: {}", render_type(d), render_source(d)));
        }
    }

    if usages.is_empty() {
        output.push("\nUsages: None found".to_string());
    } else {
        output.push("\nUsages:".to_string());
        for u in &usages {
            output.push(format!("  - Used in {}: {}", render_type(u), render_source(u)));
        }
    }

    Ok(output.join("\n"))
}

/// spec §4.9, P5: every site that uses a named Ansible role.
pub async fn get_role_usage<S: GraphStore>(
    store: &S,
    role_name: &str,
    repository_id: Option<&str>,
) -> Result<String> {
    let query = "MATCH (r:Role {name: $name}) \
                 OPTIONAL MATCH (usage)-[:USES_ROLE]->(r) \
                 WHERE $repo IS NULL OR usage.repository = $repo \
                 RETURN r.name as role, collect(DISTINCT {repository: usage.repository, \
                 type: labels(usage)[0], name: usage.name, path: usage.path}) as usages";
    let mut params = BTreeMap::from([("name".to_string(), Value::from(role_name))]);
    repo_param(&mut params, repository_id);

    let rows = store.execute(query, &params, QUERY_TIMEOUT).await?;
    let Some(first) = rows.first() else {
        return Ok(format!("Role '{role_name}' is not used or not found."));
    };
    let usages = first.get("usages").and_then(Value::as_array).cloned().unwrap_or_default();

    let mut output = vec![format!("Usage of role '{role_name}':")];
    for usage in &usages {
        let Some(usage_type) = usage.get("type").filter(|v| !v.is_null()) else { continue };
        let repo_info = usage
            .get("repository")
            .filter(|v| !v.is_null())
            .map(|v| format!(" [Repo: {}]", value_display(v)))
            .unwrap_or_default();
        let source = usage
            .get("name")
            .filter(|v| !v.is_null())
            .or_else(|| usage.get("path"))
            .map_or_else(String::new, value_display);
        output.push(format!("- Used by {}: {source}{repo_info}", value_display(usage_type)));
    }

    if output.len() == 1 {
        return Ok(format!("Role '{role_name}' found but no usages detected."));
    }
    Ok(output.join("\n"))
}

/// spec §4.9, P6: a playbook's play/task counts and play names.
pub async fn analyze_playbook<S: GraphStore>(
    store: &S,
    playbook_path: &str,
    repository_id: Option<&str>,
) -> Result<String> {
    let safe_path = sanitize_path(playbook_path, None)?;
    let path = safe_path.to_string_lossy().to_string();

    let query = if repository_id.is_some() {
        "MATCH (p:Playbook {path: $path, repository: $repo}) \
         OPTIONAL MATCH (p)-[:HAS_PLAY]->(play) \
         OPTIONAL MATCH (play)-[:HAS_TASK]->(task) \
         RETURN p.name as name, count(DISTINCT play) as play_count, \
         count(DISTINCT task) as task_count, collect(DISTINCT play.name) as plays"
    } else {
        "MATCH (p:Playbook {path: $path}) \
         OPTIONAL MATCH (p)-[:HAS_PLAY]->(play) \
         OPTIONAL MATCH (play)-[:HAS_TASK]->(task) \
         RETURN p.name as name, count(DISTINCT play) as play_count, \
         count(DISTINCT task) as task_count, collect(DISTINCT play.name) as plays"
    };
    let mut params = BTreeMap::from([("path".to_string(), Value::from(path.clone()))]);
    repo_param(&mut params, repository_id);

    let rows = store.execute(query, &params, QUERY_TIMEOUT).await?;
    let Some(data) = rows.first() else {
        return Ok(format!("Playbook not found: {path}"));
    };

    let play_count = data.get("play_count").map_or(0, |v| v.as_i64().unwrap_or(0));
    let task_count = data.get("task_count").map_or(0, |v| v.as_i64().unwrap_or(0));
    let plays = data.get("plays").and_then(Value::as_array).cloned().unwrap_or_default();

    let mut output = format!("Analysis of {path}:\n- Plays: {play_count}\n- Total Tasks: {task_count}\n- Play Names:\n");
    for play in &plays {
        output.push_str(&format!("  - {}\n", value_display(play)));
    }
    Ok(output)
}

/// spec §4.9, P7: tasks that invoke a named Ansible module, capped at 50
/// rows in the query itself (a deterministic tool: no LLM involved, so the
/// row-cap guard is redundant here).
pub async fn find_tasks_by_module<S: GraphStore>(
    store: &S,
    module_name: &str,
    repository_id: Option<&str>,
) -> Result<String> {
    let query = if repository_id.is_some() {
        "MATCH (t:Task {module: $module, repository: $repo}) \
         RETURN t.name as task, t.file_path as path, t.line_number as line LIMIT 50"
    } else {
        "MATCH (t:Task {module: $module}) \
         RETURN t.name as task, t.file_path as path, t.line_number as line LIMIT 50"
    };
    let mut params = BTreeMap::from([("module".to_string(), Value::from(module_name))]);
    repo_param(&mut params, repository_id);

    let rows = store.execute(query, &params, QUERY_TIMEOUT).await?;
    if rows.is_empty() {
        return Ok(format!("No tasks found using module '{module_name}'"));
    }

    let mut output = vec![format!("Tasks using module '{module_name}':")];
    for r in &rows {
        let task = r.get("task").map_or_else(String::new, value_display);
        let path = r.get("path").map_or_else(String::new, value_display);
        let line = r.get("line").map_or_else(String::new, value_display);
        output.push(format!("- {task} ({path}:{line})"));
    }
    Ok(output.join("\n"))
}

/// spec §4.9, P8: ordered play/task execution hierarchy within a playbook.
pub async fn get_task_hierarchy<S: GraphStore>(
    store: &S,
    playbook_path: &str,
    repository_id: Option<&str>,
) -> Result<String> {
    let safe_path = sanitize_path(playbook_path, None)?;
    let path = safe_path.to_string_lossy().to_string();

    let query = if repository_id.is_some() {
        "MATCH (p:Playbook {path: $path, repository: $repo})-[:HAS_PLAY]->(play) \
         OPTIONAL MATCH (play)-[:HAS_TASK]->(task) \
         RETURN play.name as play, play.order as play_order, task.name as task, \
         task.order as task_order ORDER BY play_order, task_order"
    } else {
        "MATCH (p:Playbook {path: $path})-[:HAS_PLAY]->(play) \
         OPTIONAL MATCH (play)-[:HAS_TASK]->(task) \
         RETURN play.name as play, play.order as play_order, task.name as task, \
         task.order as task_order ORDER BY play_order, task_order"
    };
    let mut params = BTreeMap::from([("path".to_string(), Value::from(path.clone()))]);
    repo_param(&mut params, repository_id);

    let rows = store.execute(query, &params, QUERY_TIMEOUT).await?;
    if rows.is_empty() {
        return Ok(format!("No hierarchy found for {path}"));
    }

    let mut output = vec![format!("Task Hierarchy for {path}:")];
    let mut current_play: Option<String> = None;
    for r in &rows {
        let play = r.get("play").map(value_display);
        if play != current_play {
            output.push(format!("\nPlay: {}", play.clone().unwrap_or_default()));
            current_play = play;
        }
        if let Some(task) = r.get("task").filter(|v| !v.is_null()) {
            output.push(format!("  - {}", value_display(task)));
        }
    }
    Ok(output.join("\n"))
}

/// spec §4.9, P9: a Jinja2 template's callers and the variables it needs.
pub async fn find_template_usage<S: GraphStore>(
    store: &S,
    template_path: &str,
    repository_id: Option<&str>,
) -> Result<String> {
    let safe_path = sanitize_path(template_path, None)?;
    let path = safe_path.to_string_lossy().to_string();

    let query = if repository_id.is_some() {
        "MATCH (t:Template {path: $path, repository: $repo}) \
         OPTIONAL MATCH (task:Task)-[:USES_TEMPLATE]->(t) \
         OPTIONAL MATCH (t)-[:USES_VAR]->(v:Variable) \
         RETURN collect(DISTINCT task.name) as used_by_tasks, \
         collect(DISTINCT v.name) as variables_required"
    } else {
        "MATCH (t:Template {path: $path}) \
         OPTIONAL MATCH (task:Task)-[:USES_TEMPLATE]->(t) \
         OPTIONAL MATCH (t)-[:USES_VAR]->(v:Variable) \
         RETURN collect(DISTINCT task.name) as used_by_tasks, \
         collect(DISTINCT v.name) as variables_required"
    };
    let mut params = BTreeMap::from([("path".to_string(), Value::from(path.clone()))]);
    repo_param(&mut params, repository_id);

    let rows = store.execute(query, &params, QUERY_TIMEOUT).await?;
    let Some(data) = rows.first() else {
        return Ok(format!("Template not found: {path}"));
    };

    let used_by_tasks = data.get("used_by_tasks").and_then(Value::as_array).cloned().unwrap_or_default();
    let variables_required = data.get("variables_required").and_then(Value::as_array).cloned().unwrap_or_default();

    let mut output = vec![format!("Template Usage: {path}"), String::new(), "Used by Tasks:".to_string()];
    if used_by_tasks.is_empty() {
        output.push("- None found".to_string());
    } else {
        output.extend(used_by_tasks.iter().map(|t| format!("- {}", value_display(t))));
    }

    output.push(String::new());
    output.push("Variables Required:".to_string());
    if variables_required.is_empty() {
        output.push("- None explicitly detected".to_string());
    } else {
        output.extend(variables_required.iter().map(|v| format!("- {}", value_display(v))));
    }

    Ok(output.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_results_reports_no_results_found() {
        assert_eq!(format_results(&[]), "No results found.");
    }

    #[test]
    fn format_results_drops_null_columns_and_truncates_long_values() {
        let long_value = "x".repeat(150);
        let row: Row = BTreeMap::from([
            ("c.name".to_string(), Value::from("nginx")),
            ("c.note".to_string(), Value::from(long_value)),
            ("c.missing".to_string(), Value::Null),
        ]);
        let formatted = format_results(&[row]);
        assert!(formatted.contains("Found 1 result(s)"));
        assert!(formatted.contains("name: nginx"));
        assert!(formatted.contains("..."));
        assert!(!formatted.contains("missing"));
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let text = "é".repeat(10);
        assert_eq!(truncate(text.clone(), 20), text);
        let truncated = truncate("é".repeat(30), 10);
        assert!(truncated.ends_with("..."));
    }
}
