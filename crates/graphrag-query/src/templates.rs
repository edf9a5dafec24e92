//! Prompt templates for the query translator (spec §4.7), ported in
//! structure from `original_source/src/mcp/utils/prompt_templates.py`: the
//! same instructions, constraints, and worked examples, rendered against a
//! live schema snapshot instead of the static profile.

use graphrag_store::SchemaSnapshot;

const DEFAULT_TEMPLATE: &str = r#"<instructions>
Convert the user's question into a Cypher query for a Neo4j graph database.
Return ONLY the Cypher query. No explanations, no markdown.
</instructions>

<schema>
{schema}
</schema>

<constraints>
- Use ONLY the node labels and relationship types in schema
- Always include LIMIT clause (default 100)
- Do not use procedures (CALL) unless necessary
</constraints>

<examples>
Question: How many playbooks are there?
MATCH (p:Playbook) RETURN count(p) as count

Question: Find tasks using copy module
MATCH (t:Task) WHERE t.module = 'copy' RETURN t.name, t.path LIMIT 100

Question: What roles are used?
MATCH (r:Role)<-[:USES_ROLE]-(usage) RETURN r.name, count(usage) LIMIT 100

Question: List all classes
MATCH (c:Class) RETURN c.name, c.docstring LIMIT 100
</examples>

<question>
{question}
</question>
"#;

const MULTI_REPO_TEMPLATE: &str = r#"<instructions>
Convert the user's question into a Cypher query for a Neo4j graph database.
Return ONLY the Cypher query. No explanations, no markdown.
</instructions>

<schema>
{schema}
</schema>

<repository_context>
Active repository: {repository_id}
All nodes except Role have a 'repository' property.
ALWAYS filter by repository unless querying global entities like Role.
</repository_context>

<constraints>
- Use ONLY the node labels and relationship types in schema
- Always include WHERE n.repository = '{repository_id}' for non-Role nodes
- Role nodes are global - no repository filter
- Always include LIMIT clause (default 100)
</constraints>

<examples>
Question: How many playbooks are there?
MATCH (p:Playbook) WHERE p.repository = '{repository_id}' RETURN count(p) as count

Question: Find tasks using copy module
MATCH (t:Task) WHERE t.repository = '{repository_id}' AND t.module = 'copy' RETURN t.name, t.path LIMIT 100

Question: Which repos use the nginx role?
MATCH (r:Role {name: 'nginx'})<-[:USES_ROLE]-(usage) RETURN r.name, collect(DISTINCT usage.repository) as repos
</examples>

<question>
{question}
</question>
"#;

/// Renders the live schema snapshot as the flat node/edge list the original
/// builds from `GraphSchema` (label set + relationship-type set), not the
/// nested YAML profile.
fn render_schema(schema: &SchemaSnapshot) -> String {
    let mut nodes: Vec<&str> = schema.node_labels.iter().map(String::as_str).collect();
    nodes.sort_unstable();
    let mut rels: Vec<&str> = schema.relationship_types.iter().map(String::as_str).collect();
    rels.sort_unstable();
    format!("Node labels: {}\nRelationship types: {}", nodes.join(", "), rels.join(", "))
}

/// spec §4.7: single-repo template, used when no `repository_id` is active.
pub fn render_default(schema: &SchemaSnapshot, question: &str) -> String {
    DEFAULT_TEMPLATE
        .replace("{schema}", &render_schema(schema))
        .replace("{question}", question)
}

/// spec §4.7: multi-repo template, used when a `repository_id` is active;
/// every non-`Role` predicate must be constrained by it.
pub fn render_multi_repo(schema: &SchemaSnapshot, question: &str, repository_id: &str) -> String {
    MULTI_REPO_TEMPLATE
        .replace("{schema}", &render_schema(schema))
        .replace("{repository_id}", repository_id)
        .replace("{question}", question)
}
