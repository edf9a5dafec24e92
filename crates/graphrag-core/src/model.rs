//! The property-graph data model (spec §3): typed entity/edge records and
//! the composite merge-key table that gives every node kind its identity.
//!
//! Deliberately a small sum type, never a raw JSON value, past the parser
//! layer — the extractor and builder only ever see these.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A property value as emitted by an extractor. Never a raw JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    Null,
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Int(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

/// One entity record as emitted by an extractor (spec §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    pub kind: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl RawEntity {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// A reference to one endpoint of an edge, as the extractor knows it before
/// the builder resolves it to a store identity. `path` is used for
/// repo-scoped kinds keyed by path; `name` for kinds keyed by name (and
/// always for `Role`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRef {
    pub kind: String,
    pub path: Option<String>,
    pub name: Option<String>,
}

impl EndpointRef {
    /// spec §4.5: edges whose endpoints cannot be identified (no `path` nor
    /// `name`) are dropped with a warning before reaching the store.
    pub fn is_identifiable(&self) -> bool {
        self.path.is_some() || self.name.is_some()
    }
}

/// One edge record as emitted by an extractor (spec §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    pub kind: String,
    pub source: EndpointRef,
    pub target: EndpointRef,
    pub properties: BTreeMap<String, PropertyValue>,
}

/// The fields that compose a node kind's identity (spec §3.2's table).
/// `Role` is the one kind whose key excludes `repository`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeKey(&'static [&'static str]);

impl MergeKey {
    pub fn fields(&self) -> &'static [&'static str] {
        self.0
    }

    pub fn is_global(&self) -> bool {
        self.0 == ["name"]
    }
}

/// spec §3.2's composite merge-key table, resolved by node kind.
///
/// `Class`'s key is kept as `(repository, name)`, matching both spec §3.2's
/// table and the original implementation's actual (not its aspirational,
/// commented-out) behavior — see DESIGN.md's Open Question resolution.
pub fn merge_key_for_kind(kind: &str) -> MergeKey {
    match kind {
        "File" | "Playbook" | "Template" | "Inventory" | "VarsFile" | "Directory" | "Module" => {
            MergeKey(&["repository", "path"])
        }
        "Play" => MergeKey(&["repository", "playbook_path", "name", "order"]),
        "Task" => MergeKey(&["repository", "file_path", "name", "order"]),
        "Handler" => MergeKey(&["repository", "file_path", "name"]),
        "Variable" => MergeKey(&["repository", "name", "scope", "file_path"]),
        "Class" | "Function" => MergeKey(&["repository", "name"]),
        "Import" => MergeKey(&["repository", "module", "alias"]),
        "Role" => MergeKey(&["name"]),
        _ => MergeKey(&["repository", "path"]),
    }
}

/// Resolves an entity's merge-key values in declared field order. Returns
/// `None` if any component is absent or null — the builder must reject such
/// a record before it reaches the store (spec §3.2).
pub fn resolve_merge_key(entity: &RawEntity) -> Option<Vec<PropertyValue>> {
    let key = merge_key_for_kind(&entity.kind);
    let mut values = Vec::with_capacity(key.fields().len());
    for field in key.fields() {
        let value = entity.properties.get(*field)?;
        if value.is_null() {
            return None;
        }
        values.push(value.clone());
    }
    Some(values)
}
