//! Schema registry (spec §4.1, §6.3): the declarative description of what a
//! profile permits, kept separate from any store-specific mechanism.
//!
//! Three profiles ship embedded in the binary as YAML documents
//! (`schemas/*.yaml`), matching the teacher's pattern of compiling default
//! configuration into the binary with `include_str!` rather than shipping
//! loose files next to it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{PropertyValue, RawEdge, RawEntity};

const ANSIBLE_YAML: &str = include_str!("../schemas/ansible.yaml");
const PYTHON_YAML: &str = include_str!("../schemas/python.yaml");
const GENERIC_YAML: &str = include_str!("../schemas/generic.yaml");

/// The one profile-independent kind (spec §4.1, §3.2): global, deduplicated
/// by name, never carries `repository`.
pub const ROLE_KIND: &str = "Role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Int,
    Bool,
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: PropertyType,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSchema {
    #[serde(default)]
    pub properties: Vec<PropertySchema>,
}

impl NodeSchema {
    fn required_properties(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }
}

/// `from`/`to` endpoint restriction on a relationship: any kind, or a
/// declared set. Accepts the three shapes spec §6.3 names: a bare kind
/// name, a list of kind names, or the wildcard `"*"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSpec {
    Any,
    Kinds(Vec<String>),
}

impl EndpointSpec {
    pub fn permits(&self, kind: &str) -> bool {
        match self {
            EndpointSpec::Any => true,
            EndpointSpec::Kinds(kinds) => kinds.iter().any(|k| k == kind),
        }
    }
}

impl<'de> Deserialize<'de> for EndpointSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(s) if s == "*" => EndpointSpec::Any,
            Raw::One(s) => EndpointSpec::Kinds(vec![s]),
            Raw::Many(v) => EndpointSpec::Kinds(v),
        })
    }
}

impl Serialize for EndpointSpec {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            EndpointSpec::Any => serializer.serialize_str("*"),
            EndpointSpec::Kinds(kinds) if kinds.len() == 1 => {
                serializer.serialize_str(&kinds[0])
            }
            EndpointSpec::Kinds(kinds) => kinds.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelSchema {
    pub from: EndpointSpec,
    pub to: EndpointSpec,
    #[serde(default)]
    pub properties: Vec<PropertySchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    pub node: String,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub node: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaProfile {
    pub description: String,
    pub nodes: HashMap<String, NodeSchema>,
    pub relationships: HashMap<String, RelSchema>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
}

impl SchemaProfile {
    fn from_yaml(doc: &str) -> Result<Self> {
        serde_yaml::from_str(doc).map_err(|e| Error::internal(anyhow::anyhow!(e)))
    }

    fn role_schema() -> NodeSchema {
        NodeSchema {
            properties: vec![PropertySchema {
                name: "name".to_string(),
                ty: PropertyType::String,
                required: true,
            }],
        }
    }
}

/// Holds the three bundled profiles and answers validation queries against
/// whichever one a repository was detected as.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    profiles: HashMap<String, SchemaProfile>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::bundled()
    }
}

impl SchemaRegistry {
    /// Loads the three embedded profile documents. Panics only if the
    /// bundled YAML itself is malformed, which would be a build defect, not
    /// a runtime condition.
    pub fn bundled() -> Self {
        let mut profiles = HashMap::new();
        for (name, doc) in [
            ("ansible", ANSIBLE_YAML),
            ("python", PYTHON_YAML),
            ("generic", GENERIC_YAML),
        ] {
            let profile = SchemaProfile::from_yaml(doc)
                .unwrap_or_else(|e| panic!("bundled schema {name} is malformed: {e}"));
            profiles.insert(name.to_string(), profile);
        }
        Self { profiles }
    }

    pub fn profile(&self, name: &str) -> Option<&SchemaProfile> {
        self.profiles.get(name)
    }

    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    fn node_schema<'a>(&'a self, profile: &'a SchemaProfile, kind: &str) -> Option<&'a NodeSchema> {
        if kind == ROLE_KIND {
            return None; // handled separately via role_schema(), see validate_node
        }
        profile.nodes.get(kind)
    }

    /// spec §4.1: kind must be known, required properties present and
    /// non-null. `Role` is validated against the fixed, profile-independent
    /// schema regardless of which profile is active.
    pub fn validate_node(&self, profile_name: &str, entity: &RawEntity) -> Result<()> {
        if entity.kind == ROLE_KIND {
            let role = SchemaProfile::role_schema();
            return check_required(&role, entity);
        }
        let profile = self
            .profile(profile_name)
            .ok_or_else(|| Error::SchemaValidation(format!("unknown profile {profile_name}")))?;
        let schema = self
            .node_schema(profile, &entity.kind)
            .ok_or_else(|| Error::SchemaValidation(format!("unknown node kind {}", entity.kind)))?;
        check_required(schema, entity)
    }

    /// spec §4.1: kind and endpoint kinds must match a declared relationship,
    /// `*` wildcards permit any endpoint kind.
    pub fn validate_relationship(&self, profile_name: &str, edge: &RawEdge) -> Result<()> {
        let profile = self
            .profile(profile_name)
            .ok_or_else(|| Error::SchemaValidation(format!("unknown profile {profile_name}")))?;
        let schema = profile.relationships.get(&edge.kind).ok_or_else(|| {
            Error::SchemaValidation(format!("unknown relationship kind {}", edge.kind))
        })?;
        if edge.source.kind != ROLE_KIND && !schema.from.permits(&edge.source.kind) {
            return Err(Error::SchemaValidation(format!(
                "{} does not permit source kind {}",
                edge.kind, edge.source.kind
            )));
        }
        if edge.target.kind != ROLE_KIND && !schema.to.permits(&edge.target.kind) {
            return Err(Error::SchemaValidation(format!(
                "{} does not permit target kind {}",
                edge.kind, edge.target.kind
            )));
        }
        Ok(())
    }

    /// Renders one descriptor per declared index; the concrete store turns
    /// this into its own DDL dialect via `GraphStore::ensure_index`.
    pub fn index_ddl(&self, profile_name: &str) -> Vec<IndexSpec> {
        self.profile(profile_name)
            .map(|p| p.indexes.clone())
            .unwrap_or_default()
    }

    pub fn constraint_ddl(&self, profile_name: &str) -> Vec<ConstraintSpec> {
        self.profile(profile_name)
            .map(|p| p.constraints.clone())
            .unwrap_or_default()
    }
}

fn check_required(schema: &NodeSchema, entity: &RawEntity) -> Result<()> {
    for name in schema.required_properties() {
        match entity.properties.get(name) {
            Some(PropertyValue::Null) | None => {
                return Err(Error::SchemaValidation(format!(
                    "{}: missing required property {name}",
                    entity.kind
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EndpointRef;
    use std::collections::BTreeMap;

    #[test]
    fn bundled_profiles_load() {
        let registry = SchemaRegistry::bundled();
        assert!(registry.profile("ansible").is_some());
        assert!(registry.profile("python").is_some());
        assert!(registry.profile("generic").is_some());
    }

    #[test]
    fn validate_node_rejects_unknown_kind() {
        let registry = SchemaRegistry::bundled();
        let entity = RawEntity {
            kind: "Nonsense".to_string(),
            properties: BTreeMap::new(),
        };
        assert!(registry.validate_node("generic", &entity).is_err());
    }

    #[test]
    fn validate_node_rejects_missing_required_property() {
        let registry = SchemaRegistry::bundled();
        let entity = RawEntity {
            kind: "File".to_string(),
            properties: BTreeMap::new(),
        };
        let err = registry.validate_node("generic", &entity).unwrap_err();
        assert!(err.to_string().contains("path"));
    }

    #[test]
    fn validate_node_accepts_role_regardless_of_profile() {
        let registry = SchemaRegistry::bundled();
        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), PropertyValue::Str("web".to_string()));
        let entity = RawEntity {
            kind: ROLE_KIND.to_string(),
            properties,
        };
        assert!(registry.validate_node("python", &entity).is_ok());
    }

    #[test]
    fn validate_relationship_enforces_endpoint_kinds() {
        let registry = SchemaRegistry::bundled();
        let edge_ok = RawEdge {
            kind: "HAS_PLAY".to_string(),
            source: EndpointRef {
                kind: "Playbook".to_string(),
                path: Some("site.yml".to_string()),
                name: None,
            },
            target: EndpointRef {
                kind: "Play".to_string(),
                path: None,
                name: Some("web".to_string()),
            },
            properties: BTreeMap::new(),
        };
        assert!(registry.validate_relationship("ansible", &edge_ok).is_ok());

        let edge_bad = RawEdge {
            kind: "HAS_PLAY".to_string(),
            source: EndpointRef {
                kind: "Task".to_string(),
                path: Some("tasks/main.yml".to_string()),
                name: None,
            },
            target: EndpointRef {
                kind: "Play".to_string(),
                path: None,
                name: Some("web".to_string()),
            },
            properties: BTreeMap::new(),
        };
        assert!(registry.validate_relationship("ansible", &edge_bad).is_err());
    }

    #[test]
    fn wildcard_endpoint_permits_any_kind() {
        let registry = SchemaRegistry::bundled();
        let edge = RawEdge {
            kind: "CONTAINS".to_string(),
            source: EndpointRef {
                kind: "Directory".to_string(),
                path: Some("src".to_string()),
                name: None,
            },
            target: EndpointRef {
                kind: "File".to_string(),
                path: Some("src/main.rs".to_string()),
                name: None,
            },
            properties: BTreeMap::new(),
        };
        assert!(registry.validate_relationship("generic", &edge).is_ok());
    }
}
