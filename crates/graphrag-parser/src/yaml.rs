//! YAML/Ansible parser (spec §4.2, §4.3): detects playbooks, vars files,
//! and Galaxy requirements files from the parsed document's shape.

use std::collections::BTreeSet;
use std::path::Path;

use serde_yaml::Value;

use crate::{ParseMetadata, ParseResult, ParseTree, Parser, YamlMeta};

pub struct YamlParser;

impl Parser for YamlParser {
    fn parse(&self, _path: &Path, source: &[u8]) -> ParseResult {
        let content = match std::str::from_utf8(source) {
            Ok(s) => s,
            Err(e) => return ParseResult::failed(format!("not valid utf-8: {e}")),
        };
        let value: Value = match serde_yaml::from_str(content) {
            Ok(v) => v,
            Err(e) => return ParseResult::failed(format!("yaml parse error: {e}")),
        };
        let metadata = analyze(&value);
        ParseResult {
            success: true,
            errors: Vec::new(),
            root: Some(ParseTree::Yaml(value)),
            metadata: ParseMetadata::Yaml(metadata),
        }
    }
}

fn analyze(value: &Value) -> YamlMeta {
    match value {
        Value::Sequence(plays) => analyze_playbook(plays),
        Value::Mapping(map) => analyze_mapping(map),
        _ => YamlMeta::default(),
    }
}

fn analyze_playbook(plays: &[Value]) -> YamlMeta {
    let Some(Value::Mapping(first)) = plays.first() else {
        return YamlMeta::default();
    };
    let is_playbook = ["hosts", "tasks", "roles", "plays"]
        .iter()
        .any(|k| first.contains_key(Value::String((*k).to_string())));
    if !is_playbook {
        return YamlMeta::default();
    }

    let mut task_count = 0;
    let mut handler_count = 0;
    let mut role_names = BTreeSet::new();

    for play in plays {
        let Value::Mapping(play) = play else { continue };
        if let Some(Value::Sequence(tasks)) = play.get(Value::String("tasks".to_string())) {
            task_count += tasks.len();
        }
        if let Some(Value::Sequence(handlers)) = play.get(Value::String("handlers".to_string())) {
            handler_count += handlers.len();
        }
        if let Some(roles) = play.get(Value::String("roles".to_string())) {
            role_names.extend(extract_role_names(roles));
        }
    }

    YamlMeta {
        is_playbook: true,
        play_count: plays.len(),
        task_count,
        handler_count,
        role_names: role_names.into_iter().collect(),
        ..Default::default()
    }
}

fn analyze_mapping(map: &serde_yaml::Mapping) -> YamlMeta {
    let has_roles = map.contains_key(Value::String("roles".to_string()));
    let looks_like_galaxy_entry = map.contains_key(Value::String("name".to_string()))
        && map.contains_key(Value::String("src".to_string()));

    if has_roles || looks_like_galaxy_entry {
        return YamlMeta {
            is_requirements: true,
            ..Default::default()
        };
    }

    let var_names = map
        .keys()
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect();
    YamlMeta {
        is_vars_file: true,
        var_names,
        ..Default::default()
    }
}

fn extract_role_names(roles: &Value) -> Vec<String> {
    let Value::Sequence(roles) = roles else {
        return Vec::new();
    };
    roles
        .iter()
        .filter_map(|role| match role {
            Value::String(s) => Some(s.clone()),
            Value::Mapping(m) => m
                .get(Value::String("role".to_string()))
                .or_else(|| m.get(Value::String("name".to_string())))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_playbook_with_tasks_and_roles() {
        let src = b"
- hosts: web
  roles:
    - common
    - { role: nginx }
  tasks:
    - name: a
    - name: b
  handlers:
    - name: restart
";
        let result = YamlParser.parse(Path::new("site.yml"), src);
        assert!(result.success);
        let ParseMetadata::Yaml(meta) = result.metadata else {
            panic!("expected yaml metadata");
        };
        assert!(meta.is_playbook);
        assert_eq!(meta.play_count, 1);
        assert_eq!(meta.task_count, 2);
        assert_eq!(meta.handler_count, 1);
        assert_eq!(meta.role_names, vec!["common".to_string(), "nginx".to_string()]);
    }

    #[test]
    fn detects_vars_file() {
        let src = b"nginx_port: 80\nnginx_user: www-data\n";
        let result = YamlParser.parse(Path::new("vars/main.yml"), src);
        let ParseMetadata::Yaml(meta) = result.metadata else {
            panic!("expected yaml metadata");
        };
        assert!(meta.is_vars_file);
        assert_eq!(meta.var_names.len(), 2);
    }

    #[test]
    fn detects_galaxy_requirements() {
        let src = b"roles:\n  - src: geerlingguy.nginx\n";
        let result = YamlParser.parse(Path::new("requirements.yml"), src);
        let ParseMetadata::Yaml(meta) = result.metadata else {
            panic!("expected yaml metadata");
        };
        assert!(meta.is_requirements);
    }

    #[test]
    fn malformed_yaml_reports_failure_not_panic() {
        let src = b"key: [unbalanced";
        let result = YamlParser.parse(Path::new("broken.yml"), src);
        assert!(!result.success);
        assert!(!result.errors.is_empty());
    }
}
