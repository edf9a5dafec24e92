//! Ansible extractor (spec §4.3): playbooks, plays, tasks, handlers,
//! roles, variables, templates, galaxy requirements, and (via the bundled
//! Python/Ruby parsers) inventory scripts and Vagrantfiles. Every collected
//! file gets a `File` node and an `IN_FILE` edge from whatever it contains,
//! and `include_tasks`/`import_tasks`/`include_role`/`import_role` tasks
//! contribute `INCLUDES`/`IMPORTS` edges.
//!
//! Grounded on the original's `playbook_extractor.py` (play/task/handler
//! structure, notify placeholder handlers, role/vars-file/template
//! linking), `ansible_extractor.py::_create_file_node` (the `File` node
//! created ahead of per-type dispatch), and `yaml_parser.py` (playbook/
//! vars/requirements detection).

use std::path::Path;

use graphrag_core::model::{EndpointRef, RawEdge, RawEntity};
use graphrag_parser::{yaml::YamlParser, JinjaMeta, ParseMetadata, ParseTree, Parser as _};
use serde_yaml::Value;
use sha2::{Digest, Sha256};

use crate::walk::discover_files;
use crate::Extractor;

pub struct AnsibleExtractor;

const RESERVED_TASK_KEYS: &[&str] = &[
    "name", "when", "loop", "register", "become", "notify", "tags", "vars", "with_items",
    "delegate_to", "ignore_errors", "changed_when", "failed_when", "block", "rescue", "always",
];

fn str_prop(map: &serde_yaml::Mapping, key: &str) -> Option<String> {
    map.get(Value::String(key.to_string()))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn task_module(map: &serde_yaml::Mapping) -> String {
    map.keys()
        .filter_map(|k| k.as_str())
        .find(|k| !RESERVED_TASK_KEYS.contains(k))
        .unwrap_or("unknown")
        .to_string()
}

/// A module's argument, whichever shorthand the playbook used: a bare
/// string (`include_tasks: foo.yml`) or a mapping with `file`/`name`
/// (`include_role: {name: nginx}`).
fn module_arg_str(map: &serde_yaml::Mapping, module: &str) -> Option<String> {
    match map.get(Value::String(module.to_string()))? {
        Value::String(s) => Some(s.clone()),
        Value::Mapping(m) => str_prop(m, "file").or_else(|| str_prop(m, "name")),
        _ => None,
    }
}

fn yaml_files(root: &Path) -> Vec<std::path::PathBuf> {
    discover_files(root)
        .into_iter()
        .filter(|f| {
            matches!(
                f.extension().and_then(|e| e.to_str()),
                Some("yml") | Some("yaml")
            )
        })
        .collect()
}

fn content_hash(source: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source);
    format!("{:x}", hasher.finalize())
}

/// A `File` node for every discovered file, mirroring `_create_file_node`:
/// the original creates one of these before dispatching on extension, so a
/// file that isn't a playbook/vars-file/template/inventory still shows up.
fn file_entity(repository_id: &str, rel: &str, source: &[u8]) -> RawEntity {
    RawEntity::new("File")
        .with("repository", repository_id)
        .with("path", rel.to_string())
        .with("content_hash", content_hash(source))
}

fn in_file_edge(source: EndpointRef, file_rel: &str) -> RawEdge {
    RawEdge {
        kind: "IN_FILE".to_string(),
        source,
        target: EndpointRef {
            kind: "File".to_string(),
            path: Some(file_rel.to_string()),
            name: None,
        },
        properties: Default::default(),
    }
}

struct Ctx<'a> {
    repository_id: &'a str,
    playbook_path: String,
    file_path: String,
}

fn extract_playbook(
    plays: &[Value],
    ctx: &Ctx,
    entities: &mut Vec<RawEntity>,
    edges: &mut Vec<RawEdge>,
) {
    entities.push(
        RawEntity::new("Playbook")
            .with("repository", ctx.repository_id)
            .with("path", ctx.playbook_path.clone()),
    );
    edges.push(in_file_edge(
        EndpointRef {
            kind: "Playbook".to_string(),
            path: Some(ctx.playbook_path.clone()),
            name: None,
        },
        &ctx.file_path,
    ));

    for (order, play) in plays.iter().enumerate() {
        let Value::Mapping(play_map) = play else {
            continue;
        };
        let play_name = str_prop(play_map, "name")
            .unwrap_or_else(|| format!("<unnamed play {order}>"));
        entities.push(
            RawEntity::new("Play")
                .with("repository", ctx.repository_id)
                .with("name", play_name.clone())
                .with("playbook_path", ctx.playbook_path.clone())
                .with("order", order as i64)
                .with("hosts", str_prop(play_map, "hosts").unwrap_or_else(|| "all".to_string())),
        );
        edges.push(RawEdge {
            kind: "HAS_PLAY".to_string(),
            source: EndpointRef {
                kind: "Playbook".to_string(),
                path: Some(ctx.playbook_path.clone()),
                name: None,
            },
            target: EndpointRef {
                kind: "Play".to_string(),
                path: None,
                name: Some(play_name.clone()),
            },
            properties: Default::default(),
        });
        edges.push(in_file_edge(
            EndpointRef {
                kind: "Play".to_string(),
                path: None,
                name: Some(play_name.clone()),
            },
            &ctx.file_path,
        ));

        for task_key in ["tasks", "pre_tasks", "post_tasks"] {
            if let Some(Value::Sequence(tasks)) = play_map.get(Value::String(task_key.to_string()))
            {
                for (task_order, task) in tasks.iter().enumerate() {
                    extract_task(task, task_order, &play_name, ctx, entities, edges);
                }
            }
        }

        if let Some(Value::Sequence(handlers)) = play_map.get(Value::String("handlers".to_string())) {
            for handler in handlers {
                extract_handler(handler, ctx, entities, edges);
            }
        }

        if let Some(roles) = play_map.get(Value::String("roles".to_string())) {
            for role_name in role_names(roles) {
                entities.push(RawEntity::new("Role").with("name", role_name.clone()));
                edges.push(RawEdge {
                    kind: "USES_ROLE".to_string(),
                    source: EndpointRef {
                        kind: "Play".to_string(),
                        path: None,
                        name: Some(play_name.clone()),
                    },
                    target: EndpointRef {
                        kind: "Role".to_string(),
                        path: None,
                        name: Some(role_name),
                    },
                    properties: Default::default(),
                });
            }
        }

        if let Some(Value::Sequence(vars_files)) =
            play_map.get(Value::String("vars_files".to_string()))
        {
            for vars_file in vars_files.iter().filter_map(|v| v.as_str()) {
                entities.push(
                    RawEntity::new("VarsFile")
                        .with("repository", ctx.repository_id)
                        .with("path", vars_file.to_string()),
                );
                edges.push(RawEdge {
                    kind: "LOADS_VARS".to_string(),
                    source: EndpointRef {
                        kind: "Play".to_string(),
                        path: None,
                        name: Some(play_name.clone()),
                    },
                    target: EndpointRef {
                        kind: "VarsFile".to_string(),
                        path: Some(vars_file.to_string()),
                        name: None,
                    },
                    properties: Default::default(),
                });
            }
        }
    }
}

fn extract_task(
    task: &Value,
    order: usize,
    play_name: &str,
    ctx: &Ctx,
    entities: &mut Vec<RawEntity>,
    edges: &mut Vec<RawEdge>,
) {
    let Value::Mapping(map) = task else { return };
    let name = str_prop(map, "name").unwrap_or_else(|| format!("<unnamed task {order}>"));
    let module = task_module(map);

    entities.push(
        RawEntity::new("Task")
            .with("repository", ctx.repository_id)
            .with("name", name.clone())
            .with("file_path", ctx.file_path.clone())
            .with("order", order as i64)
            .with("module", module.clone()),
    );
    edges.push(RawEdge {
        kind: "HAS_TASK".to_string(),
        source: EndpointRef {
            kind: "Play".to_string(),
            path: None,
            name: Some(play_name.to_string()),
        },
        target: EndpointRef {
            kind: "Task".to_string(),
            path: Some(ctx.file_path.clone()),
            name: Some(name.clone()),
        },
        properties: Default::default(),
    });
    edges.push(in_file_edge(
        EndpointRef {
            kind: "Task".to_string(),
            path: Some(ctx.file_path.clone()),
            name: Some(name.clone()),
        },
        &ctx.file_path,
    ));

    if let Some(notify) = map.get(Value::String("notify".to_string())) {
        for handler_name in notify_names(notify) {
            // Placeholder handler node: merges with the actually-defined
            // handler later via composite key.
            entities.push(
                RawEntity::new("Handler")
                    .with("repository", ctx.repository_id)
                    .with("name", handler_name.clone())
                    .with("file_path", ctx.file_path.clone()),
            );
            edges.push(RawEdge {
                kind: "NOTIFIES".to_string(),
                source: EndpointRef {
                    kind: "Task".to_string(),
                    path: Some(ctx.file_path.clone()),
                    name: Some(name.clone()),
                },
                target: EndpointRef {
                    kind: "Handler".to_string(),
                    path: Some(ctx.file_path.clone()),
                    name: Some(handler_name),
                },
                properties: Default::default(),
            });
        }
    }

    if let Some(register) = str_prop(map, "register") {
        entities.push(
            RawEntity::new("Variable")
                .with("repository", ctx.repository_id)
                .with("name", register.clone())
                .with("scope", "play")
                .with("file_path", ctx.file_path.clone()),
        );
        edges.push(RawEdge {
            kind: "DEFINES_VAR".to_string(),
            source: EndpointRef {
                kind: "Task".to_string(),
                path: Some(ctx.file_path.clone()),
                name: Some(name.clone()),
            },
            target: EndpointRef {
                kind: "Variable".to_string(),
                path: Some(ctx.file_path.clone()),
                name: Some(register),
            },
            properties: Default::default(),
        });
    }

    // INCLUDES/IMPORTS: not in the original (which never implements the
    // Ansible relationship types it declares in schema.py), built from the
    // file this task lives in to whatever it pulls in, the way
    // `find_dependencies` expects a File source.
    if matches!(module.as_str(), "include_tasks" | "import_tasks") {
        if let Some(target) = module_arg_str(map, &module) {
            let kind = if module == "include_tasks" { "INCLUDES" } else { "IMPORTS" };
            edges.push(RawEdge {
                kind: kind.to_string(),
                source: EndpointRef {
                    kind: "File".to_string(),
                    path: Some(ctx.file_path.clone()),
                    name: None,
                },
                target: EndpointRef {
                    kind: "File".to_string(),
                    path: Some(target),
                    name: None,
                },
                properties: Default::default(),
            });
        }
    } else if matches!(module.as_str(), "include_role" | "import_role") {
        if let Some(role_name) = module_arg_str(map, &module) {
            entities.push(RawEntity::new("Role").with("name", role_name.clone()));
            let kind = if module == "include_role" { "INCLUDES" } else { "IMPORTS" };
            edges.push(RawEdge {
                kind: kind.to_string(),
                source: EndpointRef {
                    kind: "File".to_string(),
                    path: Some(ctx.file_path.clone()),
                    name: None,
                },
                target: EndpointRef {
                    kind: "Role".to_string(),
                    path: None,
                    name: Some(role_name),
                },
                properties: Default::default(),
            });
        }
    }

    if matches!(module.as_str(), "template" | "copy")
        && let Some(Value::Mapping(args)) = map.get(Value::String(module.clone()))
    {
        let template_path = str_prop(args, "src").or_else(|| str_prop(args, "template"));
        if let Some(path) = template_path.filter(|p| p.ends_with(".j2")) {
            entities.push(RawEntity::new("Template").with("repository", ctx.repository_id).with("path", path.clone()));
            edges.push(RawEdge {
                kind: "USES_TEMPLATE".to_string(),
                source: EndpointRef {
                    kind: "Task".to_string(),
                    path: Some(ctx.file_path.clone()),
                    name: Some(name),
                },
                target: EndpointRef {
                    kind: "Template".to_string(),
                    path: Some(path),
                    name: None,
                },
                properties: Default::default(),
            });
        }
    }
}

fn extract_handler(handler: &Value, ctx: &Ctx, entities: &mut Vec<RawEntity>, edges: &mut Vec<RawEdge>) {
    let Value::Mapping(map) = handler else { return };
    let name = str_prop(map, "name").unwrap_or_else(|| "<unnamed handler>".to_string());
    entities.push(
        RawEntity::new("Handler")
            .with("repository", ctx.repository_id)
            .with("name", name.clone())
            .with("file_path", ctx.file_path.clone()),
    );
    edges.push(RawEdge {
        kind: "HAS_HANDLER".to_string(),
        source: EndpointRef {
            kind: "Playbook".to_string(),
            path: Some(ctx.playbook_path.clone()),
            name: None,
        },
        target: EndpointRef {
            kind: "Handler".to_string(),
            path: Some(ctx.file_path.clone()),
            name: Some(name.clone()),
        },
        properties: Default::default(),
    });
    edges.push(in_file_edge(
        EndpointRef {
            kind: "Handler".to_string(),
            path: Some(ctx.file_path.clone()),
            name: Some(name),
        },
        &ctx.file_path,
    ));
}

fn role_names(roles: &Value) -> Vec<String> {
    let Value::Sequence(roles) = roles else {
        return Vec::new();
    };
    roles
        .iter()
        .filter_map(|r| match r {
            Value::String(s) => Some(s.clone()),
            Value::Mapping(m) => str_prop(m, "role").or_else(|| str_prop(m, "name")),
            _ => None,
        })
        .collect()
}

fn notify_names(notify: &Value) -> Vec<String> {
    match notify {
        Value::String(s) => vec![s.clone()],
        Value::Sequence(seq) => seq.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

fn extract_vars_file(map: &serde_yaml::Mapping, ctx: &Ctx, entities: &mut Vec<RawEntity>, edges: &mut Vec<RawEdge>) {
    entities.push(
        RawEntity::new("VarsFile")
            .with("repository", ctx.repository_id)
            .with("path", ctx.file_path.clone()),
    );
    edges.push(in_file_edge(
        EndpointRef {
            kind: "VarsFile".to_string(),
            path: Some(ctx.file_path.clone()),
            name: None,
        },
        &ctx.file_path,
    ));
    for key in map.keys().filter_map(|k| k.as_str()) {
        entities.push(
            RawEntity::new("Variable")
                .with("repository", ctx.repository_id)
                .with("name", key.to_string())
                .with("scope", "file")
                .with("file_path", ctx.file_path.clone()),
        );
        edges.push(RawEdge {
            kind: "DEFINES_VAR".to_string(),
            source: EndpointRef {
                kind: "VarsFile".to_string(),
                path: Some(ctx.file_path.clone()),
                name: None,
            },
            target: EndpointRef {
                kind: "Variable".to_string(),
                path: Some(ctx.file_path.clone()),
                name: Some(key.to_string()),
            },
            properties: Default::default(),
        });
    }
}

/// Galaxy requirements: role entries become `DEPENDS_ON` edges from the
/// owning role (the `roles/<name>/` directory the requirements file lives
/// under) to each required role. Top-level `requirements.yml` files with no
/// enclosing role only contribute the required `Role` entities.
fn extract_requirements(value: &Value, ctx: &Ctx, entities: &mut Vec<RawEntity>, edges: &mut Vec<RawEdge>) {
    let roles_value = match value {
        Value::Mapping(m) => m.get(Value::String("roles".to_string())).cloned(),
        Value::Sequence(_) => Some(value.clone()),
        _ => None,
    };
    let Some(roles_value) = roles_value else { return };
    let owning_role = owning_role_name(&ctx.file_path);

    for required in role_names(&roles_value) {
        entities.push(RawEntity::new("Role").with("name", required.clone()));
        edges.push(in_file_edge(
            EndpointRef {
                kind: "Role".to_string(),
                path: None,
                name: Some(required.clone()),
            },
            &ctx.file_path,
        ));
        if let Some(owner) = &owning_role {
            entities.push(RawEntity::new("Role").with("name", owner.clone()));
            edges.push(RawEdge {
                kind: "DEPENDS_ON".to_string(),
                source: EndpointRef {
                    kind: "Role".to_string(),
                    path: None,
                    name: Some(owner.clone()),
                },
                target: EndpointRef {
                    kind: "Role".to_string(),
                    path: None,
                    name: Some(required),
                },
                properties: Default::default(),
            });
        }
    }
}

fn owning_role_name(file_path: &str) -> Option<String> {
    let parts: Vec<&str> = file_path.split('/').collect();
    parts
        .iter()
        .position(|p| *p == "roles")
        .and_then(|i| parts.get(i + 1))
        .map(|s| (*s).to_string())
}

fn jinja_templates(root: &Path) -> Vec<std::path::PathBuf> {
    discover_files(root)
        .into_iter()
        .filter(|f| {
            let ext_match = matches!(
                f.extension().and_then(|e| e.to_str()),
                Some("j2") | Some("jinja2")
            );
            let under_templates = f.components().any(|c| c.as_os_str() == "templates");
            ext_match || under_templates
        })
        .collect()
}

fn extract_template(path: &Path, root: &Path, ctx_repo: &str, meta: &JinjaMeta, entities: &mut Vec<RawEntity>, edges: &mut Vec<RawEdge>) {
    let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy().into_owned();
    entities.push(RawEntity::new("Template").with("repository", ctx_repo).with("path", rel.clone()));
    edges.push(in_file_edge(
        EndpointRef {
            kind: "Template".to_string(),
            path: Some(rel.clone()),
            name: None,
        },
        &rel,
    ));
    for var in &meta.variables_used {
        entities.push(
            RawEntity::new("Variable")
                .with("repository", ctx_repo)
                .with("name", var.clone())
                .with("scope", "template")
                .with("file_path", rel.clone()),
        );
        edges.push(RawEdge {
            kind: "USES_VAR".to_string(),
            source: EndpointRef {
                kind: "Template".to_string(),
                path: Some(rel.clone()),
                name: None,
            },
            target: EndpointRef {
                kind: "Variable".to_string(),
                path: Some(rel.clone()),
                name: Some(var.clone()),
            },
            properties: Default::default(),
        });
    }
}

impl Extractor for AnsibleExtractor {
    fn schema_profile(&self) -> &'static str {
        "ansible"
    }

    fn extract_entities(&self, root: &Path, repository_id: &str) -> Vec<RawEntity> {
        let (entities, _) = self.run(root, repository_id);
        entities
    }

    fn extract_edges(&self, root: &Path, repository_id: &str) -> Vec<RawEdge> {
        let (_, edges) = self.run(root, repository_id);
        edges
    }
}

impl AnsibleExtractor {
    fn run(&self, root: &Path, repository_id: &str) -> (Vec<RawEntity>, Vec<RawEdge>) {
        let mut entities = Vec::new();
        let mut edges = Vec::new();

        // Every collected file gets a `File` node first, before any
        // type-specific dispatch, matching `_create_file_node` running
        // ahead of `_process_yaml_file`/`_process_python_file`/etc. This is
        // what lets `find_dependencies` match a file at all, parseable or not.
        for file in discover_files(root) {
            let Ok(source) = std::fs::read(&file) else {
                continue;
            };
            let rel = file.strip_prefix(root).unwrap_or(&file).to_string_lossy().into_owned();
            entities.push(file_entity(repository_id, &rel, &source));
        }

        for file in yaml_files(root) {
            let rel = file.strip_prefix(root).unwrap_or(&file).to_string_lossy().into_owned();
            let Ok(source) = std::fs::read(&file) else {
                continue;
            };
            let result = YamlParser.parse(&file, &source);
            if !result.success {
                continue;
            }
            let ParseMetadata::Yaml(meta) = &result.metadata else {
                continue;
            };
            let Some(ParseTree::Yaml(value)) = &result.root else {
                continue;
            };

            let ctx = Ctx {
                repository_id,
                playbook_path: rel.clone(),
                file_path: rel.clone(),
            };

            if meta.is_playbook {
                if let Value::Sequence(plays) = value {
                    extract_playbook(plays, &ctx, &mut entities, &mut edges);
                }
            } else if meta.is_requirements {
                extract_requirements(value, &ctx, &mut entities, &mut edges);
            } else if meta.is_vars_file && let Value::Mapping(map) = value {
                extract_vars_file(map, &ctx, &mut entities, &mut edges);
            }
        }

        for template_path in jinja_templates(root) {
            let Ok(source) = std::fs::read(&template_path) else {
                continue;
            };
            let result = graphrag_parser::jinja::JinjaParser.parse(&template_path, &source);
            if let ParseMetadata::Jinja(meta) = &result.metadata {
                extract_template(&template_path, root, repository_id, meta, &mut entities, &mut edges);
            }
        }

        for file in discover_files(root) {
            if file.file_name().and_then(|n| n.to_str()) == Some("Vagrantfile") {
                let Ok(source) = std::fs::read(&file) else { continue };
                let result = graphrag_parser::ruby::RubyParser.parse(&file, &source);
                if let ParseMetadata::Ruby(meta) = &result.metadata {
                    tracing::debug!(boxes = ?meta.boxes, "parsed vagrantfile");
                }
            }
        }

        for file in discover_files(root) {
            let is_inventory_candidate = file.extension().and_then(|e| e.to_str()) == Some("py")
                && (file.components().any(|c| c.as_os_str() == "inventory")
                    || file
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .is_some_and(|s| s.starts_with("inventory_")));
            if !is_inventory_candidate {
                continue;
            }
            let Ok(source) = std::fs::read(&file) else { continue };
            let result = graphrag_parser::python::PythonParser.parse(&file, &source);
            if let ParseMetadata::Python(meta) = &result.metadata
                && meta.is_inventory
            {
                let rel = file.strip_prefix(root).unwrap_or(&file).to_string_lossy().into_owned();
                entities.push(
                    RawEntity::new("Inventory")
                        .with("repository", repository_id)
                        .with("path", rel.clone())
                        .with("is_inventory", true),
                );
                edges.push(in_file_edge(
                    EndpointRef {
                        kind: "Inventory".to_string(),
                        path: Some(rel.clone()),
                        name: None,
                    },
                    &rel,
                ));
            }
        }

        (entities, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn extracts_playbook_play_and_task() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("site.yml"),
            "- hosts: web\n  tasks:\n    - name: install nginx\n      apt:\n        name: nginx\n",
        )
        .unwrap();

        let (entities, edges) = AnsibleExtractor.run(tmp.path(), "repo1");
        assert!(entities.iter().any(|e| e.kind == "Playbook"));
        assert!(entities.iter().any(|e| e.kind == "Play"));
        let task = entities.iter().find(|e| e.kind == "Task").unwrap();
        assert_eq!(task.get("module").unwrap().as_str(), Some("apt"));
        assert!(edges.iter().any(|e| e.kind == "HAS_PLAY"));
        assert!(edges.iter().any(|e| e.kind == "HAS_TASK"));
    }

    #[test]
    fn notify_creates_placeholder_handler_and_notifies_edge() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("site.yml"),
            "- hosts: web\n  tasks:\n    - name: update config\n      template:\n        src: app.conf.j2\n      notify: restart app\n",
        )
        .unwrap();

        let (entities, edges) = AnsibleExtractor.run(tmp.path(), "repo1");
        assert!(entities.iter().any(|e| e.kind == "Handler" && e.get("name").unwrap().as_str() == Some("restart app")));
        assert!(edges.iter().any(|e| e.kind == "NOTIFIES"));
        assert!(edges.iter().any(|e| e.kind == "USES_TEMPLATE"));
    }

    #[test]
    fn galaxy_requirements_under_role_dir_produce_depends_on() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("roles/web")).unwrap();
        fs::write(
            tmp.path().join("roles/web/requirements.yml"),
            "roles:\n  - src: geerlingguy.nginx\n",
        )
        .unwrap();

        let (_, edges) = AnsibleExtractor.run(tmp.path(), "repo1");
        assert!(edges.iter().any(|e| e.kind == "DEPENDS_ON"
            && e.source.name.as_deref() == Some("web")
            && e.target.name.as_deref() == Some("geerlingguy.nginx")));
    }

    #[test]
    fn every_discovered_file_gets_a_file_node_and_in_file_edge() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("site.yml"),
            "- hosts: web\n  tasks:\n    - name: install nginx\n      apt:\n        name: nginx\n",
        )
        .unwrap();

        let (entities, edges) = AnsibleExtractor.run(tmp.path(), "repo1");
        let file = entities.iter().find(|e| e.kind == "File").unwrap();
        assert_eq!(file.get("path").unwrap().as_str(), Some("site.yml"));
        assert!(file.get("content_hash").is_some());
        assert!(edges.iter().any(|e| e.kind == "IN_FILE"
            && e.source.kind == "Playbook"
            && e.target.path.as_deref() == Some("site.yml")));
        assert!(edges.iter().any(|e| e.kind == "IN_FILE" && e.source.kind == "Task"));
    }

    #[test]
    fn unparseable_yaml_still_contributes_its_file_node() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("broken.yml"), "- hosts: [unterminated\n").unwrap();

        let (entities, _) = AnsibleExtractor.run(tmp.path(), "repo1");
        assert!(entities.iter().any(|e| e.kind == "File" && e.get("path").unwrap().as_str() == Some("broken.yml")));
        assert!(!entities.iter().any(|e| e.kind == "Playbook"));
    }

    #[test]
    fn include_tasks_produces_includes_edge_between_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("site.yml"),
            "- hosts: web\n  tasks:\n    - include_tasks: setup.yml\n",
        )
        .unwrap();

        let (_, edges) = AnsibleExtractor.run(tmp.path(), "repo1");
        assert!(edges.iter().any(|e| e.kind == "INCLUDES"
            && e.source.kind == "File"
            && e.source.path.as_deref() == Some("site.yml")
            && e.target.kind == "File"
            && e.target.path.as_deref() == Some("setup.yml")));
    }

    #[test]
    fn include_role_produces_includes_edge_to_role() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("site.yml"),
            "- hosts: web\n  tasks:\n    - include_role:\n        name: nginx\n",
        )
        .unwrap();

        let (entities, edges) = AnsibleExtractor.run(tmp.path(), "repo1");
        assert!(entities.iter().any(|e| e.kind == "Role" && e.get("name").unwrap().as_str() == Some("nginx")));
        assert!(edges.iter().any(|e| e.kind == "INCLUDES"
            && e.source.kind == "File"
            && e.target.kind == "Role"
            && e.target.name.as_deref() == Some("nginx")));
    }
}
