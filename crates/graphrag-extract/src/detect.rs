//! Repo-type detector (spec §4.4), ported from the original's
//! `detect_repo_type`: ordered rules, first-winning profile, ansible
//! checked before python.

use std::path::Path;

use ignore::WalkBuilder;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub profile: String,
    pub confidence: f64,
    pub indicators: Vec<String>,
}

const ANSIBLE_FILE_INDICATORS: &[&str] = &["ansible.cfg"];
const ANSIBLE_DIR_INDICATORS: &[&str] = &[
    "playbooks",
    "roles",
    "inventory",
    "group_vars",
    "host_vars",
    ".ansible",
];
const ANSIBLE_TARGET: f64 = 3.0;

const PYTHON_FILE_INDICATORS: &[&str] = &["pyproject.toml", "setup.py", "setup.cfg", "requirements.txt"];
const PYTHON_TARGET: f64 = 2.0;

pub fn detect_repo_type(root: &Path) -> DetectionResult {
    if let Some(result) = detect_ansible(root) {
        return result;
    }
    if let Some(result) = detect_python(root) {
        return result;
    }
    DetectionResult {
        profile: "generic".to_string(),
        confidence: 0.5,
        indicators: vec!["fallback".to_string()],
    }
}

fn detect_ansible(root: &Path) -> Option<DetectionResult> {
    let mut indicators = Vec::new();

    for name in ANSIBLE_FILE_INDICATORS {
        if root.join(name).exists() {
            indicators.push((*name).to_string());
        }
    }
    for name in ANSIBLE_DIR_INDICATORS {
        if root.join(name).is_dir() {
            indicators.push((*name).to_string());
        }
    }

    let playbook_count = count_matches(root, |path| {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        (name.starts_with("playbook") && (name.ends_with(".yml") || name.ends_with(".yaml")))
            || name == "site.yml"
            || name == "main.yml"
    });
    if playbook_count > 0 {
        indicators.push(format!("playbook files ({playbook_count} found)"));
    }

    let tasks_dirs = count_matches(root, |path| path.is_dir() && path.ends_with("tasks"));
    if tasks_dirs > 0 {
        indicators.push(format!("tasks directories ({tasks_dirs} found)"));
    }
    let handlers_dirs = count_matches(root, |path| path.is_dir() && path.ends_with("handlers"));
    if handlers_dirs > 0 {
        indicators.push(format!("handlers directories ({handlers_dirs} found)"));
    }

    if indicators.is_empty() {
        return None;
    }

    let confidence = (indicators.len() as f64 / ANSIBLE_TARGET).min(1.0);
    tracing::info!(confidence, ?indicators, "detected ansible repository");
    Some(DetectionResult {
        profile: "ansible".to_string(),
        confidence,
        indicators,
    })
}

fn detect_python(root: &Path) -> Option<DetectionResult> {
    let mut indicators: Vec<String> = PYTHON_FILE_INDICATORS
        .iter()
        .filter(|name| root.join(name).exists())
        .map(|s| (*s).to_string())
        .collect();

    let src = root.join("src");
    if src.is_dir() {
        let count = count_matches(&src, |path| path.file_name().and_then(|n| n.to_str()) == Some("__init__.py"));
        if count > 0 {
            indicators.push(format!("src/**/__init__.py ({count} files)"));
        }
    }

    if indicators.is_empty() {
        return None;
    }

    let confidence = (indicators.len() as f64 / PYTHON_TARGET).min(1.0);
    tracing::info!(confidence, ?indicators, "detected python repository");
    Some(DetectionResult {
        profile: "python".to_string(),
        confidence,
        indicators,
    })
}

fn count_matches(root: &Path, predicate: impl Fn(&Path) -> bool) -> usize {
    WalkBuilder::new(root)
        .hidden(false)
        .build()
        .flatten()
        .filter(|entry| predicate(entry.path()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detects_ansible_repo_by_cfg_and_playbooks_dir() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("ansible.cfg"), "").unwrap();
        fs::create_dir(tmp.path().join("playbooks")).unwrap();

        let result = detect_repo_type(tmp.path());
        assert_eq!(result.profile, "ansible");
        assert!(result.confidence >= 0.6);
        assert!(result.indicators.contains(&"ansible.cfg".to_string()));
    }

    #[test]
    fn detects_python_repo_by_pyproject() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("pyproject.toml"), "").unwrap();

        let result = detect_repo_type(tmp.path());
        assert_eq!(result.profile, "python");
    }

    #[test]
    fn falls_back_to_generic_with_no_indicators() {
        let tmp = tempfile::tempdir().unwrap();
        let result = detect_repo_type(tmp.path());
        assert_eq!(result.profile, "generic");
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn ansible_is_checked_before_python() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("ansible.cfg"), "").unwrap();
        fs::write(tmp.path().join("pyproject.toml"), "").unwrap();

        let result = detect_repo_type(tmp.path());
        assert_eq!(result.profile, "ansible");
    }
}
