//! Environment difference between two snapshots.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::types::render_value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvChange {
    Added { name: String, value: String },
    Removed { name: String, value: String },
    Modified { name: String, old: String, new: String },
}

impl EnvChange {
    pub fn render(&self) -> String {
        match self {
            EnvChange::Added { name, value } => {
                format!("+ {name}={}", render_value(Some(value)))
            }
            EnvChange::Removed { name, value } => {
                format!("- {name}={}", render_value(Some(value)))
            }
            EnvChange::Modified { name, old, new } => format!(
                "~ {name}: {} -> {}",
                render_value(Some(old)),
                render_value(Some(new))
            ),
        }
    }
}

/// Changes needed to turn `before` into `after`, ordered by name.
pub fn diff_environments(
    before: &BTreeMap<String, String>,
    after: &BTreeMap<String, String>,
) -> Vec<EnvChange> {
    let mut changes = Vec::new();
    for (name, old) in before {
        match after.get(name) {
            None => changes.push(EnvChange::Removed {
                name: name.clone(),
                value: old.clone(),
            }),
            Some(new) if new != old => changes.push(EnvChange::Modified {
                name: name.clone(),
                old: old.clone(),
                new: new.clone(),
            }),
            Some(_) => {}
        }
    }
    for (name, value) in after {
        if !before.contains_key(name) {
            changes.push(EnvChange::Added {
                name: name.clone(),
                value: value.clone(),
            });
        }
    }
    changes.sort_by(|a, b| change_name(a).cmp(change_name(b)));
    changes
}

fn change_name(change: &EnvChange) -> &str {
    match change {
        EnvChange::Added { name, .. }
        | EnvChange::Removed { name, .. }
        | EnvChange::Modified { name, .. } => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let snapshot = env(&[("A", "1")]);
        assert!(diff_environments(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn reports_added_removed_and_modified_by_name() {
        let before = env(&[("B", "1"), ("C", "x")]);
        let after = env(&[("A", ""), ("C", "y")]);
        let rendered: Vec<String> = diff_environments(&before, &after)
            .iter()
            .map(EnvChange::render)
            .collect();
        assert_eq!(
            rendered,
            vec!["+ A=\"\"", "- B=\"1\"", "~ C: \"x\" -> \"y\""]
        );
    }
}
