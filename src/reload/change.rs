use crate::config::FieldDescriptor;

/// One leaf-field difference between a committed section snapshot and a
/// freshly fed candidate (`spec.md` §4.4).
#[derive(Debug, Clone)]
pub struct ConfigChange {
    pub section: String,
    pub field_path: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub dynamic: bool,
}

/// Recursively diff `before`/`after`, descending into objects and reporting
/// every changed leaf. A leaf with no matching descriptor is treated as
/// static (the conservative default — `spec.md` says untagged fields are
/// static).
pub fn diff_section(
    section: &str,
    before: &serde_json::Value,
    after: &serde_json::Value,
    descriptors: &[FieldDescriptor],
) -> Vec<ConfigChange> {
    let mut changes = Vec::new();
    walk(section, "", before, after, descriptors, &mut changes);
    changes
}

fn walk(
    section: &str,
    prefix: &str,
    before: &serde_json::Value,
    after: &serde_json::Value,
    descriptors: &[FieldDescriptor],
    out: &mut Vec<ConfigChange>,
) {
    use serde_json::Value;
    match (before, after) {
        (Value::Object(before_map), Value::Object(after_map)) => {
            let mut keys: Vec<&String> = after_map.keys().chain(before_map.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child_path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                let before_child = before_map.get(key).unwrap_or(&Value::Null);
                let after_child = after_map.get(key).unwrap_or(&Value::Null);
                walk(section, &child_path, before_child, after_child, descriptors, out);
            }
        }
        _ => {
            if before != after {
                let dynamic = descriptors
                    .iter()
                    .find(|d| d.field_path == prefix)
                    .map(|d| d.dynamic)
                    .unwrap_or(false);
                out.push(ConfigChange {
                    section: section.to_string(),
                    field_path: prefix.to_string(),
                    old_value: before.clone(),
                    new_value: after.clone(),
                    dynamic,
                });
            }
        }
    }
}
