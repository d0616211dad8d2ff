use serde_json::Value;

/// A leaf that differs between two JSON documents.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Change {
    pub path: String,
    pub old: Value,
    pub new: Value,
}

fn child_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Collect the changed leaves of `current` relative to `previous`.
/// Objects and arrays are walked; keys only present in `previous`
/// are reported with a `null` new value.
pub(crate) fn diff_json(previous: &Value, current: &Value, prefix: &str, changes: &mut Vec<Change>) {
    match (previous, current) {
        (Value::Object(prev), Value::Object(curr)) => {
            for (key, curr_val) in curr {
                let path = child_path(prefix, key);
                let prev_val = prev.get(key).unwrap_or(&Value::Null);
                diff_json(prev_val, curr_val, &path, changes);
            }
            for (key, prev_val) in prev {
                if !curr.contains_key(key) {
                    changes.push(Change {
                        path: child_path(prefix, key),
                        old: prev_val.clone(),
                        new: Value::Null,
                    });
                }
            }
        }
        (Value::Array(prev), Value::Array(curr)) if prev.len() == curr.len() => {
            for (i, (p, c)) in prev.iter().zip(curr).enumerate() {
                diff_json(p, c, &child_path(prefix, &i.to_string()), changes);
            }
        }
        (Value::Null, Value::Object(curr)) => {
            for (key, curr_val) in curr {
                diff_json(&Value::Null, curr_val, &child_path(prefix, key), changes);
            }
        }
        (prev, curr) if prev != curr => changes.push(Change {
            path: prefix.to_string(),
            old: prev.clone(),
            new: curr.clone(),
        }),
        _ => {}
    }
}

pub(crate) fn changed_paths(previous: &Value, current: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    diff_json(previous, current, "", &mut changes);
    changes
}
