//! Desired-driven structural diff.
//!
//! Compares a desired definition against a live object, recursing only into
//! the fields the definition mentions: anything the live object carries
//! beyond the desired fields (server-populated `status`, defaulted spec
//! fields, extra data keys) is ignored at every depth. Sequences are
//! compared index by index — order matters, and a length mismatch is a
//! difference. A desired `null` matches an absent live field.

use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Diff entries
// ---------------------------------------------------------------------------

/// What happened at one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// The live object has a sequence element the definition does not.
    Added,
    /// The definition has a field or element the live object lacks.
    Removed,
    /// Both sides have the path, with different values.
    Changed,
}

impl std::fmt::Display for DiffKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffKind::Added => f.write_str("added"),
            DiffKind::Removed => f.write_str("removed"),
            DiffKind::Changed => f.write_str("changed"),
        }
    }
}

/// One divergence between desired and live state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    /// Dotted path with `[i]` sequence indices, e.g. `spec.containers[0].image`.
    pub path: String,
    pub kind: DiffKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<Value>,
}

// ---------------------------------------------------------------------------
// Diff walk
// ---------------------------------------------------------------------------

/// Compute every divergence between `desired` and `existing`.
pub fn diff(desired: &Value, existing: &Value) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    walk("", desired, existing, &mut entries);
    entries
}

/// True iff the live object already satisfies the definition.
pub fn matches(desired: &Value, existing: &Value) -> bool {
    diff(desired, existing).is_empty()
}

fn walk(path: &str, desired: &Value, existing: &Value, out: &mut Vec<DiffEntry>) {
    match (desired, existing) {
        (Value::Object(d), Value::Object(e)) => {
            for (key, desired_value) in d {
                let child = join_key(path, key);
                match e.get(key) {
                    Some(existing_value) => walk(&child, desired_value, existing_value, out),
                    // A desired null matches an absent field.
                    None if desired_value.is_null() => {}
                    None => out.push(DiffEntry {
                        path: child,
                        kind: DiffKind::Removed,
                        desired: Some(desired_value.clone()),
                        existing: None,
                    }),
                }
            }
        }
        (Value::Array(d), Value::Array(e)) => {
            let shared = d.len().min(e.len());
            for (index, (dv, ev)) in d.iter().zip(e.iter()).enumerate().take(shared) {
                walk(&format!("{path}[{index}]"), dv, ev, out);
            }
            for (index, dv) in d.iter().enumerate().skip(shared) {
                out.push(DiffEntry {
                    path: format!("{path}[{index}]"),
                    kind: DiffKind::Removed,
                    desired: Some(dv.clone()),
                    existing: None,
                });
            }
            for (index, ev) in e.iter().enumerate().skip(shared) {
                out.push(DiffEntry {
                    path: format!("{path}[{index}]"),
                    kind: DiffKind::Added,
                    desired: None,
                    existing: Some(ev.clone()),
                });
            }
        }
        // Scalars, nulls, and type mismatches.
        _ => {
            if desired != existing {
                out.push(DiffEntry {
                    path: path.to_owned(),
                    kind: DiffKind::Changed,
                    desired: Some(desired.clone()),
                    existing: Some(existing.clone()),
                });
            }
        }
    }
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
