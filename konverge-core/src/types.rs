//! Domain types for konverge.
//!
//! A [`ResourceDefinition`] is a validated desired-state manifest for a single
//! cluster object. Bodies are kept as `serde_json` trees: the shape of a
//! definition beyond `kind`/`apiVersion`/`metadata` is opaque to this crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DefinitionError;

/// Module-level parameter names that may ride along in a pasted manifest.
///
/// These are stripped from the working definition before any diff or
/// mutation so they never reach the cluster.
pub const ALIAS_FIELDS: &[&str] = &["state", "force", "src"];

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Desired state for a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Present => write!(f, "present"),
            State::Absent => write!(f, "absent"),
        }
    }
}

impl FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "present" => Ok(State::Present),
            "absent" => Ok(State::Absent),
            other => Err(format!("unknown state '{other}'; expected: present, absent")),
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceDefinition
// ---------------------------------------------------------------------------

/// A desired-state manifest for a single cluster object.
///
/// Invariant: `kind` and `apiVersion` are present and non-empty — enforced at
/// construction, so the accessors can return `&str` without re-checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResourceDefinition {
    body: Map<String, Value>,
}

impl ResourceDefinition {
    /// Build a definition from a parsed document, validating the invariant.
    pub fn from_body(body: Map<String, Value>) -> Result<Self, DefinitionError> {
        match body.get("kind").and_then(Value::as_str) {
            Some(k) if !k.is_empty() => {}
            _ => return Err(DefinitionError::MissingKind),
        }
        match body.get("apiVersion").and_then(Value::as_str) {
            Some(v) if !v.is_empty() => {}
            _ => return Err(DefinitionError::MissingApiVersion),
        }
        Ok(Self { body })
    }

    /// Synthesize a minimal definition from explicit parameters.
    ///
    /// Used when no inline body was given (for example `state=absent` with
    /// just `kind`/`api_version`/`name` parameters).
    pub fn from_parameters(kind: &str, api_version: &str) -> Result<Self, DefinitionError> {
        let mut body = Map::new();
        body.insert("kind".to_owned(), Value::String(kind.to_owned()));
        body.insert(
            "apiVersion".to_owned(),
            Value::String(api_version.to_owned()),
        );
        Self::from_body(body)
    }

    pub fn kind(&self) -> &str {
        self.body
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn api_version(&self) -> &str {
        self.body
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// `metadata.name`, when present.
    pub fn name(&self) -> Option<&str> {
        self.metadata_field("name")
    }

    /// `metadata.namespace`, when present.
    pub fn namespace(&self) -> Option<&str> {
        self.metadata_field("namespace")
    }

    fn metadata_field(&self, field: &str) -> Option<&str> {
        self.body
            .get("metadata")
            .and_then(Value::as_object)
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
    }

    /// The definition body as sent to the cluster and used for diffing.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// The body as a JSON value (cloned), for request payloads.
    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }

    /// Strip module-internal alias parameters from the body.
    pub fn strip_alias_fields(&mut self) {
        for field in ALIAS_FIELDS {
            self.body.remove(*field);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body_of(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn state_parse_and_display() {
        assert_eq!("present".parse::<State>().unwrap(), State::Present);
        assert_eq!("Absent".parse::<State>().unwrap(), State::Absent);
        assert_eq!(State::Absent.to_string(), "absent");
        assert!("gone".parse::<State>().is_err());
    }

    #[test]
    fn definition_accessors() {
        let def = ResourceDefinition::from_body(body_of(json!({
            "kind": "ConfigMap",
            "apiVersion": "v1",
            "metadata": {"name": "a", "namespace": "ns"},
            "data": {"k": "v"},
        })))
        .unwrap();
        assert_eq!(def.kind(), "ConfigMap");
        assert_eq!(def.api_version(), "v1");
        assert_eq!(def.name(), Some("a"));
        assert_eq!(def.namespace(), Some("ns"));
    }

    #[test]
    fn missing_kind_is_rejected() {
        let err = ResourceDefinition::from_body(body_of(json!({"apiVersion": "v1"}))).unwrap_err();
        assert!(matches!(err, DefinitionError::MissingKind));
    }

    #[test]
    fn empty_api_version_is_rejected() {
        let err =
            ResourceDefinition::from_body(body_of(json!({"kind": "Pod", "apiVersion": ""})))
                .unwrap_err();
        assert!(matches!(err, DefinitionError::MissingApiVersion));
    }

    #[test]
    fn alias_fields_are_stripped() {
        let mut def = ResourceDefinition::from_body(body_of(json!({
            "kind": "ConfigMap",
            "apiVersion": "v1",
            "state": "present",
            "force": true,
            "data": {"k": "v"},
        })))
        .unwrap();
        def.strip_alias_fields();
        assert!(def.body().get("state").is_none());
        assert!(def.body().get("force").is_none());
        assert!(def.body().get("data").is_some(), "payload fields survive");
    }
}
