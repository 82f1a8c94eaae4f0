//! Definition input resolution and manifest loading.
//!
//! Two ways definitions enter a run:
//! - an inline definition body (one object), or
//! - a source file containing one or more YAML/JSON documents.
//!
//! The forms are mutually exclusive. Document order in a source file is
//! preserved and becomes processing order.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DefinitionError;
use crate::types::ResourceDefinition;

// ---------------------------------------------------------------------------
// DefinitionInput
// ---------------------------------------------------------------------------

/// The raw definition-bearing parameters, resolved once at the boundary.
///
/// Precedence: a non-empty inline body supplies its own `kind`/`apiVersion`
/// and the separately supplied parameters are ignored. An empty or absent
/// inline body requires both parameters and synthesizes a minimal definition
/// from them.
#[derive(Debug, Clone, Default)]
pub struct DefinitionInput {
    pub inline: Option<Map<String, Value>>,
    pub src: Option<PathBuf>,
    pub kind: Option<String>,
    pub api_version: Option<String>,
}

impl DefinitionInput {
    /// Resolve into the ordered list of definitions for this run.
    ///
    /// All failures here are configuration errors: no cluster access has
    /// happened yet.
    pub fn resolve(self) -> Result<Vec<ResourceDefinition>, DefinitionError> {
        if self.inline.is_some() && self.src.is_some() {
            return Err(DefinitionError::InlineAndSrc);
        }

        if let Some(path) = self.src {
            return load_definitions(&path);
        }

        match self.inline {
            Some(body) if !body.is_empty() => Ok(vec![ResourceDefinition::from_body(body)?]),
            _ => {
                let kind = self
                    .kind
                    .as_deref()
                    .filter(|k| !k.is_empty())
                    .ok_or(DefinitionError::MissingKind)?;
                let api_version = self
                    .api_version
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .ok_or(DefinitionError::MissingApiVersion)?;
                Ok(vec![ResourceDefinition::from_parameters(kind, api_version)?])
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest loading
// ---------------------------------------------------------------------------

/// Load every definition from a multi-document YAML (or JSON) manifest.
///
/// Empty documents are skipped. A non-mapping document or one missing
/// `kind`/`apiVersion` fails the whole load.
pub fn load_definitions(path: &Path) -> Result<Vec<ResourceDefinition>, DefinitionError> {
    let contents = std::fs::read_to_string(path).map_err(|e| DefinitionError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_documents(&contents, path)
}

fn parse_documents(contents: &str, path: &Path) -> Result<Vec<ResourceDefinition>, DefinitionError> {
    let mut definitions = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(contents).enumerate() {
        let value = Value::deserialize(document).map_err(|e| DefinitionError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        match value {
            Value::Null => continue,
            Value::Object(body) => definitions.push(ResourceDefinition::from_body(body)?),
            _ => {
                return Err(DefinitionError::NotAMapping {
                    path: path.to_path_buf(),
                    index,
                })
            }
        }
    }
    Ok(definitions)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
