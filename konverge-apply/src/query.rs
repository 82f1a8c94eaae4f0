//! Read-only object queries.
//!
//! The lookup counterpart to reconciliation: fetch a single object by name,
//! or list the objects of a kind filtered by label/field selectors, scoped
//! to one namespace or to the whole cluster. Never mutates anything.

use serde_json::Value;

use konverge_client::{Cluster, ResourceEndpoint, Selector};

use crate::error::ApplyError;
use crate::reconciler::resolve_endpoint;

/// Query parameters, built once at the boundary.
#[derive(Debug, Clone, Default)]
pub struct QueryConfig {
    /// Fetch exactly this object instead of listing.
    pub name: Option<String>,
    pub namespace: Option<String>,
    /// List across every namespace; ignored when `name` is set.
    pub all_namespaces: bool,
    /// Label selector expression, e.g. `app=web,tier!=cache`.
    pub label_selector: Option<String>,
    /// Field selector expression, e.g. `metadata.name=web`.
    pub field_selector: Option<String>,
}

/// The matching objects, in listing order.
///
/// A named query returns zero or one object; a missing object is an empty
/// result, not an error. A list query unwraps the listing's `items`.
pub fn query<C: Cluster>(
    cluster: &C,
    config: &QueryConfig,
    kind: &str,
    api_version: &str,
) -> Result<Vec<Value>, ApplyError> {
    let endpoint = resolve_endpoint(cluster, kind, api_version)?;

    if let Some(name) = &config.name {
        let object = endpoint
            .get(name, config.namespace.as_deref())
            .map_err(|source| ApplyError::Get {
                name: name.clone(),
                source,
            })?;
        log::debug!("queried {kind} {name}: {}", if object.is_some() { "found" } else { "absent" });
        return Ok(object.into_iter().collect());
    }

    let namespace = if config.all_namespaces {
        None
    } else {
        config.namespace.as_deref()
    };
    let selector = Selector {
        label: config.label_selector.clone(),
        field: config.field_selector.clone(),
    };
    let listing = endpoint
        .list(namespace, &selector)
        .map_err(|source| ApplyError::List {
            kind: kind.to_owned(),
            source,
        })?;
    let items = match listing.get("items").and_then(Value::as_array) {
        Some(items) => items.clone(),
        // A bare object is its own single-element result.
        None => vec![listing],
    };
    log::debug!("queried {kind}: {} object(s)", items.len());
    Ok(items)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
