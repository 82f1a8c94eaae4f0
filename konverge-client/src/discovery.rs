//! Resource discovery model and the cluster/endpoint trait seam.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

// ---------------------------------------------------------------------------
// DiscoveredResource
// ---------------------------------------------------------------------------

/// One resource type known to the cluster, as learned from discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredResource {
    /// API group; empty for the core group.
    pub group: String,
    pub version: String,
    pub kind: String,
    /// The plural resource name used in URL paths (`configmaps`, `deployments`).
    pub plural: String,
    pub namespaced: bool,
}

impl DiscoveredResource {
    /// The `apiVersion` string definitions carry: `{group}/{version}`, or the
    /// bare version for the core group.
    pub fn group_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Server-side list filters, passed through as `labelSelector` /
/// `fieldSelector` query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    /// Label selector expression, e.g. `app=web,tier!=cache`.
    pub label: Option<String>,
    /// Field selector expression, e.g. `metadata.name=web`.
    pub field: Option<String>,
}

impl Selector {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.field.is_none()
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The verbs a resolved endpoint supports.
///
/// `get` returns `Ok(None)` for a 404 — not-found is a valid state, not an
/// error. Every other non-success answer is a [`ClientError`] carrying the
/// status and response body.
pub trait ResourceEndpoint {
    fn resource(&self) -> &DiscoveredResource;

    fn get(&self, name: &str, namespace: Option<&str>) -> Result<Option<Value>, ClientError>;

    fn list(&self, namespace: Option<&str>, selector: &Selector) -> Result<Value, ClientError>;

    fn create(&self, definition: &Value, namespace: Option<&str>) -> Result<Value, ClientError>;

    fn replace(
        &self,
        definition: &Value,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, ClientError>;

    /// Merge-patch the live object with the definition.
    fn update(
        &self,
        definition: &Value,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, ClientError>;

    fn delete(&self, name: &str, namespace: Option<&str>) -> Result<(), ClientError>;
}

/// A connected cluster: a discovery table that hands out endpoints.
pub trait Cluster {
    type Endpoint: ResourceEndpoint;

    /// The first discovered resource satisfying `predicate`, as an endpoint.
    fn search_resources(
        &self,
        predicate: impl Fn(&DiscoveredResource) -> bool,
    ) -> Option<Self::Endpoint>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_group_version_is_the_bare_version() {
        let r = DiscoveredResource {
            group: String::new(),
            version: "v1".to_owned(),
            kind: "ConfigMap".to_owned(),
            plural: "configmaps".to_owned(),
            namespaced: true,
        };
        assert_eq!(r.group_version(), "v1");
    }

    #[test]
    fn named_group_version_is_joined() {
        let r = DiscoveredResource {
            group: "apps".to_owned(),
            version: "v1".to_owned(),
            kind: "Deployment".to_owned(),
            plural: "deployments".to_owned(),
            namespaced: true,
        };
        assert_eq!(r.group_version(), "apps/v1");
    }
}
