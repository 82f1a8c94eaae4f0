//! HTTP implementation of the cluster traits.
//!
//! [`HttpCluster::connect`] walks the discovery endpoints once — `/api/v1`
//! for the core group, then `/apis` and each group's preferred version —
//! and builds the resource table endpoints are resolved against. For every
//! discovered resource a companion `<Kind>List` entry is registered over the
//! same collection path, so list-kind definitions resolve like any other.
//!
//! No timeouts beyond the transport defaults, no retries: a failed call is
//! surfaced to the caller as-is.

use serde::Deserialize;
use serde_json::Value;

use crate::discovery::{Cluster, DiscoveredResource, ResourceEndpoint, Selector};
use crate::error::ClientError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection parameters for a live cluster.
///
/// Credential acquisition (kubeconfig parsing, exec plugins, token refresh)
/// is out of scope: the caller supplies a server URL and, optionally, a
/// ready-to-use bearer token.
#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    /// Base URL of the API server, e.g. `https://10.0.0.1:6443`.
    pub base_url: String,
    /// Bearer token sent as `Authorization: Bearer …` when set.
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// Discovery documents
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiResourceList {
    #[serde(default)]
    resources: Vec<ApiResource>,
}

#[derive(Debug, Deserialize)]
struct ApiResource {
    name: String,
    kind: String,
    namespaced: bool,
}

#[derive(Debug, Deserialize)]
struct ApiGroupList {
    #[serde(default)]
    groups: Vec<ApiGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGroup {
    name: String,
    preferred_version: Option<GroupVersion>,
}

#[derive(Debug, Deserialize)]
struct GroupVersion {
    version: String,
}

/// Fold one group-version's resource list into the discovery table.
///
/// Subresources (`pods/status`) are skipped; each resource also registers a
/// `<Kind>List` companion over the same collection.
fn collect_resources(
    group: &str,
    version: &str,
    list: ApiResourceList,
    out: &mut Vec<DiscoveredResource>,
) {
    for resource in list.resources {
        if resource.name.contains('/') {
            continue;
        }
        out.push(DiscoveredResource {
            group: group.to_owned(),
            version: version.to_owned(),
            kind: resource.kind.clone(),
            plural: resource.name.clone(),
            namespaced: resource.namespaced,
        });
        if !resource.kind.ends_with("List") {
            out.push(DiscoveredResource {
                group: group.to_owned(),
                version: version.to_owned(),
                kind: format!("{}List", resource.kind),
                plural: resource.name,
                namespaced: resource.namespaced,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// HttpCluster
// ---------------------------------------------------------------------------

/// A connected API server with its discovery table.
pub struct HttpCluster {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
    resources: Vec<DiscoveredResource>,
}

impl HttpCluster {
    /// Connect to the server and run the discovery walk.
    pub fn connect(config: ClusterConfig) -> Result<Self, ClientError> {
        let agent = ureq::AgentBuilder::new().build();
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        let token = config.token;

        let mut resources = Vec::new();

        log::debug!("discovering core group at /api/v1");
        let core: ApiResourceList =
            fetch_json(&agent, &base_url, token.as_deref(), "/api/v1")?;
        collect_resources("", "v1", core, &mut resources);

        log::debug!("discovering named groups at /apis");
        let groups: ApiGroupList = fetch_json(&agent, &base_url, token.as_deref(), "/apis")?;
        for group in groups.groups {
            let Some(preferred) = group.preferred_version else {
                continue;
            };
            let path = format!("/apis/{}/{}", group.name, preferred.version);
            let list: ApiResourceList =
                fetch_json(&agent, &base_url, token.as_deref(), &path)?;
            collect_resources(&group.name, &preferred.version, list, &mut resources);
        }

        if resources.is_empty() {
            return Err(ClientError::Discovery(format!(
                "no resources discovered at {base_url}"
            )));
        }
        log::debug!("discovered {} resource entries", resources.len());

        Ok(Self {
            agent,
            base_url,
            token,
            resources,
        })
    }

    /// The full discovery table, in discovery order.
    pub fn resources(&self) -> &[DiscoveredResource] {
        &self.resources
    }
}

impl Cluster for HttpCluster {
    type Endpoint = HttpEndpoint;

    fn search_resources(
        &self,
        predicate: impl Fn(&DiscoveredResource) -> bool,
    ) -> Option<HttpEndpoint> {
        self.resources
            .iter()
            .find(|r| predicate(r))
            .map(|r| HttpEndpoint {
                agent: self.agent.clone(),
                base_url: self.base_url.clone(),
                token: self.token.clone(),
                resource: r.clone(),
            })
    }
}

// ---------------------------------------------------------------------------
// HttpEndpoint
// ---------------------------------------------------------------------------

/// REST verbs for one discovered resource.
pub struct HttpEndpoint {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
    resource: DiscoveredResource,
}

impl HttpEndpoint {
    fn collection_path(&self, namespace: Option<&str>) -> String {
        let root = if self.resource.group.is_empty() {
            format!("/api/{}", self.resource.version)
        } else {
            format!("/apis/{}/{}", self.resource.group, self.resource.version)
        };
        match namespace {
            Some(ns) if self.resource.namespaced => {
                format!("{root}/namespaces/{ns}/{}", self.resource.plural)
            }
            _ => format!("{root}/{}", self.resource.plural),
        }
    }

    fn object_path(&self, name: &str, namespace: Option<&str>) -> String {
        format!("{}/{}", self.collection_path(namespace), name)
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        log::debug!("{method} {path}");
        let mut req = self
            .agent
            .request(method, &format!("{}{}", self.base_url, path))
            .set("Accept", "application/json");
        if let Some(token) = &self.token {
            req = req.set("Authorization", &format!("Bearer {token}"));
        }
        req
    }
}

impl ResourceEndpoint for HttpEndpoint {
    fn resource(&self) -> &DiscoveredResource {
        &self.resource
    }

    fn get(&self, name: &str, namespace: Option<&str>) -> Result<Option<Value>, ClientError> {
        let path = self.object_path(name, namespace);
        match into_value(self.request("GET", &path).call()) {
            Ok(object) => Ok(Some(object)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn list(&self, namespace: Option<&str>, selector: &Selector) -> Result<Value, ClientError> {
        let path = self.collection_path(namespace);
        let mut req = self.request("GET", &path);
        for (param, value) in selector_params(selector) {
            req = req.query(param, value);
        }
        into_value(req.call())
    }

    fn create(&self, definition: &Value, namespace: Option<&str>) -> Result<Value, ClientError> {
        let path = self.collection_path(namespace);
        into_value(self.request("POST", &path).send_json(definition))
    }

    fn replace(
        &self,
        definition: &Value,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, ClientError> {
        let path = self.object_path(name, namespace);
        into_value(self.request("PUT", &path).send_json(definition))
    }

    fn update(
        &self,
        definition: &Value,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, ClientError> {
        let path = self.object_path(name, namespace);
        let payload =
            serde_json::to_string(definition).map_err(|e| ClientError::Body(e.to_string()))?;
        into_value(
            self.request("PATCH", &path)
                .set("Content-Type", "application/merge-patch+json")
                .send_string(&payload),
        )
    }

    fn delete(&self, name: &str, namespace: Option<&str>) -> Result<(), ClientError> {
        let path = self.object_path(name, namespace);
        match self.request("DELETE", &path).call() {
            Ok(_) => Ok(()),
            Err(err) => Err(map_transport(err)),
        }
    }
}

/// The query parameters a selector contributes to a list request.
fn selector_params(selector: &Selector) -> Vec<(&'static str, &str)> {
    let mut params = Vec::new();
    if let Some(label) = selector.label.as_deref() {
        params.push(("labelSelector", label));
    }
    if let Some(field) = selector.field.as_deref() {
        params.push(("fieldSelector", field));
    }
    params
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

fn fetch_json<T: serde::de::DeserializeOwned>(
    agent: &ureq::Agent,
    base_url: &str,
    token: Option<&str>,
    path: &str,
) -> Result<T, ClientError> {
    let mut req = agent
        .get(&format!("{base_url}{path}"))
        .set("Accept", "application/json");
    if let Some(token) = token {
        req = req.set("Authorization", &format!("Bearer {token}"));
    }
    let value = into_value(req.call())?;
    serde_json::from_value(value).map_err(|e| ClientError::Body(e.to_string()))
}

fn into_value(result: Result<ureq::Response, ureq::Error>) -> Result<Value, ClientError> {
    match result {
        Ok(response) => response
            .into_json::<Value>()
            .map_err(|e| ClientError::Body(e.to_string())),
        Err(err) => Err(map_transport(err)),
    }
}

fn map_transport(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(status, response) => ClientError::Api {
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => ClientError::Transport(transport.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(resource: DiscoveredResource) -> HttpEndpoint {
        HttpEndpoint {
            agent: ureq::AgentBuilder::new().build(),
            base_url: "https://cluster.example:6443".to_owned(),
            token: None,
            resource,
        }
    }

    fn configmaps() -> DiscoveredResource {
        DiscoveredResource {
            group: String::new(),
            version: "v1".to_owned(),
            kind: "ConfigMap".to_owned(),
            plural: "configmaps".to_owned(),
            namespaced: true,
        }
    }

    #[test]
    fn core_paths_use_api_root() {
        let ep = endpoint(configmaps());
        assert_eq!(
            ep.object_path("a", Some("ns")),
            "/api/v1/namespaces/ns/configmaps/a"
        );
        assert_eq!(ep.collection_path(None), "/api/v1/configmaps");
    }

    #[test]
    fn group_paths_use_apis_root() {
        let ep = endpoint(DiscoveredResource {
            group: "apps".to_owned(),
            version: "v1".to_owned(),
            kind: "Deployment".to_owned(),
            plural: "deployments".to_owned(),
            namespaced: true,
        });
        assert_eq!(
            ep.object_path("web", Some("prod")),
            "/apis/apps/v1/namespaces/prod/deployments/web"
        );
    }

    #[test]
    fn cluster_scoped_resources_ignore_namespace() {
        let ep = endpoint(DiscoveredResource {
            group: String::new(),
            version: "v1".to_owned(),
            kind: "Namespace".to_owned(),
            plural: "namespaces".to_owned(),
            namespaced: false,
        });
        assert_eq!(ep.object_path("prod", Some("ignored")), "/api/v1/namespaces/prod");
    }

    #[test]
    fn selectors_become_query_parameters() {
        assert!(selector_params(&Selector::default()).is_empty());
        let selector = Selector {
            label: Some("app=web".to_owned()),
            field: Some("metadata.name=a".to_owned()),
        };
        let params = selector_params(&selector);
        assert_eq!(
            params,
            vec![("labelSelector", "app=web"), ("fieldSelector", "metadata.name=a")]
        );
    }

    #[test]
    fn collect_skips_subresources_and_registers_list_companions() {
        let list = ApiResourceList {
            resources: vec![
                ApiResource {
                    name: "configmaps".to_owned(),
                    kind: "ConfigMap".to_owned(),
                    namespaced: true,
                },
                ApiResource {
                    name: "pods/status".to_owned(),
                    kind: "Pod".to_owned(),
                    namespaced: true,
                },
            ],
        };
        let mut out = Vec::new();
        collect_resources("", "v1", list, &mut out);

        let kinds: Vec<&str> = out.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["ConfigMap", "ConfigMapList"]);
        assert!(out.iter().all(|r| r.plural == "configmaps"));
    }
}
