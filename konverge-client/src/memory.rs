//! In-memory cluster double.
//!
//! A full implementation of the [`Cluster`] / [`ResourceEndpoint`] seam over
//! an in-memory object store: discovery table seeded by the caller, objects
//! keyed by (group, version, plural, namespace, name), a log of every call
//! for assertions, and an arm-one-failure hook for exercising error paths.
//! Used by the reconciler test-suite; never by the production path.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde_json::{json, Map, Value};

use crate::discovery::{Cluster, DiscoveredResource, ResourceEndpoint, Selector};
use crate::error::ClientError;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ObjectKey {
    group: String,
    version: String,
    plural: String,
    namespace: String,
    name: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<ObjectKey, Value>,
    operations: Vec<String>,
    failures: HashMap<String, (u16, String)>,
    revision: u64,
}

/// An in-memory cluster sharing its state with every endpoint it hands out.
#[derive(Clone, Default)]
pub struct MemoryCluster {
    resources: Vec<DiscoveredResource>,
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type (and its `<Kind>List` companion).
    pub fn with_resource(
        mut self,
        group: &str,
        version: &str,
        kind: &str,
        plural: &str,
        namespaced: bool,
    ) -> Self {
        self.resources.push(DiscoveredResource {
            group: group.to_owned(),
            version: version.to_owned(),
            kind: kind.to_owned(),
            plural: plural.to_owned(),
            namespaced,
        });
        self.resources.push(DiscoveredResource {
            group: group.to_owned(),
            version: version.to_owned(),
            kind: format!("{kind}List"),
            plural: plural.to_owned(),
            namespaced,
        });
        self
    }

    /// Seed an object directly into the store.
    ///
    /// Bypasses the endpoint verbs so the operations log stays clean for
    /// assertions about what a run under test actually did.
    pub fn insert_object(
        &self,
        namespace: Option<&str>,
        object: Value,
    ) -> Result<Value, ClientError> {
        let kind = object
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let resource = self
            .resources
            .iter()
            .find(|r| r.kind == kind)
            .cloned()
            .ok_or_else(|| ClientError::Discovery(format!("kind '{kind}' not registered")))?;
        let name = object
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| ClientError::Api {
                status: 422,
                body: "metadata.name is required".to_owned(),
            })?;

        let key = ObjectKey {
            group: resource.group.clone(),
            version: resource.version.clone(),
            plural: resource.plural.clone(),
            namespace: if resource.namespaced {
                namespace.unwrap_or_default().to_owned()
            } else {
                String::new()
            },
            name,
        };

        let mut stored = object;
        let mut state = self.state.borrow_mut();
        state.revision += 1;
        let revision = state.revision;
        if let Some(body) = stored.as_object_mut() {
            let metadata = body
                .entry("metadata")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(metadata) = metadata.as_object_mut() {
                metadata.insert(
                    "resourceVersion".to_owned(),
                    Value::String(revision.to_string()),
                );
                if resource.namespaced {
                    if let Some(ns) = namespace {
                        metadata
                            .entry("namespace")
                            .or_insert_with(|| Value::String(ns.to_owned()));
                    }
                }
            }
        }
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }

    /// Every call made so far, in order, e.g. `"create ConfigMap ns/a"`.
    pub fn operations(&self) -> Vec<String> {
        self.state.borrow().operations.clone()
    }

    /// The subset of [`operations`](Self::operations) that mutate state.
    pub fn mutating_operations(&self) -> Vec<String> {
        self.operations()
            .into_iter()
            .filter(|op| {
                ["create ", "replace ", "update ", "delete "]
                    .iter()
                    .any(|verb| op.starts_with(verb))
            })
            .collect()
    }

    /// Arm the next call of `verb` (`"create"`, `"delete"`, …) to fail.
    pub fn fail_next(&self, verb: &str, status: u16, body: &str) {
        self.state
            .borrow_mut()
            .failures
            .insert(verb.to_owned(), (status, body.to_owned()));
    }

    /// A copy of the whole object store, keyed by `plural/namespace/name`.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.state
            .borrow()
            .objects
            .iter()
            .map(|(k, v)| (format!("{}/{}/{}", k.plural, k.namespace, k.name), v.clone()))
            .collect()
    }

    /// Fetch one stored object without going through an endpoint.
    pub fn object(&self, kind: &str, namespace: Option<&str>, name: &str) -> Option<Value> {
        let resource = self.resources.iter().find(|r| r.kind == kind)?;
        let key = ObjectKey {
            group: resource.group.clone(),
            version: resource.version.clone(),
            plural: resource.plural.clone(),
            namespace: namespace.unwrap_or_default().to_owned(),
            name: name.to_owned(),
        };
        self.state.borrow().objects.get(&key).cloned()
    }
}

impl Cluster for MemoryCluster {
    type Endpoint = MemoryEndpoint;

    fn search_resources(
        &self,
        predicate: impl Fn(&DiscoveredResource) -> bool,
    ) -> Option<MemoryEndpoint> {
        self.resources
            .iter()
            .find(|r| predicate(r))
            .map(|r| MemoryEndpoint {
                state: Rc::clone(&self.state),
                resource: r.clone(),
            })
    }
}

// ---------------------------------------------------------------------------
// MemoryEndpoint
// ---------------------------------------------------------------------------

pub struct MemoryEndpoint {
    state: Rc<RefCell<MemoryState>>,
    resource: DiscoveredResource,
}

impl MemoryEndpoint {
    fn key(&self, name: &str, namespace: Option<&str>) -> ObjectKey {
        let namespace = if self.resource.namespaced {
            namespace.unwrap_or_default()
        } else {
            ""
        };
        ObjectKey {
            group: self.resource.group.clone(),
            version: self.resource.version.clone(),
            plural: self.resource.plural.clone(),
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        }
    }

    fn record(&self, verb: &str, target: &str) {
        self.state
            .borrow_mut()
            .operations
            .push(format!("{verb} {} {target}", self.resource.kind));
    }

    fn take_failure(&self, verb: &str) -> Result<(), ClientError> {
        if let Some((status, body)) = self.state.borrow_mut().failures.remove(verb) {
            return Err(ClientError::Api { status, body });
        }
        Ok(())
    }

    fn stamp(&self, object: &mut Value, namespace: Option<&str>) {
        let revision = {
            let mut state = self.state.borrow_mut();
            state.revision += 1;
            state.revision
        };
        if let Some(body) = object.as_object_mut() {
            let metadata = body
                .entry("metadata")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(metadata) = metadata.as_object_mut() {
                metadata.insert(
                    "resourceVersion".to_owned(),
                    Value::String(revision.to_string()),
                );
                if self.resource.namespaced {
                    if let Some(ns) = namespace {
                        metadata
                            .entry("namespace")
                            .or_insert_with(|| Value::String(ns.to_owned()));
                    }
                }
            }
        }
    }

    fn definition_name(definition: &Value) -> Result<String, ClientError> {
        definition
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| ClientError::Api {
                status: 422,
                body: "metadata.name is required".to_owned(),
            })
    }
}

impl ResourceEndpoint for MemoryEndpoint {
    fn resource(&self) -> &DiscoveredResource {
        &self.resource
    }

    fn get(&self, name: &str, namespace: Option<&str>) -> Result<Option<Value>, ClientError> {
        self.record("get", name);
        self.take_failure("get")?;
        let key = self.key(name, namespace);
        Ok(self.state.borrow().objects.get(&key).cloned())
    }

    fn list(&self, namespace: Option<&str>, selector: &Selector) -> Result<Value, ClientError> {
        self.record("list", namespace.unwrap_or("*"));
        self.take_failure("list")?;
        let state = self.state.borrow();
        let items: Vec<Value> = state
            .objects
            .iter()
            .filter(|(k, _)| {
                k.group == self.resource.group
                    && k.version == self.resource.version
                    && k.plural == self.resource.plural
                    && namespace.map_or(true, |ns| !self.resource.namespaced || k.namespace == ns)
            })
            .filter(|(_, v)| matches_selector(v, selector))
            .map(|(_, v)| v.clone())
            .collect();
        let kind = if self.resource.kind.ends_with("List") {
            self.resource.kind.clone()
        } else {
            format!("{}List", self.resource.kind)
        };
        Ok(json!({
            "apiVersion": self.resource.group_version(),
            "kind": kind,
            "items": items,
        }))
    }

    fn create(&self, definition: &Value, namespace: Option<&str>) -> Result<Value, ClientError> {
        let name = Self::definition_name(definition)?;
        self.record("create", &name);
        self.take_failure("create")?;
        let key = self.key(&name, namespace);
        if self.state.borrow().objects.contains_key(&key) {
            return Err(ClientError::Api {
                status: 409,
                body: format!("{} \"{name}\" already exists", self.resource.plural),
            });
        }
        let mut object = definition.clone();
        self.stamp(&mut object, namespace);
        self.state
            .borrow_mut()
            .objects
            .insert(key, object.clone());
        Ok(object)
    }

    fn replace(
        &self,
        definition: &Value,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, ClientError> {
        self.record("replace", name);
        self.take_failure("replace")?;
        let key = self.key(name, namespace);
        if !self.state.borrow().objects.contains_key(&key) {
            return Err(not_found(&self.resource.plural, name));
        }
        let mut object = definition.clone();
        self.stamp(&mut object, namespace);
        self.state
            .borrow_mut()
            .objects
            .insert(key, object.clone());
        Ok(object)
    }

    fn update(
        &self,
        definition: &Value,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, ClientError> {
        self.record("update", name);
        self.take_failure("update")?;
        let key = self.key(name, namespace);
        let mut object = match self.state.borrow().objects.get(&key) {
            Some(existing) => existing.clone(),
            None => return Err(not_found(&self.resource.plural, name)),
        };
        merge_patch(&mut object, definition);
        self.stamp(&mut object, namespace);
        self.state
            .borrow_mut()
            .objects
            .insert(key, object.clone());
        Ok(object)
    }

    fn delete(&self, name: &str, namespace: Option<&str>) -> Result<(), ClientError> {
        self.record("delete", name);
        self.take_failure("delete")?;
        let key = self.key(name, namespace);
        if self.state.borrow_mut().objects.remove(&key).is_none() {
            return Err(not_found(&self.resource.plural, name));
        }
        Ok(())
    }
}

/// Equality-based selector evaluation over a stored object.
///
/// Label clauses read `metadata.labels`; field clauses read a dotted path
/// into the object itself. Supported clause forms: `k=v`, `k==v`, `k!=v`,
/// and a bare `k` for label existence.
fn matches_selector(object: &Value, selector: &Selector) -> bool {
    let labels_match = selector.label.as_deref().map_or(true, |expr| {
        let labels = object.pointer("/metadata/labels");
        clauses(expr).all(|clause| match clause {
            Clause::Eq(key, want) => {
                labels.and_then(|l| l.get(key)).and_then(Value::as_str) == Some(want)
            }
            Clause::Ne(key, want) => {
                labels.and_then(|l| l.get(key)).and_then(Value::as_str) != Some(want)
            }
            Clause::Exists(key) => labels.map_or(false, |l| l.get(key).is_some()),
        })
    });
    let fields_match = selector.field.as_deref().map_or(true, |expr| {
        clauses(expr).all(|clause| match clause {
            Clause::Eq(path, want) => field_value(object, path).as_deref() == Some(want),
            Clause::Ne(path, want) => field_value(object, path).as_deref() != Some(want),
            Clause::Exists(path) => field_value(object, path).is_some(),
        })
    });
    labels_match && fields_match
}

enum Clause<'a> {
    Eq(&'a str, &'a str),
    Ne(&'a str, &'a str),
    Exists(&'a str),
}

fn clauses(expr: &str) -> impl Iterator<Item = Clause<'_>> {
    expr.split(',').map(str::trim).filter(|c| !c.is_empty()).map(|clause| {
        if let Some((key, value)) = clause.split_once("!=") {
            Clause::Ne(key.trim(), value.trim())
        } else if let Some((key, value)) = clause.split_once("==") {
            Clause::Eq(key.trim(), value.trim())
        } else if let Some((key, value)) = clause.split_once('=') {
            Clause::Eq(key.trim(), value.trim())
        } else {
            Clause::Exists(clause)
        }
    })
}

fn field_value(object: &Value, dotted: &str) -> Option<String> {
    let pointer = format!("/{}", dotted.replace('.', "/"));
    let value = object.pointer(&pointer)?;
    match value {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn not_found(plural: &str, name: &str) -> ClientError {
    ClientError::Api {
        status: 404,
        body: format!("{plural} \"{name}\" not found"),
    }
}

/// RFC 7386 merge patch: objects merge recursively, `null` removes a key,
/// everything else replaces wholesale.
fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(patch_map) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            let target_map = target.as_object_mut().expect("object just ensured");
            for (key, patch_value) in patch_map {
                if patch_value.is_null() {
                    target_map.remove(key);
                } else {
                    let slot = target_map
                        .entry(key.clone())
                        .or_insert(Value::Null);
                    merge_patch(slot, patch_value);
                }
            }
        }
        other => *target = other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
