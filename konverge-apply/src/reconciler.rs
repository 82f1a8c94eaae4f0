//! The per-definition reconciliation state machine.
//!
//! ## Decision order (first applicable branch is terminal)
//!
//! 1. Resolve the endpoint by exact kind + groupVersion match.
//! 2. Strip alias fields from the working definition.
//! 3. `…List` kind → list, report, done. No diffing, no mutation.
//! 4. Fetch existing state: 404 is "absent", every other failure is fatal.
//! 5. `state=absent`: absent → no-op; present → delete.
//! 6. `state=present`: absent → create; present + force → replace;
//!    present → diff, empty → no-op, otherwise merge-patch.
//!
//! Under check mode every mutating branch skips the network call but still
//! reports the verdict it would have produced.

use serde::Serialize;
use serde_json::Value;

use konverge_client::{Cluster, ResourceEndpoint, Selector};
use konverge_core::{diff, DiffEntry, ResourceDefinition, State};

use crate::error::ApplyError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Run parameters, built once at the boundary and passed immutably.
#[derive(Debug, Clone, Default)]
pub struct ApplyConfig {
    pub state: State,
    /// Replace unconditionally instead of diffing and patching.
    pub force: bool,
    /// Report what would change without mutating the cluster.
    pub check_mode: bool,
    /// Fallback object name when the definition carries no `metadata.name`.
    pub name: Option<String>,
    /// Fallback namespace when the definition carries no `metadata.namespace`.
    pub namespace: Option<String>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What the reconciler did (or, under check mode, would have done) for one
/// definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// List-kind definition: the listing was fetched, nothing was compared.
    Listed,
    /// The live object already satisfies the definition (or was already absent).
    Unchanged,
    Created,
    WouldCreate,
    Deleted,
    WouldDelete,
    Replaced,
    WouldReplace,
    Patched,
    WouldPatch,
}

impl Action {
    /// The `changed` verdict this action reports.
    pub fn changed(self) -> bool {
        !matches!(self, Action::Listed | Action::Unchanged)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Listed => "listed",
            Action::Unchanged => "unchanged",
            Action::Created => "created",
            Action::WouldCreate => "would create",
            Action::Deleted => "deleted",
            Action::WouldDelete => "would delete",
            Action::Replaced => "replaced",
            Action::WouldReplace => "would replace",
            Action::Patched => "patched",
            Action::WouldPatch => "would patch",
        };
        f.write_str(s)
    }
}

/// Per-definition result.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub action: Action,
    pub changed: bool,
    /// The listing, the created/replaced/patched object, or the existing
    /// object on a no-op. Empty when check mode skipped the mutation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Divergences found on the patch path, for observability.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<DiffEntry>,
}

/// Ordered per-definition outcomes for a whole run.
///
/// Multi-definition runs report the full list; the run's `changed` is the OR
/// over all outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub outcomes: Vec<ReconcileOutcome>,
}

impl ApplyReport {
    pub fn changed(&self) -> bool {
        self.outcomes.iter().any(|o| o.changed)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Reconcile every definition in order, fail-fast on the first fatal error.
pub fn apply_all<C: Cluster>(
    cluster: &C,
    config: &ApplyConfig,
    definitions: &[ResourceDefinition],
) -> Result<ApplyReport, ApplyError> {
    let mut outcomes = Vec::with_capacity(definitions.len());
    for definition in definitions {
        outcomes.push(apply_one(cluster, config, definition)?);
    }
    Ok(ApplyReport { outcomes })
}

/// Reconcile a single definition against the cluster.
pub fn apply_one<C: Cluster>(
    cluster: &C,
    config: &ApplyConfig,
    definition: &ResourceDefinition,
) -> Result<ReconcileOutcome, ApplyError> {
    let endpoint = resolve_endpoint(cluster, definition.kind(), definition.api_version())?;
    log::debug!(
        "resolved {} {} to '{}'",
        definition.api_version(),
        definition.kind(),
        endpoint.resource().plural
    );

    let mut desired = definition.clone();
    desired.strip_alias_fields();
    let kind = desired.kind().to_owned();

    // List kinds short-circuit: fetch and report, scoped to the parameter
    // namespace only.
    if kind.ends_with("List") {
        let listing = endpoint
            .list(config.namespace.as_deref(), &Selector::default())
            .map_err(|source| ApplyError::List {
                kind: kind.clone(),
                source,
            })?;
        log::debug!("listed {kind}");
        return Ok(ReconcileOutcome {
            kind,
            name: None,
            namespace: config.namespace.clone(),
            action: Action::Listed,
            changed: false,
            result: Some(listing),
            diff: vec![],
        });
    }

    let name = desired
        .name()
        .map(str::to_owned)
        .or_else(|| config.name.clone())
        .ok_or_else(|| ApplyError::MissingName { kind: kind.clone() })?;
    let namespace = desired
        .namespace()
        .map(str::to_owned)
        .or_else(|| config.namespace.clone());

    let existing = endpoint
        .get(&name, namespace.as_deref())
        .map_err(|source| ApplyError::Get {
            name: name.clone(),
            source,
        })?;

    let outcome = |action: Action, result: Option<Value>, diff: Vec<DiffEntry>| ReconcileOutcome {
        kind: kind.clone(),
        name: Some(name.clone()),
        namespace: namespace.clone(),
        changed: action.changed(),
        action,
        result,
        diff,
    };

    match (config.state, existing) {
        (State::Absent, None) => {
            log::debug!("already absent: {kind} {name}");
            Ok(outcome(Action::Unchanged, None, vec![]))
        }
        (State::Absent, Some(_)) => {
            if config.check_mode {
                log::info!("[check] would delete: {kind} {name}");
                return Ok(outcome(Action::WouldDelete, None, vec![]));
            }
            endpoint
                .delete(&name, namespace.as_deref())
                .map_err(|source| ApplyError::Delete {
                    name: name.clone(),
                    source,
                })?;
            log::info!("deleted: {kind} {name}");
            Ok(outcome(Action::Deleted, None, vec![]))
        }
        (State::Present, None) => {
            if config.check_mode {
                log::info!("[check] would create: {kind} {name}");
                return Ok(outcome(Action::WouldCreate, None, vec![]));
            }
            let created = endpoint
                .create(&desired.to_value(), namespace.as_deref())
                .map_err(|source| ApplyError::Create {
                    name: name.clone(),
                    source,
                })?;
            log::info!("created: {kind} {name}");
            Ok(outcome(Action::Created, Some(created), vec![]))
        }
        (State::Present, Some(existing)) => {
            if config.force {
                if config.check_mode {
                    log::info!("[check] would replace: {kind} {name}");
                    return Ok(outcome(Action::WouldReplace, None, vec![]));
                }
                let replaced = endpoint
                    .replace(&desired.to_value(), &name, namespace.as_deref())
                    .map_err(|source| ApplyError::Replace {
                        name: name.clone(),
                        source,
                    })?;
                log::info!("replaced: {kind} {name}");
                return Ok(outcome(Action::Replaced, Some(replaced), vec![]));
            }

            let entries = diff::diff(&desired.to_value(), &existing);
            if entries.is_empty() {
                log::debug!("unchanged: {kind} {name}");
                return Ok(outcome(Action::Unchanged, Some(existing), vec![]));
            }
            if config.check_mode {
                log::info!("[check] would patch: {kind} {name} ({} diffs)", entries.len());
                return Ok(outcome(Action::WouldPatch, None, entries));
            }
            let updated = endpoint
                .update(&desired.to_value(), &name, namespace.as_deref())
                .map_err(|source| ApplyError::Patch {
                    name: name.clone(),
                    source,
                })?;
            log::info!("patched: {kind} {name}");
            Ok(outcome(Action::Patched, Some(updated), entries))
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Exact-match endpoint resolution: the first discovered resource whose kind
/// and groupVersion both equal the given fields.
pub(crate) fn resolve_endpoint<C: Cluster>(
    cluster: &C,
    kind: &str,
    api_version: &str,
) -> Result<C::Endpoint, ApplyError> {
    cluster
        .search_resources(|r| r.kind == kind && r.group_version() == api_version)
        .ok_or_else(|| ApplyError::UnknownResourceType {
            kind: kind.to_owned(),
            api_version: api_version.to_owned(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
