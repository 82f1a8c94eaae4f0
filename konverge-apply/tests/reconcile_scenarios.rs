//! End-to-end reconciliation scenarios against the in-memory cluster.

use konverge_apply::{apply_all, apply_one, Action, ApplyConfig, ApplyError};
use konverge_client::MemoryCluster;
use konverge_core::{ResourceDefinition, State};
use serde_json::{json, Value};

fn cluster() -> MemoryCluster {
    let _ = env_logger::builder().is_test(true).try_init();
    MemoryCluster::new()
        .with_resource("", "v1", "ConfigMap", "configmaps", true)
        .with_resource("", "v1", "Namespace", "namespaces", false)
        .with_resource("apps", "v1", "Deployment", "deployments", true)
}

fn definition(value: Value) -> ResourceDefinition {
    ResourceDefinition::from_body(value.as_object().cloned().expect("object literal"))
        .expect("valid definition")
}

fn configmap_a() -> ResourceDefinition {
    definition(json!({
        "kind": "ConfigMap",
        "apiVersion": "v1",
        "metadata": {"name": "a", "namespace": "ns"},
        "data": {"k": "v"},
    }))
}

fn present() -> ApplyConfig {
    ApplyConfig::default()
}

fn absent() -> ApplyConfig {
    ApplyConfig {
        state: State::Absent,
        ..Default::default()
    }
}

fn check(mut config: ApplyConfig) -> ApplyConfig {
    config.check_mode = true;
    config
}

// ---------------------------------------------------------------------------
// Create / no-op / update / replace
// ---------------------------------------------------------------------------

#[test]
fn create_when_absent() {
    let cluster = cluster();
    let outcome = apply_one(&cluster, &present(), &configmap_a()).unwrap();

    assert_eq!(outcome.action, Action::Created);
    assert!(outcome.changed);
    let created = outcome.result.expect("created object");
    assert_eq!(created.pointer("/data/k"), Some(&json!("v")));
    assert_eq!(cluster.mutating_operations(), vec!["create ConfigMap a"]);
}

#[test]
fn no_op_when_live_object_satisfies_definition() {
    let cluster = cluster();
    // Live object carries an extra data key and server-populated metadata;
    // neither is mentioned by the definition, so it must match.
    cluster
        .insert_object(
            Some("ns"),
            json!({
                "kind": "ConfigMap",
                "apiVersion": "v1",
                "metadata": {"name": "a", "namespace": "ns"},
                "data": {"k": "v", "extra": "x"},
            }),
        )
        .unwrap();

    let outcome = apply_one(&cluster, &present(), &configmap_a()).unwrap();
    assert_eq!(outcome.action, Action::Unchanged);
    assert!(!outcome.changed);
    assert!(outcome.result.is_some(), "no-op reports the existing object");
    assert!(cluster.mutating_operations().is_empty());
}

#[test]
fn patch_when_values_differ() {
    let cluster = cluster();
    cluster
        .insert_object(
            Some("ns"),
            json!({
                "kind": "ConfigMap",
                "apiVersion": "v1",
                "metadata": {"name": "a", "namespace": "ns"},
                "data": {"k": "old"},
            }),
        )
        .unwrap();

    let outcome = apply_one(&cluster, &present(), &configmap_a()).unwrap();
    assert_eq!(outcome.action, Action::Patched);
    assert!(outcome.changed);
    assert_eq!(outcome.diff.len(), 1);
    assert_eq!(outcome.diff[0].path, "data.k");

    let updated = outcome.result.expect("patched object");
    assert_eq!(updated.pointer("/data/k"), Some(&json!("v")));
    assert!(cluster
        .mutating_operations()
        .contains(&"update ConfigMap a".to_owned()));
}

#[test]
fn force_replaces_even_when_matching() {
    let cluster = cluster();
    cluster
        .insert_object(
            Some("ns"),
            json!({
                "kind": "ConfigMap",
                "apiVersion": "v1",
                "metadata": {"name": "a", "namespace": "ns"},
                "data": {"k": "v"},
            }),
        )
        .unwrap();

    let config = ApplyConfig {
        force: true,
        ..Default::default()
    };
    let outcome = apply_one(&cluster, &config, &configmap_a()).unwrap();
    assert_eq!(outcome.action, Action::Replaced);
    assert!(outcome.changed);
    assert_eq!(cluster.mutating_operations(), vec!["replace ConfigMap a"]);
}

#[test]
fn idempotence_second_apply_is_unchanged() {
    let cluster = cluster();
    let first = apply_one(&cluster, &present(), &configmap_a()).unwrap();
    assert_eq!(first.action, Action::Created);

    let second = apply_one(&cluster, &present(), &configmap_a()).unwrap();
    assert_eq!(second.action, Action::Unchanged);
    assert!(!second.changed);
    assert_eq!(cluster.mutating_operations().len(), 1, "only the create mutated");
}

// ---------------------------------------------------------------------------
// Absent state
// ---------------------------------------------------------------------------

#[test]
fn absent_on_absent_issues_no_delete() {
    let cluster = cluster();
    let outcome = apply_one(&cluster, &absent(), &configmap_a()).unwrap();

    assert_eq!(outcome.action, Action::Unchanged);
    assert!(!outcome.changed);
    assert!(
        !cluster.operations().iter().any(|op| op.starts_with("delete")),
        "no delete call may be issued"
    );
}

#[test]
fn absent_deletes_existing_object() {
    let cluster = cluster();
    cluster
        .insert_object(Some("ns"), configmap_a().to_value())
        .unwrap();

    let outcome = apply_one(&cluster, &absent(), &configmap_a()).unwrap();
    assert_eq!(outcome.action, Action::Deleted);
    assert!(outcome.changed);
    assert!(cluster.object("ConfigMap", Some("ns"), "a").is_none());
}

// ---------------------------------------------------------------------------
// Check mode
// ---------------------------------------------------------------------------

#[test]
fn check_mode_create_reports_changed_without_mutating() {
    let cluster = cluster();
    let before = cluster.snapshot();

    let outcome = apply_one(&cluster, &check(present()), &configmap_a()).unwrap();
    assert_eq!(outcome.action, Action::WouldCreate);
    assert!(outcome.changed);
    assert_eq!(cluster.snapshot(), before);
    assert!(cluster.mutating_operations().is_empty());
}

#[test]
fn check_mode_delete_reports_changed_without_mutating() {
    let cluster = cluster();
    cluster
        .insert_object(Some("ns"), configmap_a().to_value())
        .unwrap();
    let before = cluster.snapshot();

    let outcome = apply_one(&cluster, &check(absent()), &configmap_a()).unwrap();
    assert_eq!(outcome.action, Action::WouldDelete);
    assert!(outcome.changed);
    assert_eq!(cluster.snapshot(), before);
}

#[test]
fn check_mode_patch_reports_diff_without_mutating() {
    let cluster = cluster();
    cluster
        .insert_object(
            Some("ns"),
            json!({
                "kind": "ConfigMap",
                "apiVersion": "v1",
                "metadata": {"name": "a", "namespace": "ns"},
                "data": {"k": "old"},
            }),
        )
        .unwrap();
    let before = cluster.snapshot();

    let outcome = apply_one(&cluster, &check(present()), &configmap_a()).unwrap();
    assert_eq!(outcome.action, Action::WouldPatch);
    assert!(outcome.changed);
    assert!(!outcome.diff.is_empty());
    assert_eq!(cluster.snapshot(), before);
}

#[test]
fn check_mode_replace_reports_changed_without_mutating() {
    let cluster = cluster();
    cluster
        .insert_object(Some("ns"), configmap_a().to_value())
        .unwrap();
    let before = cluster.snapshot();

    let config = ApplyConfig {
        force: true,
        check_mode: true,
        ..Default::default()
    };
    let outcome = apply_one(&cluster, &config, &configmap_a()).unwrap();
    assert_eq!(outcome.action, Action::WouldReplace);
    assert!(outcome.changed);
    assert_eq!(cluster.snapshot(), before);
}

// ---------------------------------------------------------------------------
// List kinds
// ---------------------------------------------------------------------------

#[test]
fn list_kind_short_circuits_without_mutation() {
    let cluster = cluster();
    cluster
        .insert_object(Some("ns"), configmap_a().to_value())
        .unwrap();

    let config = ApplyConfig {
        namespace: Some("ns".to_owned()),
        ..Default::default()
    };
    let def = definition(json!({"kind": "ConfigMapList", "apiVersion": "v1"}));
    let outcome = apply_one(&cluster, &config, &def).unwrap();

    assert_eq!(outcome.action, Action::Listed);
    assert!(!outcome.changed);
    let listing = outcome.result.expect("listing");
    assert_eq!(listing["kind"], "ConfigMapList");
    assert_eq!(listing["items"].as_array().unwrap().len(), 1);
    assert!(cluster.mutating_operations().is_empty());
}

// ---------------------------------------------------------------------------
// Resolution across groups
// ---------------------------------------------------------------------------

#[test]
fn api_version_disambiguates_groups() {
    let cluster = cluster();
    let deployment = definition(json!({
        "kind": "Deployment",
        "apiVersion": "apps/v1",
        "metadata": {"name": "web", "namespace": "prod"},
        "spec": {"replicas": 2},
    }));

    let outcome = apply_one(&cluster, &present(), &deployment).unwrap();
    assert_eq!(outcome.action, Action::Created);
    assert!(cluster.object("Deployment", Some("prod"), "web").is_some());
}

#[test]
fn cluster_scoped_resource_needs_no_namespace() {
    let cluster = cluster();
    let ns = definition(json!({
        "kind": "Namespace",
        "apiVersion": "v1",
        "metadata": {"name": "prod"},
    }));

    let outcome = apply_one(&cluster, &present(), &ns).unwrap();
    assert_eq!(outcome.action, Action::Created);
    assert!(cluster.object("Namespace", None, "prod").is_some());
}

// ---------------------------------------------------------------------------
// Alias stripping
// ---------------------------------------------------------------------------

#[test]
fn alias_fields_never_reach_diff_or_payload() {
    let cluster = cluster();
    cluster
        .insert_object(Some("ns"), configmap_a().to_value())
        .unwrap();

    // Identical to the live object apart from alias keys riding along.
    let def = definition(json!({
        "kind": "ConfigMap",
        "apiVersion": "v1",
        "metadata": {"name": "a", "namespace": "ns"},
        "data": {"k": "v"},
        "state": "present",
        "force": false,
    }));
    let outcome = apply_one(&cluster, &present(), &def).unwrap();
    assert_eq!(outcome.action, Action::Unchanged, "alias keys must not diff");

    let stored = cluster.object("ConfigMap", Some("ns"), "a").unwrap();
    assert!(stored.get("state").is_none());
    assert!(stored.get("force").is_none());
}

// ---------------------------------------------------------------------------
// Batch runs and failure propagation
// ---------------------------------------------------------------------------

#[test]
fn batch_run_reports_every_outcome_in_order() {
    let cluster = cluster();
    cluster
        .insert_object(Some("ns"), configmap_a().to_value())
        .unwrap();

    let defs = vec![
        configmap_a(), // unchanged
        definition(json!({
            "kind": "ConfigMap",
            "apiVersion": "v1",
            "metadata": {"name": "b", "namespace": "ns"},
            "data": {"x": "1"},
        })), // created
    ];
    let report = apply_all(&cluster, &present(), &defs).unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].action, Action::Unchanged);
    assert_eq!(report.outcomes[1].action, Action::Created);
    assert!(report.changed(), "aggregate changed is the OR of outcomes");
}

#[test]
fn batch_run_aborts_on_first_fatal_error() {
    let cluster = cluster();
    cluster.fail_next("create", 403, "forbidden");

    let defs = vec![
        configmap_a(),
        definition(json!({
            "kind": "ConfigMap",
            "apiVersion": "v1",
            "metadata": {"name": "b", "namespace": "ns"},
        })),
    ];
    let err = apply_all(&cluster, &present(), &defs).unwrap_err();
    assert!(matches!(err, ApplyError::Create { .. }));
    // Fail-fast: the second definition never produced a get.
    assert_eq!(
        cluster
            .operations()
            .iter()
            .filter(|op| op.starts_with("get"))
            .count(),
        1
    );
}

#[test]
fn non_404_get_failure_aborts_the_run() {
    let cluster = cluster();
    cluster.fail_next("get", 500, "etcd unavailable");

    let err = apply_one(&cluster, &present(), &configmap_a()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("failed to retrieve object 'a'"), "{message}");
    assert!(message.contains("500"), "{message}");
    assert!(message.contains("etcd unavailable"), "{message}");
}

#[test]
fn patch_failure_surfaces_status_and_body() {
    let cluster = cluster();
    cluster
        .insert_object(
            Some("ns"),
            json!({
                "kind": "ConfigMap",
                "apiVersion": "v1",
                "metadata": {"name": "a", "namespace": "ns"},
                "data": {"k": "old"},
            }),
        )
        .unwrap();
    cluster.fail_next("update", 422, "field is immutable");

    let err = apply_one(&cluster, &present(), &configmap_a()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("failed to patch object 'a'"), "{message}");
    assert!(message.contains("422"), "{message}");
    assert!(message.contains("field is immutable"), "{message}");
}

#[test]
fn delete_failure_surfaces_status_and_body() {
    let cluster = cluster();
    cluster
        .insert_object(Some("ns"), configmap_a().to_value())
        .unwrap();
    cluster.fail_next("delete", 403, "forbidden");

    let err = apply_one(&cluster, &absent(), &configmap_a()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("failed to delete object 'a'"), "{message}");
    assert!(message.contains("403"), "{message}");
}
