//! End-to-end record lifecycle through the service layer
//!
//! Covers the full identity story of a project: codes, versions, references
//! by code, and deletion that never frees a code for reuse.

use reqdocs_storage::services::{CreateRecordInput, UpdateRecordInput};
use reqdocs_storage::{DbOptions, EntityKind, Record, RecordDb, Services, StorageError};
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create services over a temporary file database
fn create_services() -> (Services, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = RecordDb::open(&temp_dir.path().join("records.db"), &DbOptions::default()).unwrap();
    (Services::new(Arc::new(db)), temp_dir)
}

fn named(name: &str) -> CreateRecordInput {
    CreateRecordInput {
        name: name.to_string(),
        ..Default::default()
    }
}

fn rename(name: &str) -> UpdateRecordInput {
    UpdateRecordInput {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn org_and_project(services: &Services) -> (Record, Record) {
    let org = services
        .records
        .create(EntityKind::Organization, None, named("Acme"))
        .unwrap();
    let project = services
        .records
        .create(EntityKind::Project, Some(&org.id), named("Billing"))
        .unwrap();
    (org, project)
}

#[test]
fn test_project_and_actor_lifecycle() {
    let (services, _temp) = create_services();
    let records = &services.records;
    let (_, project) = org_and_project(&services);

    assert_eq!(project.code, "PROJ-001");
    assert_eq!(project.version, "01.00");

    let actor = records
        .create(EntityKind::Actor, Some(&project.id), named("Clerk"))
        .unwrap();
    assert_eq!(actor.code, "ACT-0001");
    assert_eq!(actor.version, "00.01");

    let updated = records
        .update(EntityKind::Actor, Some(&project.id), &actor.id, rename("Head clerk"))
        .unwrap();
    assert_eq!(updated.version, "00.02");
    assert_eq!(updated.code, "ACT-0001");

    // Updates do not touch the counter
    let preview = records.next_code(EntityKind::Actor, Some(&project.id)).unwrap();
    assert_eq!(preview.to_string(), "ACT-0002");

    let second = records
        .create(EntityKind::Actor, Some(&project.id), named("Auditor"))
        .unwrap();
    assert_eq!(second.code, "ACT-0002");
    assert_eq!(second.version, "00.01");
}

#[test]
fn test_version_rolls_over_after_nine_minor_steps() {
    let (services, _temp) = create_services();
    let records = &services.records;
    let (_, project) = org_and_project(&services);

    let mut nfr = records
        .create(EntityKind::NonFunctionalRequirement, Some(&project.id), named("Latency"))
        .unwrap();
    assert_eq!(nfr.code, "RNF-0001");

    let mut seen = vec![nfr.version.clone()];
    for i in 0..9 {
        nfr = records
            .update(
                EntityKind::NonFunctionalRequirement,
                Some(&project.id),
                &nfr.id,
                rename(&format!("Latency r{}", i)),
            )
            .unwrap();
        seen.push(nfr.version.clone());
    }

    assert_eq!(seen[8], "00.09");
    assert_eq!(seen[9], "01.00");
}

#[test]
fn test_deleted_codes_are_never_reissued() {
    let (services, _temp) = create_services();
    let records = &services.records;
    let (_, project) = org_and_project(&services);

    let first = records
        .create(EntityKind::Interview, Some(&project.id), named("Kickoff"))
        .unwrap();
    let second = records
        .create(EntityKind::Interview, Some(&project.id), named("Follow-up"))
        .unwrap();
    assert_eq!((first.code.as_str(), second.code.as_str()), ("ENT-001", "ENT-002"));

    assert!(records
        .delete(EntityKind::Interview, Some(&project.id), &second.id)
        .unwrap());

    let third = records
        .create(EntityKind::Interview, Some(&project.id), named("Workshop"))
        .unwrap();
    assert_eq!(third.code, "ENT-003");
}

#[test]
fn test_risk_created_under_project_resolved_by_code() {
    let (services, _temp) = create_services();
    let records = &services.records;
    let (org, project) = org_and_project(&services);

    // Callers holding only codes resolve them before anything else
    let org_id = records.resolve(EntityKind::Organization, None, "ORG-001").unwrap();
    assert_eq!(org_id, org.id);
    let project_id = records
        .resolve(EntityKind::Project, Some(&org_id), "PROJ-001")
        .unwrap();
    assert_eq!(project_id, project.id);

    let risk = records
        .create(EntityKind::Risk, Some(&project_id), named("Scope creep"))
        .unwrap();
    assert_eq!(risk.code, "RISK-0001");
    assert_eq!(risk.scope_id, project.id);

    // An unresolved code is never accepted as a scope
    let raw = records.create(EntityKind::Risk, Some("PROJ-001"), named("Vendor lock-in"));
    assert!(matches!(raw, Err(StorageError::InvalidScope(_))));
}

#[test]
fn test_codes_restart_per_parent() {
    let (services, _temp) = create_services();
    let records = &services.records;
    let (org, first_project) = org_and_project(&services);
    let second_project = records
        .create(EntityKind::Project, Some(&org.id), named("Payroll"))
        .unwrap();
    assert_eq!(second_project.code, "PROJ-002");

    for project in [&first_project, &second_project] {
        let educcion = records
            .create(EntityKind::Educcion, Some(&project.id), named("Elicitation"))
            .unwrap();
        assert_eq!(educcion.code, "EDU-001");

        let ilacion = records
            .create(EntityKind::Ilacion, Some(&educcion.id), named("Inference"))
            .unwrap();
        assert_eq!(ilacion.code, "ILA-001");

        let spec = records
            .create(EntityKind::Specification, Some(&ilacion.id), named("Login"))
            .unwrap();
        assert_eq!(spec.code, "ESP-001");
        assert_eq!(spec.version, "00.01");
    }

    // Same code, different parents: each resolves within its own scope
    let a = records
        .resolve(EntityKind::Educcion, Some(&first_project.id), "EDU-001")
        .unwrap();
    let b = records
        .resolve(EntityKind::Educcion, Some(&second_project.id), "EDU-001")
        .unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_global_kinds() {
    let (services, _temp) = create_services();
    let records = &services.records;

    let role = records.create(EntityKind::Role, None, named("Analyst")).unwrap();
    assert_eq!(role.code, "ROL-001");
    assert_eq!(role.version, "01.00");
    assert_eq!(role.scope_id, reqdocs_storage::GLOBAL_SCOPE);

    let author = records.create(EntityKind::Author, None, named("Ana")).unwrap();
    assert_eq!(author.code, "AUT-0001");
    assert_eq!(author.version, "00.01");

    let stats = services.db.stats().unwrap();
    assert_eq!(stats.record_count, 2);
    assert_eq!(stats.counter_count, 2);
}

#[test]
fn test_records_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("records.db");

    let project_id = {
        let services = Services::new(Arc::new(RecordDb::open(&path, &DbOptions::default()).unwrap()));
        let (_, project) = org_and_project(&services);
        services
            .records
            .create(EntityKind::Expert, Some(&project.id), named("Domain expert"))
            .unwrap();
        project.id
    };

    let services = Services::new(Arc::new(RecordDb::open(&path, &DbOptions::default()).unwrap()));
    let next = services
        .records
        .next_code(EntityKind::Expert, Some(&project_id))
        .unwrap();
    assert_eq!(next.to_string(), "EXP-002");
}
