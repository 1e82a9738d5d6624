//! Tenant isolation and role gating across the resource services.

mod common;

use common::*;
use taskhive_core::prelude::*;

// ============================================================================
// Task tenant isolation
// ============================================================================

#[tokio::test]
async fn foreign_tenant_read_is_hidden_as_not_found() {
    let env = env();
    let org1 = seed_org(&env, "org-one").await;
    let org2 = seed_org(&env, "org-two").await;

    let (_, admin1) = seed_user(&env, "admin@one.example", org1.id, Role::Admin).await;
    let (_, viewer2) = seed_user(&env, "viewer@two.example", org2.id, Role::Viewer).await;

    let task = env
        .tasks
        .create(&admin1, &ctx(), new_task("org1 secret"))
        .await
        .expect("create");

    let err = env.tasks.get(&viewer2, &task.id).await.unwrap_err();

    // Internally distinguishable from a plain miss, externally a 404.
    assert_eq!(err.code(), ErrorCode::TenantDenied);
    assert_eq!(err.http_status(), axum::http::StatusCode::NOT_FOUND);

    // A genuinely missing task is RecordNotFound with the same status.
    let missing = env
        .tasks
        .get(&viewer2, &TaskId::generate())
        .await
        .unwrap_err();
    assert_eq!(missing.code(), ErrorCode::RecordNotFound);
    assert_eq!(missing.http_status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn administrators_cross_tenant_boundaries() {
    let env = env();
    let org1 = seed_org(&env, "org-one").await;
    let org2 = seed_org(&env, "org-two").await;

    let (_, editor1) = seed_user(&env, "editor@one.example", org1.id, Role::Editor).await;
    let (_, admin2) = seed_user(&env, "admin@two.example", org2.id, Role::Admin).await;
    let (_, owner2) = seed_user(&env, "owner@two.example", org2.id, Role::Owner).await;

    let task = env
        .tasks
        .create(&editor1, &ctx(), new_task("visible to admins"))
        .await
        .expect("create");

    assert!(env.tasks.get(&admin2, &task.id).await.is_ok());
    assert!(env.tasks.get(&owner2, &task.id).await.is_ok());
}

#[tokio::test]
async fn create_pins_task_to_the_principals_organization() {
    let env = env();
    let org = seed_org(&env, "org-one").await;
    let (user, editor) = seed_user(&env, "editor@one.example", org.id, Role::Editor).await;

    let task = env
        .tasks
        .create(&editor, &ctx(), new_task("mine"))
        .await
        .expect("create");

    assert_eq!(task.organization_id, org.id);
    assert_eq!(task.created_by, user.id);
    assert_eq!(task.assigned_to, Some(user.id));
}

#[tokio::test]
async fn list_is_pinned_for_non_admins_regardless_of_filter() {
    let env = env();
    let org1 = seed_org(&env, "org-one").await;
    let org2 = seed_org(&env, "org-two").await;

    let (_, editor1) = seed_user(&env, "editor@one.example", org1.id, Role::Editor).await;
    let (_, editor2) = seed_user(&env, "editor@two.example", org2.id, Role::Editor).await;

    env.tasks
        .create(&editor1, &ctx(), new_task("one"))
        .await
        .unwrap();
    env.tasks
        .create(&editor2, &ctx(), new_task("two"))
        .await
        .unwrap();

    // editor2 explicitly asks for org1's tasks and still gets only org2's.
    let tasks = env
        .tasks
        .list(&editor2, Some(org1.id), None)
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].organization_id, org2.id);

    // An admin with the same filter does see org1.
    let (_, admin2) = seed_user(&env, "admin@two.example", org2.id, Role::Admin).await;
    let tasks = env.tasks.list(&admin2, Some(org1.id), None).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].organization_id, org1.id);
}

// ============================================================================
// Role tiers on task mutations
// ============================================================================

#[tokio::test]
async fn viewer_cannot_create_or_edit_but_can_move_status() {
    let env = env();
    let org = seed_org(&env, "org-one").await;
    let (_, editor) = seed_user(&env, "editor@one.example", org.id, Role::Editor).await;
    let (_, viewer) = seed_user(&env, "viewer@one.example", org.id, Role::Viewer).await;

    // Create: Editor-and-up.
    let err = env
        .tasks
        .create(&viewer, &ctx(), new_task("nope"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let task = env
        .tasks
        .create(&editor, &ctx(), new_task("board item"))
        .await
        .unwrap();

    // Full edit: Forbidden for a same-tenant viewer (403, not 404).
    let err = env
        .tasks
        .update(
            &viewer,
            &ctx(),
            &task.id,
            TaskPatch {
                title: Some("renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert_eq!(err.http_status(), axum::http::StatusCode::FORBIDDEN);

    // Status transition: any member of the organization.
    let moved = env
        .tasks
        .update_status(&viewer, &ctx(), &task.id, TaskStatus::InProgress)
        .await
        .expect("status update");
    assert_eq!(moved.status, TaskStatus::InProgress);
}

#[tokio::test]
async fn delete_requires_admin_and_is_soft() {
    let env = env();
    let org = seed_org(&env, "org-one").await;
    let (_, editor) = seed_user(&env, "editor@one.example", org.id, Role::Editor).await;
    let (_, admin) = seed_user(&env, "admin@one.example", org.id, Role::Admin).await;

    let task = env
        .tasks
        .create(&editor, &ctx(), new_task("short-lived"))
        .await
        .unwrap();

    let err = env.tasks.delete(&editor, &ctx(), &task.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    env.tasks.delete(&admin, &ctx(), &task.id).await.unwrap();

    // Soft-deleted: gone from reads and listings, row preserved.
    let err = env.tasks.get(&admin, &task.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecordNotFound);

    let raw = TaskStore::find_by_id(env.store.as_ref(), &task.id)
        .await
        .unwrap()
        .expect("row still present");
    assert!(raw.is_deleted);
}

#[tokio::test]
async fn cross_tenant_write_is_hidden_as_not_found() {
    let env = env();
    let org1 = seed_org(&env, "org-one").await;
    let org2 = seed_org(&env, "org-two").await;
    let (_, editor1) = seed_user(&env, "editor@one.example", org1.id, Role::Editor).await;
    let (_, editor2) = seed_user(&env, "editor@two.example", org2.id, Role::Editor).await;

    let task = env
        .tasks
        .create(&editor1, &ctx(), new_task("org1 only"))
        .await
        .unwrap();

    let err = env
        .tasks
        .update(
            &editor2,
            &ctx(),
            &task.id,
            TaskPatch {
                title: Some("hijack".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TenantDenied);
    assert_eq!(err.http_status(), axum::http::StatusCode::NOT_FOUND);
}

// ============================================================================
// Status idempotence
// ============================================================================

#[tokio::test]
async fn status_update_is_idempotent_with_one_audit_entry_per_call() {
    let env = env();
    let org = seed_org(&env, "org-one").await;
    let (_, editor) = seed_user(&env, "editor@one.example", org.id, Role::Editor).await;

    let task = env
        .tasks
        .create(&editor, &ctx(), new_task("steady"))
        .await
        .unwrap();

    let first = env
        .tasks
        .update_status(&editor, &ctx(), &task.id, TaskStatus::InProgress)
        .await
        .unwrap();
    let second = env
        .tasks
        .update_status(&editor, &ctx(), &task.id, TaskStatus::InProgress)
        .await
        .unwrap();

    assert_eq!(first.status, TaskStatus::InProgress);
    assert_eq!(second.status, TaskStatus::InProgress);

    let filter = AuditFilter {
        action: Some("task.status".into()),
        ..Default::default()
    };
    let (_, total) = env.audit.query(&filter, &Page::default()).await.unwrap();
    assert_eq!(total, 2, "exactly one audit entry per call");
}

#[tokio::test]
async fn illegal_transition_is_rejected_as_conflict() {
    let env = env();
    let org = seed_org(&env, "org-one").await;
    let (_, editor) = seed_user(&env, "editor@one.example", org.id, Role::Editor).await;

    let task = env
        .tasks
        .create(&editor, &ctx(), new_task("finished"))
        .await
        .unwrap();
    env.tasks
        .update_status(&editor, &ctx(), &task.id, TaskStatus::InProgress)
        .await
        .unwrap();
    env.tasks
        .update_status(&editor, &ctx(), &task.id, TaskStatus::Done)
        .await
        .unwrap();

    // Done is terminal: cancellation is not reachable from it.
    let err = env
        .tasks
        .update_status(&editor, &ctx(), &task.id, TaskStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    assert_eq!(err.http_status(), axum::http::StatusCode::CONFLICT);
}

// ============================================================================
// Organizations
// ============================================================================

#[tokio::test]
async fn org_listing_depends_on_role() {
    let env = env();
    let org1 = seed_org(&env, "org-one").await;
    seed_org(&env, "org-two").await;

    let (_, viewer1) = seed_user(&env, "viewer@one.example", org1.id, Role::Viewer).await;
    let (_, admin1) = seed_user(&env, "admin@one.example", org1.id, Role::Admin).await;

    let visible = env.orgs.list(&viewer1).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, org1.id);

    let visible = env.orgs.list(&admin1).await.unwrap();
    assert_eq!(visible.len(), 2);
}

#[tokio::test]
async fn children_are_direct_and_tenant_gated() {
    let env = env();
    let root = seed_org(&env, "root").await;
    let org2 = seed_org(&env, "other").await;

    let (_, admin) = seed_user(&env, "admin@root.example", root.id, Role::Admin).await;
    let (_, viewer2) = seed_user(&env, "viewer@other.example", org2.id, Role::Viewer).await;

    let child = env
        .orgs
        .create(
            &admin,
            &ctx(),
            NewOrganization {
                name: "child".into(),
                description: None,
                parent_id: Some(root.id),
            },
        )
        .await
        .unwrap();
    env.orgs
        .create(
            &admin,
            &ctx(),
            NewOrganization {
                name: "grandchild".into(),
                description: None,
                parent_id: Some(child.id),
            },
        )
        .await
        .unwrap();

    // Direct children only.
    let children = env.orgs.children(&admin, &root.id).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, child.id);

    // Foreign non-admin is denied without existence confirmation.
    let err = env.orgs.children(&viewer2, &root.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::TenantDenied);
}

#[tokio::test]
async fn duplicate_org_name_conflicts() {
    let env = env();
    let org = seed_org(&env, "taken").await;
    let (_, admin) = seed_user(&env, "admin@x.example", org.id, Role::Admin).await;

    let err = env
        .orgs
        .create(
            &admin,
            &ctx(),
            NewOrganization {
                name: "taken".into(),
                description: None,
                parent_id: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateRecord);
}

#[tokio::test]
async fn api_key_lookup_resolves_active_orgs_only() {
    let env = env();
    let org = seed_org(&env, "keyed").await;
    let api_key = org.api_key.clone().expect("seeded key");

    let found = env.orgs.find_by_api_key(&api_key).await.unwrap();
    assert_eq!(found.id, org.id);

    let (_, admin) = seed_user(&env, "admin@keyed.example", org.id, Role::Admin).await;
    env.orgs.deactivate(&admin, &ctx(), &org.id).await.unwrap();

    let err = env.orgs.find_by_api_key(&api_key).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecordNotFound);
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn user_reads_are_tenant_gated() {
    let env = env();
    let org1 = seed_org(&env, "org-one").await;
    let org2 = seed_org(&env, "org-two").await;

    let (user1, _) = seed_user(&env, "member@one.example", org1.id, Role::Viewer).await;
    let (_, viewer2) = seed_user(&env, "viewer@two.example", org2.id, Role::Viewer).await;
    let (_, admin2) = seed_user(&env, "admin@two.example", org2.id, Role::Admin).await;

    let err = env.users.get(&viewer2, &user1.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::TenantDenied);

    let view = env.users.get(&admin2, &user1.id).await.unwrap();
    assert_eq!(view.id, user1.id);
}

#[tokio::test]
async fn deactivated_users_leave_the_member_listing() {
    let env = env();
    let org = seed_org(&env, "org-one").await;
    let (member, _) = seed_user(&env, "member@one.example", org.id, Role::Viewer).await;
    let (_, admin) = seed_user(&env, "admin@one.example", org.id, Role::Admin).await;

    assert_eq!(env.orgs.users_in(&admin, &org.id).await.unwrap().len(), 2);

    env.users
        .deactivate(&admin, &ctx(), &member.id)
        .await
        .unwrap();

    let members = env.orgs.users_in(&admin, &org.id).await.unwrap();
    assert_eq!(members.len(), 1);
    // The record itself survives for referential integrity.
    assert!(UserStore::find_by_id(env.store.as_ref(), &member.id)
        .await
        .unwrap()
        .is_some());
}
