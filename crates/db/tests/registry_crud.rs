//! Generic registry behaviour against the in-memory store: CRUD, tenant
//! visibility, projection, outbox events and topic naming.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use uuid::Uuid;

use coop_core::filter::{FilterSql, Query, SortSpec};
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::topics::Action;
use coop_db::models::loan_tag::LoanTag;
use coop_db::models::member_type::{MemberType, MemberTypeRequest};
use coop_db::models::organization::Organization;
use coop_db::models::organization_daily_usage::OrganizationDailyUsage;
use coop_db::repositories::{
    loan_tag_registry, member_type_registry, organization_daily_usage_registry,
    organization_registry,
};
use coop_db::{DbError, MemoryStore, Store};

use common::{sibling_branch_user, user, FaultyStore};

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_stamps_audit_and_reads_back() {
    let store = MemoryStore::new();
    let user = user();
    let repo = member_type_registry(store.clone());

    let created = repo
        .create(user.user_id, MemberType::new(user.tenant(), "REG", "Regular", None))
        .await
        .unwrap();

    assert!(!created.audit.id.is_nil());
    assert_eq!(created.audit.created_by_id, Some(user.user_id));
    assert_eq!(created.audit.updated_by_id, Some(user.user_id));
    assert!(created.audit.deleted_at.is_none());

    let fetched = repo.get_by_id(created.audit.id).await.unwrap();
    assert_eq!(fetched.name, "Regular");
    assert_eq!(fetched.audit, created.audit);
}

#[tokio::test]
async fn update_keeps_creation_stamp() {
    let store = MemoryStore::new();
    let user = user();
    let editor = sibling_branch_user(&user);
    let repo = member_type_registry(store.clone());
    let mut member_type = repo
        .create(user.user_id, MemberType::new(user.tenant(), "REG", "Regular", None))
        .await
        .unwrap();

    member_type.name = "Regular member".to_string();
    let updated = repo.update(editor.user_id, member_type.clone()).await.unwrap();

    assert_eq!(updated.name, "Regular member");
    assert_eq!(updated.audit.created_by_id, Some(user.user_id));
    assert_eq!(updated.audit.created_at, member_type.audit.created_at);
    assert_eq!(updated.audit.updated_by_id, Some(editor.user_id));
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let repo = member_type_registry(MemoryStore::new());
    let user = user();
    let mut ghost = MemberType::new(user.tenant(), "X", "Ghost", None);
    ghost.audit.id = Uuid::new_v4();

    let err = repo.update(user.user_id, ghost).await.unwrap_err();
    assert_matches!(err, DbError::NotFound { entity: "member_type", .. });
}

#[tokio::test]
async fn soft_deleted_rows_disappear_from_reads() {
    let store = MemoryStore::new();
    let user = user();
    let repo = member_type_registry(store.clone());
    let member_type = repo
        .create(user.user_id, MemberType::new(user.tenant(), "CLS", "Closed", None))
        .await
        .unwrap();
    let id = member_type.audit.id;

    let deleted = repo.delete(user.user_id, id).await.unwrap();
    assert!(deleted.audit.deleted_at.is_some());
    assert_eq!(deleted.audit.deleted_by_id, Some(user.user_id));

    assert_matches!(
        repo.get_by_id(id).await,
        Err(DbError::NotFound { entity: "member_type", .. })
    );
    assert!(repo
        .current_branch(user.organization_id, user.branch_id)
        .await
        .unwrap()
        .is_empty());

    let raw = store.raw_row::<MemberType>(id).unwrap().unwrap();
    assert!(raw.audit.deleted_at.is_some());

    // A second delete finds nothing live.
    assert_matches!(
        repo.delete(user.user_id, id).await,
        Err(DbError::NotFound { .. })
    );
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn find_one_with_sql_reports_no_match() {
    let repo = member_type_registry(MemoryStore::new());
    let err = repo
        .find_one_with_sql(Query::new().filter(FilterSql::eq("prefix", "NOPE")))
        .await
        .unwrap_err();
    assert_matches!(err, DbError::NoMatch { entity: "member_type" });
}

#[tokio::test]
async fn filters_on_unknown_columns_are_rejected() {
    let repo = member_type_registry(MemoryStore::new());
    let err = repo
        .find(vec![FilterSql::eq("colour", "red")])
        .await
        .unwrap_err();
    assert_matches!(err, DbError::UnknownColumn { entity: "member_type", ref column } if column == "colour");
}

#[tokio::test]
async fn arr_find_sorts_and_find_first_limits() {
    let store = MemoryStore::new();
    let user = user();
    let repo = member_type_registry(store.clone());
    for (prefix, name) in [("B", "Beta"), ("A", "Alpha"), ("C", "Gamma")] {
        repo.create(user.user_id, MemberType::new(user.tenant(), prefix, name, None))
            .await
            .unwrap();
    }

    let sorted = repo
        .arr_find(
            vec![FilterSql::eq("branch_id", user.branch_id)],
            vec![SortSpec::asc("prefix")],
        )
        .await
        .unwrap();
    let prefixes: Vec<_> = sorted.iter().map(|t| t.prefix.as_str()).collect();
    assert_eq!(prefixes, ["A", "B", "C"]);

    let first = repo
        .find_first(Query::new().sort(SortSpec::desc("prefix")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.prefix, "C");
}

#[tokio::test]
async fn rows_of_another_branch_are_invisible_to_the_user() {
    let store = MemoryStore::new();
    let owner = user();
    let outsider = sibling_branch_user(&owner);
    let repo = member_type_registry(store.clone());
    let member_type = repo
        .create(owner.user_id, MemberType::new(owner.tenant(), "REG", "Regular", None))
        .await
        .unwrap();

    assert!(repo.get_for_user(&owner, member_type.audit.id).await.is_ok());
    assert_matches!(
        repo.get_for_user(&outsider, member_type.audit.id).await,
        Err(DbError::NotFound { entity: "member_type", .. })
    );

    let request = MemberTypeRequest {
        prefix: "HIJ".to_string(),
        name: "Hijacked".to_string(),
        description: None,
    };
    assert_matches!(
        repo.update_from_request(&outsider, member_type.audit.id, &request).await,
        Err(DbError::NotFound { .. })
    );
}

#[tokio::test]
async fn requests_are_validated_before_writing() {
    let store = MemoryStore::new();
    let user = user();
    let repo = member_type_registry(store.clone());
    let request = MemberTypeRequest {
        prefix: String::new(),
        name: "No prefix".to_string(),
        description: None,
    };

    let err = repo.create_from_request(&user, &request).await.unwrap_err();
    assert_matches!(err, DbError::Core(coop_core::error::CoreError::Validation(_)));
    assert!(store.outbox().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn projection_of_nothing_is_nothing() {
    let repo = member_type_registry(MemoryStore::new());
    assert!(repo.to_model(None).is_none());
    assert!(repo.to_models(&[]).is_empty());
}

#[tokio::test]
async fn projection_serializes_audit_fields_flat() {
    let store = MemoryStore::new();
    let user = user();
    let repo = member_type_registry(store.clone());
    let member_type = repo
        .create(user.user_id, MemberType::new(user.tenant(), "REG", "Regular", Some("Voting")))
        .await
        .unwrap();

    let json = serde_json::to_value(repo.to_model(Some(&member_type)).unwrap()).unwrap();
    assert_eq!(json["id"], member_type.audit.id.to_string());
    assert_eq!(json["prefix"], "REG");
    assert!(json.get("deleted_at").is_none());
}

// ---------------------------------------------------------------------------
// Outbox and topics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_are_published_only_when_the_transaction_commits() {
    let store = MemoryStore::new();
    let user = user();
    let repo = member_type_registry(store.clone());

    let mut tx = store.begin().await.unwrap();
    let abandoned = repo
        .create_with_tx(&mut tx, user.user_id, MemberType::new(user.tenant(), "X", "Dropped", None))
        .await
        .unwrap();
    drop(tx);

    assert!(store.outbox().unwrap().is_empty());
    assert_matches!(
        repo.get_by_id(abandoned.audit.id).await,
        Err(DbError::NotFound { .. })
    );

    let kept = repo
        .create(user.user_id, MemberType::new(user.tenant(), "K", "Kept", None))
        .await
        .unwrap();
    let outbox = store.outbox().unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].entity_id, kept.audit.id);
    assert_eq!(outbox[0].action, "create");
    assert_eq!(outbox[0].payload["name"], "Kept");
}

#[tokio::test]
async fn concurrent_commits_conflict() {
    let store = MemoryStore::new();
    let user = user();
    let repo = member_type_registry(store.clone());

    let mut first = store.begin().await.unwrap();
    let mut second = store.begin().await.unwrap();
    repo.create_with_tx(&mut first, user.user_id, MemberType::new(user.tenant(), "A", "A", None))
        .await
        .unwrap();
    repo.create_with_tx(&mut second, user.user_id, MemberType::new(user.tenant(), "B", "B", None))
        .await
        .unwrap();

    store.commit(first).await.unwrap();
    assert_matches!(store.commit(second).await, Err(DbError::WriteConflict));
    assert_eq!(store.outbox().unwrap().len(), 1);
}

#[tokio::test]
async fn loan_tag_topics_cover_every_scope() {
    let store = MemoryStore::new();
    let user = user();
    let loan_transaction_id = Uuid::new_v4();
    let repo = loan_tag_registry(store.clone());

    let tag = repo
        .create(
            user.user_id,
            LoanTag {
                organization_id: user.organization_id,
                branch_id: user.branch_id,
                loan_transaction_id,
                name: "Priority".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let id = tag.audit.id;

    let expected = vec![
        "loan_tag.create".to_string(),
        format!("loan_tag.create.{id}"),
        format!("loan_tag.create.branch.{}", user.branch_id),
        format!("loan_tag.create.organization.{}", user.organization_id),
        format!("loan_tag.create.loan_transaction.{loan_transaction_id}"),
    ];
    assert_eq!(repo.topics(Action::Create, &tag), expected);
    assert_eq!(store.outbox().unwrap()[0].topics, expected);

    repo.delete(user.user_id, id).await.unwrap();
    let outbox = store.outbox().unwrap();
    assert_eq!(outbox[1].action, "delete");
    assert_eq!(outbox[1].topics[0], "loan_tag.delete");
    assert_eq!(
        outbox[1].topics[4],
        format!("loan_tag.delete.loan_transaction.{loan_transaction_id}")
    );
}

#[tokio::test]
async fn organization_scoped_topics_have_a_single_scope() {
    let store = MemoryStore::new();
    let user = user();
    let repo = organization_daily_usage_registry(store.clone());

    let usage = repo
        .create(
            user.user_id,
            OrganizationDailyUsage {
                organization_id: user.organization_id,
                usage_date: Utc::now(),
                total_members: 12,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let id = usage.audit.id;
    assert_eq!(
        repo.topics(Action::Update, &usage),
        vec![
            "organization_daily_usage.update".to_string(),
            format!("organization_daily_usage.update.{id}"),
            format!("organization_daily_usage.update.organization.{}", user.organization_id),
        ]
    );
}

#[tokio::test]
async fn organizations_are_only_visible_to_their_own_users() {
    let store = MemoryStore::new();
    let founder = user();
    let repo = organization_registry(store.clone());
    let organization = repo
        .create(
            founder.user_id,
            Organization {
                name: "Lakeside Cooperative".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let id = organization.audit.id;

    let member = UserContext::new(Uuid::new_v4(), TenantScope::new(id, Uuid::new_v4()));
    assert_eq!(repo.get_for_user(&member, id).await.unwrap().name, "Lakeside Cooperative");
    assert_matches!(
        repo.get_for_user(&founder, id).await,
        Err(DbError::NotFound { entity: "organization", .. })
    );
}

#[tokio::test]
async fn unscoped_topics_are_bare_and_by_id() {
    let store = MemoryStore::new();
    let user = user();
    let repo = organization_registry(store.clone());
    let organization = repo
        .create(
            user.user_id,
            Organization {
                name: "Harbor Cooperative".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let topics = repo.topics(Action::Delete, &organization);
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[1], format!("organization.delete.{}", organization.audit.id));
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_reads_time_out() {
    let repo = member_type_registry(FaultyStore::slow(Duration::from_millis(200)))
        .with_timeout(Duration::from_millis(10));

    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert_matches!(err, DbError::Timeout { entity: "member_type", .. });
}

#[tokio::test]
async fn reads_within_the_deadline_succeed() {
    let store = FaultyStore::slow(Duration::from_millis(1));
    let user = user();
    let repo = member_type_registry(store.clone()).with_timeout(Duration::from_secs(5));
    repo.create(user.user_id, MemberType::new(user.tenant(), "REG", "Regular", None))
        .await
        .unwrap();

    let rows = repo
        .current_branch(user.organization_id, user.branch_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}
