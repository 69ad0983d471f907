//! Soft delete honours the ON DELETE policy of every dependent relation:
//! RESTRICT blocks, CASCADE soft-deletes, SET NULL detaches.

mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use uuid::Uuid;

use coop_core::mutual_fund::MutualFundComputationType;
use coop_core::tenant::UserContext;
use coop_db::models::branch::Branch;
use coop_db::models::loan_tag::LoanTag;
use coop_db::models::loan_transaction::LoanTransaction;
use coop_db::models::member_profile::MemberProfile;
use coop_db::models::mutual_fund::MutualFund;
use coop_db::models::mutual_fund_entry::MutualFundEntry;
use coop_db::models::organization::Organization;
use coop_db::models::organization_daily_usage::OrganizationDailyUsage;
use coop_db::repositories::{
    branch_registry, loan_tag_registry, loan_transaction_registry, member_profile_registry,
    member_type_registry, mutual_fund_entry_registry, mutual_fund_registry,
    organization_daily_usage_registry, organization_registry,
};
use coop_db::{DbError, MemoryStore};

use common::{create_account, create_member, create_member_type, user};

async fn create_loan(
    store: &MemoryStore,
    user: &UserContext,
    member_id: Uuid,
    account_id: Uuid,
) -> LoanTransaction {
    loan_transaction_registry(store.clone())
        .create(
            user.user_id,
            LoanTransaction {
                organization_id: user.organization_id,
                branch_id: user.branch_id,
                member_profile_id: member_id,
                account_id,
                applied_amount: 10_000.0,
                terms: 12,
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn restrict_blocks_deleting_a_member_with_loans() {
    let store = MemoryStore::new();
    let user = user();
    let member = create_member(&store, &user, None, "Ana", "Reyes").await;
    let account = create_account(&store, &user, "Regular loan").await;
    create_loan(&store, &user, member.audit.id, account.audit.id).await;

    let err = member_profile_registry(store.clone())
        .delete(user.user_id, member.audit.id)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        DbError::Restricted {
            entity: "member_profile",
            dependent: "loan_transaction"
        }
    );

    // Nothing was written.
    let raw = store.raw_row::<MemberProfile>(member.audit.id).unwrap().unwrap();
    assert!(raw.audit.deleted_at.is_none());
    assert_eq!(store.outbox().unwrap().iter().filter(|e| e.action == "delete").count(), 0);
}

#[tokio::test]
async fn cascade_soft_deletes_loan_tags() {
    let store = MemoryStore::new();
    let user = user();
    let member = create_member(&store, &user, None, "Ben", "Cruz").await;
    let account = create_account(&store, &user, "Salary loan").await;
    let loan = create_loan(&store, &user, member.audit.id, account.audit.id).await;
    let tags = loan_tag_registry(store.clone());
    let mut tag_ids = Vec::new();
    for name in ["Priority", "Collateral"] {
        let tag = tags
            .create(
                user.user_id,
                LoanTag {
                    organization_id: user.organization_id,
                    branch_id: user.branch_id,
                    loan_transaction_id: loan.audit.id,
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        tag_ids.push(tag.audit.id);
    }

    loan_transaction_registry(store.clone())
        .delete(user.user_id, loan.audit.id)
        .await
        .unwrap();

    assert!(tags.for_loan_transaction(loan.audit.id).await.unwrap().is_empty());
    for id in tag_ids {
        let raw = store.raw_row::<LoanTag>(id).unwrap().unwrap();
        assert!(raw.audit.deleted_at.is_some());
        assert_eq!(raw.audit.deleted_by_id, Some(user.user_id));
    }

    // Once the loan is gone the member can be deleted.
    member_profile_registry(store.clone())
        .delete(user.user_id, member.audit.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn set_null_detaches_members_from_a_deleted_type() {
    let store = MemoryStore::new();
    let user = user();
    let member_type = create_member_type(&store, &user, "ASC").await;
    let member = create_member(&store, &user, Some(member_type.audit.id), "Cora", "Dizon").await;

    member_type_registry(store.clone())
        .delete(user.user_id, member_type.audit.id)
        .await
        .unwrap();

    let member = member_profile_registry(store.clone())
        .get_by_id(member.audit.id)
        .await
        .unwrap();
    assert_eq!(member.member_type_id, None);
    assert!(member.member_type.is_none());
    assert!(member.audit.deleted_at.is_none());
}

#[tokio::test]
async fn cascade_reaches_mutual_fund_entries() {
    let store = MemoryStore::new();
    let user = user();
    let deceased = create_member(&store, &user, None, "Dan", "Enriquez").await;
    let contributor = create_member(&store, &user, None, "Eva", "Flores").await;
    let funds = mutual_fund_registry(store.clone());
    let fund = funds
        .create(
            user.user_id,
            MutualFund {
                organization_id: user.organization_id,
                branch_id: user.branch_id,
                member_profile_id: deceased.audit.id,
                name: "Bereavement".to_string(),
                amount: 50.0,
                computation_type: MutualFundComputationType::FixedAmount,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let entries = mutual_fund_entry_registry(store.clone());
    let entry = entries
        .create(
            user.user_id,
            MutualFundEntry {
                organization_id: user.organization_id,
                branch_id: user.branch_id,
                mutual_fund_id: fund.audit.id,
                member_profile_id: contributor.audit.id,
                amount: 50.0,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The contributor is still referenced by a live entry.
    assert_matches!(
        member_profile_registry(store.clone())
            .delete(user.user_id, contributor.audit.id)
            .await,
        Err(DbError::Restricted { dependent: "mutual_fund_entry", .. })
    );

    funds.delete(user.user_id, fund.audit.id).await.unwrap();
    assert!(entries.for_mutual_fund(fund.audit.id).await.unwrap().is_empty());
    let raw = store.raw_row::<MutualFundEntry>(entry.audit.id).unwrap().unwrap();
    assert!(raw.audit.deleted_at.is_some());

    member_profile_registry(store.clone())
        .delete(user.user_id, contributor.audit.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn organization_delete_is_restricted_by_branches_and_cascades_usage() {
    let store = MemoryStore::new();
    let user = user();
    let organizations = organization_registry(store.clone());
    let organization = organizations
        .create(
            user.user_id,
            Organization {
                name: "Valley Cooperative".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let branch = branch_registry(store.clone())
        .create(
            user.user_id,
            Branch {
                organization_id: organization.audit.id,
                name: "Main".to_string(),
                is_main_branch: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let usage = organization_daily_usage_registry(store.clone())
        .create(
            user.user_id,
            OrganizationDailyUsage {
                organization_id: organization.audit.id,
                usage_date: Utc::now(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_matches!(
        organizations.delete(user.user_id, organization.audit.id).await,
        Err(DbError::Restricted { entity: "organization", dependent: "branch" })
    );

    branch_registry(store.clone())
        .delete(user.user_id, branch.audit.id)
        .await
        .unwrap();
    organizations
        .delete(user.user_id, organization.audit.id)
        .await
        .unwrap();

    let raw = store
        .raw_row::<OrganizationDailyUsage>(usage.audit.id)
        .unwrap()
        .unwrap();
    assert!(raw.audit.deleted_at.is_some());
}
