//! Tenant-scoped listings and the amount-bracket lookups.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use uuid::Uuid;

use coop_core::account::AccountType;
use coop_core::charges::ChargesRateSchemeType;
use coop_core::error::CoreError;
use coop_core::interest::InterestType;
use coop_core::member::MemberStatus;
use coop_db::models::account::Account;
use coop_db::models::browse_reference::BrowseReference;
use coop_db::models::charges_rate_by_range_or_minimum_amount::ChargesRateByRangeOrMinimumAmountRequest;
use coop_db::models::charges_rate_scheme::ChargesRateSchemeRequest;
use coop_db::models::interest_rate_by_amount::InterestRateByAmount;
use coop_db::models::member_type::MemberType;
use coop_db::models::organization_daily_usage::OrganizationDailyUsage;
use coop_db::repositories::{
    account_registry, browse_reference_registry, charges_rate_by_range_or_minimum_amount_registry,
    charges_rate_scheme_registry, interest_rate_by_amount_registry, member_profile_registry,
    member_type_registry, organization_daily_usage_registry,
};
use coop_db::{DbError, MemoryStore};

use common::{create_account, create_member, create_member_type, sibling_branch_user, user};

// ---------------------------------------------------------------------------
// Tenancy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn current_branch_only_returns_the_branch_rows() {
    let store = MemoryStore::new();
    let user = user();
    let neighbour = sibling_branch_user(&user);
    let repo = member_type_registry(store.clone());
    repo.create(user.user_id, MemberType::new(user.tenant(), "REG", "Regular", None))
        .await
        .unwrap();
    repo.create(user.user_id, MemberType::new(user.tenant(), "ASC", "Associate", None))
        .await
        .unwrap();
    repo.create(neighbour.user_id, MemberType::new(neighbour.tenant(), "REG", "Regular", None))
        .await
        .unwrap();

    let mine = repo
        .current_branch(user.organization_id, user.branch_id)
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|t| t.branch_id == user.branch_id));

    let theirs = repo
        .current_branch(neighbour.organization_id, neighbour.branch_id)
        .await
        .unwrap();
    assert_eq!(theirs.len(), 1);

    // Same branch id under a different organization matches nothing.
    assert!(repo
        .current_branch(Uuid::new_v4(), user.branch_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn usage_is_listed_per_organization_and_date_range() {
    let store = MemoryStore::new();
    let user = user();
    let repo = organization_daily_usage_registry(store.clone());
    let today = Utc::now();
    for days_ago in [0, 1, 2, 10] {
        repo.create(
            user.user_id,
            OrganizationDailyUsage {
                organization_id: user.organization_id,
                usage_date: today - Duration::days(days_ago),
                total_members: days_ago,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }
    repo.create(
        user.user_id,
        OrganizationDailyUsage {
            organization_id: Uuid::new_v4(),
            usage_date: today,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(
        repo.current_organization(user.organization_id).await.unwrap().len(),
        4
    );

    let recent = repo
        .for_range(user.organization_id, today - Duration::days(3), today)
        .await
        .unwrap();
    let members: Vec<_> = recent.iter().map(|u| u.total_members).collect();
    assert_eq!(members, [2, 1, 0]);
}

#[tokio::test]
async fn members_are_found_by_status_and_name() {
    let store = MemoryStore::new();
    let user = user();
    let repo = member_profile_registry(store.clone());
    let mut verified = create_member(&store, &user, None, "Mara", "Navarro").await;
    create_member(&store, &user, None, "Nico", "Ocampo").await;
    verified.status = MemberStatus::Verified;
    repo.update(user.user_id, verified.clone()).await.unwrap();

    let found = repo.by_status(user.tenant(), MemberStatus::Verified).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].audit.id, verified.audit.id);

    let found = repo.search(user.tenant(), "navarro").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].full_name, "Mara Navarro");
    assert_eq!(repo.search(user.tenant(), "a").await.unwrap().len(), 2);
}

#[tokio::test]
async fn lending_accounts_exclude_deposit_accounts() {
    let store = MemoryStore::new();
    let user = user();
    create_account(&store, &user, "Regular loan").await;
    account_registry(store.clone())
        .create(
            user.user_id,
            Account {
                organization_id: user.organization_id,
                branch_id: user.branch_id,
                name: "Savings".to_string(),
                account_type: AccountType::Deposit,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let lending = account_registry(store.clone())
        .lending_accounts(user.tenant())
        .await
        .unwrap();
    assert_eq!(lending.len(), 1);
    assert_eq!(lending[0].name, "Regular loan");
}

// ---------------------------------------------------------------------------
// Brackets
// ---------------------------------------------------------------------------

async fn interest_brackets(store: &MemoryStore, browse_reference_id: Uuid) {
    let user = user();
    let repo = interest_rate_by_amount_registry(store.clone());
    for (from_amount, to_amount, interest_rate) in [(0.0, 999.0, 1.0), (1000.0, 4999.0, 2.0)] {
        repo.create(
            user.user_id,
            InterestRateByAmount {
                organization_id: user.organization_id,
                branch_id: user.branch_id,
                browse_reference_id,
                from_amount,
                to_amount,
                interest_rate,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn interest_rate_lookup_uses_inclusive_brackets() {
    let store = MemoryStore::new();
    let reference = Uuid::new_v4();
    interest_brackets(&store, reference).await;
    let repo = interest_rate_by_amount_registry(store.clone());

    let rate = repo.interest_rate_for_amount(reference, 500.0).await.unwrap();
    assert_eq!(rate.map(|r| r.interest_rate), Some(1.0));

    let rate = repo.interest_rate_for_amount(reference, 1000.0).await.unwrap();
    assert_eq!(rate.map(|r| r.interest_rate), Some(2.0));

    let rate = repo.interest_rate_for_amount(reference, 4999.0).await.unwrap();
    assert_eq!(rate.map(|r| r.interest_rate), Some(2.0));

    assert!(repo.interest_rate_for_amount(reference, 5000.0).await.unwrap().is_none());
    assert!(repo
        .interest_rate_for_amount(Uuid::new_v4(), 500.0)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn interest_brackets_overlapping_a_range() {
    let store = MemoryStore::new();
    let reference = Uuid::new_v4();
    interest_brackets(&store, reference).await;
    let repo = interest_rate_by_amount_registry(store.clone());

    assert_eq!(repo.for_range(reference, 900.0, 1100.0).await.unwrap().len(), 2);
    assert_eq!(repo.for_range(reference, 1200.0, 1300.0).await.unwrap().len(), 1);
    assert!(repo.for_range(reference, 6000.0, 7000.0).await.unwrap().is_empty());
    assert_eq!(repo.for_browse_reference(reference).await.unwrap().len(), 2);
}

#[tokio::test]
async fn browse_reference_falls_back_to_the_catch_all() {
    let store = MemoryStore::new();
    let user = user();
    let account = create_account(&store, &user, "Time deposit").await;
    let regular = create_member_type(&store, &user, "REG").await;
    let associate = create_member_type(&store, &user, "ASC").await;
    let repo = browse_reference_registry(store.clone());
    for (name, member_type_id) in [("Default", None), ("Regular", Some(regular.audit.id))] {
        repo.create(
            user.user_id,
            BrowseReference {
                organization_id: user.organization_id,
                branch_id: user.branch_id,
                account_id: account.audit.id,
                member_type_id,
                name: name.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let applied = |member_type_id| repo.applicable(account.audit.id, member_type_id);
    assert_eq!(applied(Some(regular.audit.id)).await.unwrap().unwrap().name, "Regular");
    assert_eq!(applied(Some(associate.audit.id)).await.unwrap().unwrap().name, "Default");
    assert_eq!(applied(None).await.unwrap().unwrap().name, "Default");
    assert!(repo
        .applicable(Uuid::new_v4(), None)
        .await
        .unwrap()
        .is_none());
    assert_eq!(repo.for_account(account.audit.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn effective_rate_follows_the_interest_type() {
    let store = MemoryStore::new();
    let user = user();
    let account = create_account(&store, &user, "Salary loan").await;
    let repo = browse_reference_registry(store.clone());
    let mut ids = Vec::new();
    for (name, interest_type) in [("Bracketed", InterestType::Amount), ("Flat", InterestType::Fixed)] {
        let created = repo
            .create(
                user.user_id,
                BrowseReference {
                    organization_id: user.organization_id,
                    branch_id: user.branch_id,
                    account_id: account.audit.id,
                    name: name.to_string(),
                    interest_type,
                    interest_rate: 5.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        interest_brackets(&store, created.audit.id).await;
        ids.push(created.audit.id);
    }

    let bracketed = repo.get_by_id(ids[0]).await.unwrap();
    assert_eq!(bracketed.interest_rates_by_amount.len(), 2);
    assert_eq!(bracketed.effective_rate(500.0), Some(1.0));
    assert_eq!(bracketed.effective_rate(1000.0), Some(2.0));
    assert_eq!(bracketed.effective_rate(5000.0), None);

    let flat = repo.get_by_id(ids[1]).await.unwrap();
    assert_eq!(flat.effective_rate(5000.0), Some(5.0));
}

fn bracket(from_amount: f64, to_amount: f64, charge: f64, minimum_amount: f64) -> ChargesRateByRangeOrMinimumAmountRequest {
    ChargesRateByRangeOrMinimumAmountRequest {
        id: None,
        charges_rate_scheme_id: Uuid::nil(),
        from_amount,
        to_amount,
        charge,
        amount: 0.0,
        minimum_amount,
    }
}

#[tokio::test]
async fn charge_scheme_saves_brackets_and_prices_loans() {
    let store = MemoryStore::new();
    let user = user();
    let schemes = charges_rate_scheme_registry(store.clone());
    let request = ChargesRateSchemeRequest {
        name: "Service fee".to_string(),
        description: None,
        scheme_type: ChargesRateSchemeType::ByRange,
        charges_rate_by_range_or_minimum_amounts: vec![
            bracket(0.0, 9_999.0, 2.0, 100.0),
            bracket(10_000.0, 50_000.0, 1.0, 0.0),
        ],
        charges_rate_by_range_or_minimum_amounts_deleted: Vec::new(),
    };

    let scheme = schemes.save(&user, None, &request).await.unwrap();
    assert_eq!(scheme.charges_rate_by_range_or_minimum_amounts.len(), 2);

    let ranges = charges_rate_by_range_or_minimum_amount_registry(store.clone());
    let id = scheme.audit.id;
    assert_eq!(ranges.for_scheme(id).await.unwrap()[0].from_amount, 0.0);

    let small = ranges.charge_for_amount(id, 2_000.0).await.unwrap().unwrap();
    assert_eq!(small.to_amount, 9_999.0);
    let large = ranges.charge_for_amount(id, 10_000.0).await.unwrap().unwrap();
    assert_eq!(large.from_amount, 10_000.0);
    assert!(ranges.charge_for_amount(id, 60_000.0).await.unwrap().is_none());
    assert!(ranges.charge_for_loan(id, 60_000.0).await.unwrap().is_none());
    assert!(ranges.charge_for_loan(id, 20_000.0).await.unwrap().is_some());
}

#[tokio::test]
async fn overlapping_charge_brackets_are_rejected() {
    let store = MemoryStore::new();
    let user = user();
    let request = ChargesRateSchemeRequest {
        name: "Overlapping".to_string(),
        description: None,
        scheme_type: ChargesRateSchemeType::ByRange,
        charges_rate_by_range_or_minimum_amounts: vec![
            bracket(0.0, 5_000.0, 1.0, 0.0),
            bracket(5_000.0, 9_000.0, 1.0, 0.0),
        ],
        charges_rate_by_range_or_minimum_amounts_deleted: Vec::new(),
    };

    assert!(charges_rate_scheme_registry(store.clone())
        .save(&user, None, &request)
        .await
        .is_err());
    assert!(store.outbox().unwrap().is_empty());
}

#[tokio::test]
async fn scheme_updates_check_brackets_they_keep() {
    let store = MemoryStore::new();
    let user = user();
    let schemes = charges_rate_scheme_registry(store.clone());
    let mut request = ChargesRateSchemeRequest {
        name: "Processing fee".to_string(),
        description: None,
        scheme_type: ChargesRateSchemeType::ByRange,
        charges_rate_by_range_or_minimum_amounts: vec![bracket(0.0, 999.0, 1.0, 0.0)],
        charges_rate_by_range_or_minimum_amounts_deleted: Vec::new(),
    };
    let scheme = schemes.save(&user, None, &request).await.unwrap();
    let kept = scheme.charges_rate_by_range_or_minimum_amounts[0].audit.id;

    request.charges_rate_by_range_or_minimum_amounts = vec![bracket(500.0, 1_500.0, 2.0, 0.0)];
    assert_matches!(
        schemes.save(&user, Some(scheme.audit.id), &request).await,
        Err(DbError::Core(CoreError::Validation(_)))
    );
    let ranges = charges_rate_by_range_or_minimum_amount_registry(store.clone());
    assert_eq!(ranges.for_scheme(scheme.audit.id).await.unwrap().len(), 1);

    // Deleting the old bracket in the same save makes room for the new one.
    request.charges_rate_by_range_or_minimum_amounts_deleted = vec![kept];
    schemes.save(&user, Some(scheme.audit.id), &request).await.unwrap();

    // So does rewriting it in place.
    let current = ranges.for_scheme(scheme.audit.id).await.unwrap();
    let mut moved = bracket(0.0, 1_999.0, 2.0, 0.0);
    moved.id = Some(current[0].audit.id);
    request.charges_rate_by_range_or_minimum_amounts = vec![moved];
    request.charges_rate_by_range_or_minimum_amounts_deleted = Vec::new();
    schemes.save(&user, Some(scheme.audit.id), &request).await.unwrap();

    let brackets: Vec<_> = ranges
        .for_scheme(scheme.audit.id)
        .await
        .unwrap()
        .iter()
        .map(|r| (r.from_amount, r.to_amount))
        .collect();
    assert_eq!(brackets, vec![(0.0, 1_999.0)]);
}
