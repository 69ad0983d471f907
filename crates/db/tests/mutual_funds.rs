//! Mutual fund totals and nested preloads of contributions.

mod common;

use coop_core::mutual_fund::MutualFundComputationType;
use coop_db::models::mutual_fund::MutualFund;
use coop_db::models::mutual_fund_entry::MutualFundEntry;
use coop_db::repositories::{mutual_fund_entry_registry, mutual_fund_registry};
use coop_db::MemoryStore;

use common::{create_account, create_member, user};

#[tokio::test]
async fn total_follows_live_entries_and_entries_preload_their_member() {
    let store = MemoryStore::new();
    let user = user();
    let deceased = create_member(&store, &user, None, "Olga", "Pascual").await;
    let account = create_account(&store, &user, "Mutual aid").await;
    let funds = mutual_fund_registry(store.clone());
    let entries = mutual_fund_entry_registry(store.clone());
    let fund = funds
        .create(
            user.user_id,
            MutualFund {
                organization_id: user.organization_id,
                branch_id: user.branch_id,
                member_profile_id: deceased.audit.id,
                name: "Pascual family".to_string(),
                amount: 300.0,
                computation_type: MutualFundComputationType::PerMember,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut entry_ids = Vec::new();
    for (first_name, amount) in [("Paz", 100.0), ("Quin", 150.0)] {
        let contributor = create_member(&store, &user, None, first_name, "Ramos").await;
        let entry = entries
            .create(
                user.user_id,
                MutualFundEntry {
                    organization_id: user.organization_id,
                    branch_id: user.branch_id,
                    mutual_fund_id: fund.audit.id,
                    member_profile_id: contributor.audit.id,
                    account_id: Some(account.audit.id),
                    amount,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        entry_ids.push(entry.audit.id);
    }

    let fund = funds.refresh_total(user.user_id, fund.audit.id).await.unwrap();
    assert_eq!(fund.total_amount, 250.0);

    let loaded = funds.get_by_id(fund.audit.id).await.unwrap();
    assert_eq!(loaded.member_profile.as_deref().unwrap().full_name, "Olga Pascual");
    assert_eq!(loaded.mutual_fund_entries.len(), 2);
    assert!(loaded
        .mutual_fund_entries
        .iter()
        .all(|entry| entry.member_profile.as_deref().map(|m| m.last_name.as_str()) == Some("Ramos")));
    assert_eq!(loaded.contribution(2), Some(150.0));

    entries.delete(user.user_id, entry_ids[0]).await.unwrap();
    let fund = funds.refresh_total(user.user_id, fund.audit.id).await.unwrap();
    assert_eq!(fund.total_amount, 150.0);

    let by_member = entries
        .for_member(loaded.mutual_fund_entries[1].member_profile_id)
        .await
        .unwrap();
    assert_eq!(by_member.len(), 1);
    assert_eq!(funds.for_member(deceased.audit.id).await.unwrap().len(), 1);
}
