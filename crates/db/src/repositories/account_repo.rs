//! Repository for the `accounts` table.

use coop_core::tenant::TenantScope;

use crate::error::DbError;
use crate::models::account::{Account, AccountRequest, AccountResponse};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type AccountRepo<S = PgStore> = Registry<Account, AccountResponse, AccountRequest, S>;

pub fn account_registry<S: Store>(store: S) -> AccountRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(vec!["charges_rate_scheme"], |account: &Account| {
            AccountResponse::from(account)
        }),
    )
}

impl<S: Store> Registry<Account, AccountResponse, AccountRequest, S> {
    /// Accounts of the branch a loan can be booked against.
    pub async fn lending_accounts(&self, tenant: TenantScope) -> Result<Vec<Account>, DbError> {
        let accounts = self
            .current_branch(tenant.organization_id, tenant.branch_id)
            .await?;
        Ok(accounts
            .into_iter()
            .filter(|account| account.account_type.is_lending())
            .collect())
    }
}
