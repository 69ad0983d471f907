//! Repository for the `loan_transactions` table.
//!
//! Besides CRUD this owns the release workflow queries (one per
//! [`LoanTransactionState`]), the transition that moves a loan forward, and
//! the header-plus-tags save.

use chrono::Utc;

use coop_core::filter::FilterSql;
use coop_core::loan_state::LoanTransactionState;
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;
use coop_core::validation::validate_request;

use crate::error::DbError;
use crate::models::loan_transaction::{LoanTransaction, LoanTransactionRequest, LoanTransactionResponse};
use crate::record::Record;
use crate::registry::{EntityRequest, Registry, RegistryParams};
use crate::repositories::loan_tag_repo::loan_tag_registry;
use crate::repositories::sync_children;
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type LoanTransactionRepo<S = PgStore> =
    Registry<LoanTransaction, LoanTransactionResponse, LoanTransactionRequest, S>;

pub fn loan_transaction_registry<S: Store>(store: S) -> LoanTransactionRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(
            vec![
                "member_profile.member_type",
                "account",
                "loan_purpose",
                "loan_status",
                "loan_tags",
            ],
            |loan: &LoanTransaction| LoanTransactionResponse::from(loan),
        ),
    )
}

impl<S: Store> Registry<LoanTransaction, LoanTransactionResponse, LoanTransactionRequest, S> {
    /// Loans of the branch currently in `state`.
    pub async fn in_state(
        &self,
        tenant: TenantScope,
        state: LoanTransactionState,
    ) -> Result<Vec<LoanTransaction>, DbError> {
        self.find(vec![
            FilterSql::eq("organization_id", tenant.organization_id),
            FilterSql::eq("branch_id", tenant.branch_id),
            FilterSql::eq("state", state.as_str()),
        ])
        .await
    }

    pub async fn draft(&self, tenant: TenantScope) -> Result<Vec<LoanTransaction>, DbError> {
        self.in_state(tenant, LoanTransactionState::Draft).await
    }

    pub async fn printed(&self, tenant: TenantScope) -> Result<Vec<LoanTransaction>, DbError> {
        self.in_state(tenant, LoanTransactionState::Printed).await
    }

    pub async fn approved(&self, tenant: TenantScope) -> Result<Vec<LoanTransaction>, DbError> {
        self.in_state(tenant, LoanTransactionState::Approved).await
    }

    pub async fn released(&self, tenant: TenantScope) -> Result<Vec<LoanTransaction>, DbError> {
        self.in_state(tenant, LoanTransactionState::Released).await
    }

    /// Move a loan one step forward, stamping the acting user.
    pub async fn advance(
        &self,
        user: &UserContext,
        id: DbId,
        to: LoanTransactionState,
    ) -> Result<LoanTransaction, DbError> {
        let mut loan = self.get_for_user(user, id).await?;
        let from = loan.state;
        loan.advance(to, user.user_id, Utc::now())?;
        loan.clear_relations();
        let updated = self.update(user.user_id, loan).await?;
        tracing::info!(
            loan_transaction_id = %id,
            from = %from,
            to = %to,
            "Loan transaction advanced"
        );
        Ok(updated)
    }

    /// Create (`id == None`) or update a loan together with its tags in one
    /// transaction, then reload it with preloads.
    pub async fn save(
        &self,
        user: &UserContext,
        id: Option<DbId>,
        request: &LoanTransactionRequest,
    ) -> Result<LoanTransaction, DbError> {
        validate_request(request)?;
        let tags = loan_tag_registry(self.store().clone());

        let (mut loan, existing_tags) = match id {
            Some(id) => {
                let mut loan = self.get_for_user(user, id).await?;
                let existing = loan.loan_tags.iter().map(Record::id).collect::<Vec<_>>();
                request.apply_to(&mut loan);
                (loan, existing)
            }
            None => (request.to_entity(user), Vec::new()),
        };
        loan.clear_relations();

        let mut tx = self.store().begin().await?;
        let saved = match id {
            Some(_) => self.update_with_tx(&mut tx, user.user_id, loan).await?,
            None => self.create_with_tx(&mut tx, user.user_id, loan).await?,
        };
        let children = request
            .loan_tags
            .iter()
            .map(|tag_request| {
                let mut tag = tag_request.to_entity(user);
                tag.loan_transaction_id = saved.id();
                tag
            })
            .collect();
        sync_children(
            &tags,
            &mut tx,
            user.user_id,
            &existing_tags,
            children,
            &request.loan_tags_deleted,
        )
        .await?;
        self.store().commit(tx).await?;

        self.get_by_id(saved.id()).await
    }
}
