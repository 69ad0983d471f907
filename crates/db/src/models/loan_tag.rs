//! Free-form tags attached to a loan transaction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use coop_core::filter::Value;
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::loan_transaction::{LoanTransaction, LoanTransactionResponse};
use crate::preload::{belongs_to, split_path, unknown_relation};
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// Topic axis of the owning loan transaction.
pub const SCOPE_LOAN_TRANSACTION: &str = "loan_transaction";

/// A row from the `loan_tags` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct LoanTag {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub loan_transaction_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,

    #[sqlx(skip)]
    pub loan_transaction: Option<Box<LoanTransaction>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanTagResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub loan_transaction_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_transaction: Option<Box<LoanTransactionResponse>>,
}

impl From<&LoanTag> for LoanTagResponse {
    fn from(tag: &LoanTag) -> Self {
        Self {
            audit: AuditResponse::from(&tag.audit),
            organization_id: tag.organization_id,
            branch_id: tag.branch_id,
            loan_transaction_id: tag.loan_transaction_id,
            name: tag.name.clone(),
            description: tag.description.clone(),
            category: tag.category.clone(),
            color: tag.color.clone(),
            icon: tag.icon.clone(),
            loan_transaction: tag
                .loan_transaction
                .as_deref()
                .map(LoanTransactionResponse::from)
                .map(Box::new),
        }
    }
}

/// A tag to create or update. Nested under a loan transaction request the
/// owner id is filled in by the save, and `id` selects the row to update.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoanTagRequest {
    pub id: Option<DbId>,
    #[serde(default)]
    pub loan_transaction_id: DbId,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    #[validate(length(max = 20))]
    pub color: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
}

impl EntityRequest<LoanTag> for LoanTagRequest {
    fn to_entity(&self, user: &UserContext) -> LoanTag {
        let mut tag = LoanTag {
            organization_id: user.organization_id,
            branch_id: user.branch_id,
            loan_transaction_id: self.loan_transaction_id,
            ..Default::default()
        };
        if let Some(id) = self.id {
            tag.audit.id = id;
        }
        self.apply_to(&mut tag);
        tag
    }

    fn apply_to(&self, tag: &mut LoanTag) {
        tag.name = self.name.clone();
        tag.description = self.description.clone();
        tag.category = self.category.clone();
        tag.color = self.color.clone();
        tag.icon = self.icon.clone();
    }
}

#[async_trait]
impl Record for LoanTag {
    const TABLE: &'static str = "loan_tags";
    const KIND: &'static str = "loan_tag";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "branch_id",
        "loan_transaction_id",
        "name",
        "description",
        "category",
        "color",
        "icon",
    ];

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("organization_id", self.organization_id.into()),
            ("branch_id", self.branch_id.into()),
            ("loan_transaction_id", self.loan_transaction_id.into()),
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
            ("category", self.category.clone().into()),
            ("color", self.color.clone().into()),
            ("icon", self.icon.clone().into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        let mut scopes = tenant_scopes(self.tenant());
        scopes.push((SCOPE_LOAN_TRANSACTION, self.loan_transaction_id));
        scopes
    }

    fn clear_relations(&mut self) {
        self.loan_transaction = None;
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("loan_transaction", nested) => {
                belongs_to::<S, Self, LoanTransaction>(
                    store,
                    rows,
                    nested,
                    |tag: &Self| Some(tag.loan_transaction_id),
                    |tag: &mut Self, loan| tag.loan_transaction = loan,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl BranchScoped for LoanTag {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}
