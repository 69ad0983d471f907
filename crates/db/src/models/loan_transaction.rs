//! Loan transactions and their release workflow.
//!
//! The `state` column is the source of truth for where a loan is; the
//! `printed_*`, `approved_*` and `released_*` columns record who moved it
//! forward and when. [`LoanTransaction::advance`] is the only way to change
//! the state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use coop_core::error::CoreError;
use coop_core::filter::Value;
use coop_core::loan_state::LoanTransactionState;
use coop_core::payment::{validate_schedule, ModeOfPayment, Weekday};
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::{format_optional_timestamp, DbId, Timestamp};
use coop_core::validation::schema_error;

use crate::error::DbError;
use crate::models::account::{Account, AccountResponse};
use crate::models::loan_purpose::{LoanPurpose, LoanPurposeResponse};
use crate::models::loan_status::{LoanStatus, LoanStatusResponse};
use crate::models::loan_tag::{LoanTag, LoanTagRequest, LoanTagResponse};
use crate::models::member_profile::{MemberProfile, MemberProfileResponse};
use crate::preload::{belongs_to, has_many, split_path, unknown_relation};
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Dependent, OnDelete, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `loan_transactions` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct LoanTransaction {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub member_profile_id: DbId,
    pub account_id: DbId,
    pub loan_purpose_id: Option<DbId>,
    pub loan_status_id: Option<DbId>,
    pub applied_amount: f64,
    /// Loan term in months.
    pub terms: i64,
    pub interest_rate: f64,
    #[sqlx(try_from = "String")]
    pub mode_of_payment: ModeOfPayment,
    /// Collection day for weekly loans, see [`LoanTransaction::weekly_day`].
    pub mode_of_payment_weekly: Option<String>,
    pub mode_of_payment_semi_monthly_pay_1: Option<i64>,
    pub mode_of_payment_semi_monthly_pay_2: Option<i64>,
    pub remarks: Option<String>,
    #[sqlx(try_from = "String")]
    pub state: LoanTransactionState,
    pub printed_date: Option<Timestamp>,
    pub printed_by_id: Option<DbId>,
    pub approved_date: Option<Timestamp>,
    pub approved_by_id: Option<DbId>,
    pub released_date: Option<Timestamp>,
    pub released_by_id: Option<DbId>,

    #[sqlx(skip)]
    pub member_profile: Option<Box<MemberProfile>>,
    #[sqlx(skip)]
    pub account: Option<Box<Account>>,
    #[sqlx(skip)]
    pub loan_purpose: Option<Box<LoanPurpose>>,
    #[sqlx(skip)]
    pub loan_status: Option<Box<LoanStatus>>,
    #[sqlx(skip)]
    pub loan_tags: Vec<LoanTag>,
}

impl LoanTransaction {
    pub fn weekly_day(&self) -> Option<Weekday> {
        self.mode_of_payment_weekly
            .as_deref()
            .and_then(|day| day.parse().ok())
    }

    pub fn installments(&self) -> i64 {
        self.mode_of_payment.installments(self.terms)
    }

    /// Move one step forward and stamp who did it.
    pub fn advance(
        &mut self,
        to: LoanTransactionState,
        actor: DbId,
        at: Timestamp,
    ) -> Result<(), CoreError> {
        self.state = self.state.advance(to)?;
        match to {
            LoanTransactionState::Printed => {
                self.printed_date = Some(at);
                self.printed_by_id = Some(actor);
            }
            LoanTransactionState::Approved => {
                self.approved_date = Some(at);
                self.approved_by_id = Some(actor);
            }
            LoanTransactionState::Released => {
                self.released_date = Some(at);
                self.released_by_id = Some(actor);
            }
            LoanTransactionState::Draft => {}
        }
        Ok(())
    }

    /// Check that the transition stamps agree with the state.
    pub fn check_stamps(&self) -> Result<(), CoreError> {
        let derived = LoanTransactionState::from_timestamps(
            self.printed_date.as_ref(),
            self.approved_date.as_ref(),
            self.released_date.as_ref(),
        )?;
        if derived != self.state {
            return Err(CoreError::Validation(format!(
                "Loan is '{}' but its timestamps describe '{derived}'",
                self.state
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response DTO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanTransactionResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub member_profile_id: DbId,
    pub account_id: DbId,
    pub loan_purpose_id: Option<DbId>,
    pub loan_status_id: Option<DbId>,
    pub applied_amount: f64,
    pub terms: i64,
    pub installments: i64,
    pub interest_rate: f64,
    pub mode_of_payment: ModeOfPayment,
    pub mode_of_payment_weekly: Option<Weekday>,
    pub mode_of_payment_semi_monthly_pay_1: Option<i64>,
    pub mode_of_payment_semi_monthly_pay_2: Option<i64>,
    pub remarks: Option<String>,
    pub state: LoanTransactionState,
    pub printed_date: Option<String>,
    pub printed_by_id: Option<DbId>,
    pub approved_date: Option<String>,
    pub approved_by_id: Option<DbId>,
    pub released_date: Option<String>,
    pub released_by_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_profile: Option<Box<MemberProfileResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Box<AccountResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_purpose: Option<Box<LoanPurposeResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_status: Option<Box<LoanStatusResponse>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub loan_tags: Vec<LoanTagResponse>,
}

impl From<&LoanTransaction> for LoanTransactionResponse {
    fn from(loan: &LoanTransaction) -> Self {
        Self {
            audit: AuditResponse::from(&loan.audit),
            organization_id: loan.organization_id,
            branch_id: loan.branch_id,
            member_profile_id: loan.member_profile_id,
            account_id: loan.account_id,
            loan_purpose_id: loan.loan_purpose_id,
            loan_status_id: loan.loan_status_id,
            applied_amount: loan.applied_amount,
            terms: loan.terms,
            installments: loan.installments(),
            interest_rate: loan.interest_rate,
            mode_of_payment: loan.mode_of_payment,
            mode_of_payment_weekly: loan.weekly_day(),
            mode_of_payment_semi_monthly_pay_1: loan.mode_of_payment_semi_monthly_pay_1,
            mode_of_payment_semi_monthly_pay_2: loan.mode_of_payment_semi_monthly_pay_2,
            remarks: loan.remarks.clone(),
            state: loan.state,
            printed_date: format_optional_timestamp(loan.printed_date.as_ref()),
            printed_by_id: loan.printed_by_id,
            approved_date: format_optional_timestamp(loan.approved_date.as_ref()),
            approved_by_id: loan.approved_by_id,
            released_date: format_optional_timestamp(loan.released_date.as_ref()),
            released_by_id: loan.released_by_id,
            member_profile: loan
                .member_profile
                .as_deref()
                .map(MemberProfileResponse::from)
                .map(Box::new),
            account: loan.account.as_deref().map(AccountResponse::from).map(Box::new),
            loan_purpose: loan
                .loan_purpose
                .as_deref()
                .map(LoanPurposeResponse::from)
                .map(Box::new),
            loan_status: loan
                .loan_status
                .as_deref()
                .map(LoanStatusResponse::from)
                .map(Box::new),
            loan_tags: loan.loan_tags.iter().map(LoanTagResponse::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request DTO
// ---------------------------------------------------------------------------

/// Header fields of a loan plus its tags, saved together.
///
/// `loan_tags` are upserted (by `id` when present) and `loan_tags_deleted`
/// are soft-deleted in the same transaction.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_loan_schedule"))]
pub struct LoanTransactionRequest {
    pub member_profile_id: DbId,
    pub account_id: DbId,
    pub loan_purpose_id: Option<DbId>,
    pub loan_status_id: Option<DbId>,
    #[validate(range(exclusive_min = 0.0))]
    pub applied_amount: f64,
    #[validate(range(min = 1, max = 600))]
    pub terms: i64,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default)]
    pub interest_rate: f64,
    pub mode_of_payment: ModeOfPayment,
    pub mode_of_payment_weekly: Option<Weekday>,
    pub mode_of_payment_semi_monthly_pay_1: Option<i64>,
    pub mode_of_payment_semi_monthly_pay_2: Option<i64>,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub loan_tags: Vec<LoanTagRequest>,
    #[serde(default)]
    pub loan_tags_deleted: Vec<DbId>,
}

fn validate_loan_schedule(request: &LoanTransactionRequest) -> Result<(), ValidationError> {
    schema_error(
        "mode_of_payment",
        validate_schedule(
            request.mode_of_payment,
            request.mode_of_payment_weekly,
            request.mode_of_payment_semi_monthly_pay_1,
            request.mode_of_payment_semi_monthly_pay_2,
        ),
    )
}

impl EntityRequest<LoanTransaction> for LoanTransactionRequest {
    fn to_entity(&self, user: &UserContext) -> LoanTransaction {
        let mut loan = LoanTransaction {
            organization_id: user.organization_id,
            branch_id: user.branch_id,
            state: LoanTransactionState::Draft,
            ..Default::default()
        };
        self.apply_to(&mut loan);
        loan
    }

    /// Header fields only; tags go through the save and the state through
    /// [`LoanTransaction::advance`].
    fn apply_to(&self, loan: &mut LoanTransaction) {
        loan.member_profile_id = self.member_profile_id;
        loan.account_id = self.account_id;
        loan.loan_purpose_id = self.loan_purpose_id;
        loan.loan_status_id = self.loan_status_id;
        loan.applied_amount = self.applied_amount;
        loan.terms = self.terms;
        loan.interest_rate = self.interest_rate;
        loan.mode_of_payment = self.mode_of_payment;
        loan.mode_of_payment_weekly = self.mode_of_payment_weekly.map(String::from);
        loan.mode_of_payment_semi_monthly_pay_1 = self.mode_of_payment_semi_monthly_pay_1;
        loan.mode_of_payment_semi_monthly_pay_2 = self.mode_of_payment_semi_monthly_pay_2;
        loan.remarks = self.remarks.clone();
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[async_trait]
impl Record for LoanTransaction {
    const TABLE: &'static str = "loan_transactions";
    const KIND: &'static str = "loan_transaction";
    const COMPARES_STORED: bool = true;
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "branch_id",
        "member_profile_id",
        "account_id",
        "loan_purpose_id",
        "loan_status_id",
        "applied_amount",
        "terms",
        "interest_rate",
        "mode_of_payment",
        "mode_of_payment_weekly",
        "mode_of_payment_semi_monthly_pay_1",
        "mode_of_payment_semi_monthly_pay_2",
        "remarks",
        "state",
        "printed_date",
        "printed_by_id",
        "approved_date",
        "approved_by_id",
        "released_date",
        "released_by_id",
    ];

    fn check(&self) -> Result<(), CoreError> {
        self.check_stamps()
    }

    fn check_insert(&self) -> Result<(), CoreError> {
        if self.state != LoanTransactionState::Draft {
            return Err(CoreError::Validation(format!(
                "New loans start as 'draft', not '{}'",
                self.state
            )));
        }
        self.check()
    }

    /// The state may only stay put or take the single step [`advance`]
    /// allows.
    ///
    /// [`advance`]: LoanTransaction::advance
    fn check_update(&self, stored: &Self) -> Result<(), CoreError> {
        if self.state != stored.state {
            stored.state.advance(self.state)?;
        }
        self.check()
    }

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
            ("member_profile_id", self.member_profile_id.into()),
            ("account_id", self.account_id.into()),
            ("loan_purpose_id", self.loan_purpose_id.into()),
            ("loan_status_id", self.loan_status_id.into()),
            ("applied_amount", self.applied_amount.into()),
            ("terms", self.terms.into()),
            ("interest_rate", self.interest_rate.into()),
            ("mode_of_payment", self.mode_of_payment.as_str().into()),
            ("mode_of_payment_weekly", self.mode_of_payment_weekly.clone().into()),
            (
                "mode_of_payment_semi_monthly_pay_1",
                self.mode_of_payment_semi_monthly_pay_1.into(),
            ),
            (
                "mode_of_payment_semi_monthly_pay_2",
                self.mode_of_payment_semi_monthly_pay_2.into(),
            ),
            ("remarks", self.remarks.clone().into()),
            ("state", self.state.as_str().into()),
            ("printed_date", self.printed_date.into()),
            ("printed_by_id", self.printed_by_id.into()),
            ("approved_date", self.approved_date.into()),
            ("approved_by_id", self.approved_by_id.into()),
            ("released_date", self.released_date.into()),
            ("released_by_id", self.released_by_id.into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        tenant_scopes(self.tenant())
    }

    fn dependents() -> Vec<Dependent> {
        vec![Dependent::of::<LoanTag>("loan_transaction_id", OnDelete::Cascade)]
    }

    fn clear_reference(&mut self, column: &str) {
        match column {
            "loan_purpose_id" => self.loan_purpose_id = None,
            "loan_status_id" => self.loan_status_id = None,
            _ => {}
        }
    }

    fn clear_relations(&mut self) {
        self.member_profile = None;
        self.account = None;
        self.loan_purpose = None;
        self.loan_status = None;
        self.loan_tags.clear();
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("member_profile", nested) => {
                belongs_to::<S, Self, MemberProfile>(
                    store,
                    rows,
                    nested,
                    |loan: &Self| Some(loan.member_profile_id),
                    |loan: &mut Self, member| loan.member_profile = member,
                )
                .await
            }
            ("account", nested) => {
                belongs_to::<S, Self, Account>(
                    store,
                    rows,
                    nested,
                    |loan: &Self| Some(loan.account_id),
                    |loan: &mut Self, account| loan.account = account,
                )
                .await
            }
            ("loan_purpose", nested) => {
                belongs_to::<S, Self, LoanPurpose>(
                    store,
                    rows,
                    nested,
                    |loan: &Self| loan.loan_purpose_id,
                    |loan: &mut Self, purpose| loan.loan_purpose = purpose,
                )
                .await
            }
            ("loan_status", nested) => {
                belongs_to::<S, Self, LoanStatus>(
                    store,
                    rows,
                    nested,
                    |loan: &Self| loan.loan_status_id,
                    |loan: &mut Self, status| loan.loan_status = status,
                )
                .await
            }
            ("loan_tags", nested) => {
                has_many::<S, Self, LoanTag>(
                    store,
                    rows,
                    nested,
                    "loan_transaction_id",
                    |tag: &LoanTag| Some(tag.loan_transaction_id),
                    |loan: &mut Self, tags| loan.loan_tags = tags,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl BranchScoped for LoanTransaction {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn advance_stamps_each_step() {
        let actor = DbId::from_u128(7);
        let mut loan = LoanTransaction::default();
        loan.advance(LoanTransactionState::Printed, actor, Utc::now()).unwrap();
        assert_eq!(loan.printed_by_id, Some(actor));
        assert!(loan.approved_date.is_none());
        loan.check_stamps().unwrap();

        loan.advance(LoanTransactionState::Approved, actor, Utc::now()).unwrap();
        loan.advance(LoanTransactionState::Released, actor, Utc::now()).unwrap();
        assert_eq!(loan.state, LoanTransactionState::Released);
        loan.check_stamps().unwrap();
    }

    #[test]
    fn advance_rejects_skips_without_stamping() {
        let mut loan = LoanTransaction::default();
        let err = loan
            .advance(LoanTransactionState::Released, DbId::nil(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(loan.state, LoanTransactionState::Draft);
        assert!(loan.released_date.is_none());
    }

    #[test]
    fn weekly_loans_need_a_collection_day() {
        let request: LoanTransactionRequest = serde_json::from_value(serde_json::json!({
            "member_profile_id": DbId::nil(),
            "account_id": DbId::nil(),
            "applied_amount": 10000.0,
            "terms": 12,
            "mode_of_payment": "weekly"
        }))
        .unwrap();
        assert!(request.validate().is_err());

        let mut fixed = request.clone();
        fixed.mode_of_payment_weekly = Some(Weekday::Friday);
        assert!(fixed.validate().is_ok());
    }

    #[test]
    fn response_reports_installments_and_state() {
        let loan = LoanTransaction {
            terms: 6,
            mode_of_payment: ModeOfPayment::SemiMonthly,
            ..Default::default()
        };
        let json = serde_json::to_value(LoanTransactionResponse::from(&loan)).unwrap();
        assert_eq!(json["installments"], 12);
        assert_eq!(json["state"], "draft");
        assert!(json.get("loan_tags").is_none());
        assert!(json["printed_date"].is_null());
    }
}
