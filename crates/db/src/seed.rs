//! Default rows created for every new branch.
//!
//! Seeds run inside a caller-owned transaction. The first failing row aborts
//! the batch with [`DbError::Seed`] naming that row; the caller drops the
//! transaction so nothing from the batch persists.

use serde::Serialize;

use coop_core::tenant::UserContext;

use crate::error::DbError;
use crate::models::loan_purpose::LoanPurpose;
use crate::models::loan_status::LoanStatus;
use crate::models::member_type::MemberType;
use crate::record::Record;
use crate::registry::{EntityRequest, Registry};
use crate::repositories::{loan_purpose_registry, loan_status_registry, member_type_registry};
use crate::store::Store;

/// Create `rows` in order inside `tx`, naming the first row that fails.
pub async fn seed_rows<T, R, Q, S>(
    registry: &Registry<T, R, Q, S>,
    tx: &mut S::Tx,
    user: &UserContext,
    rows: Vec<T>,
    describe: fn(&T) -> String,
) -> Result<Vec<T>, DbError>
where
    T: Record,
    R: Serialize,
    Q: EntityRequest<T>,
    S: Store,
{
    let mut created = Vec::with_capacity(rows.len());
    for row in rows {
        let item = format!("{} '{}'", T::KIND, describe(&row));
        let row = registry
            .create_with_tx(tx, user.user_id, row)
            .await
            .map_err(|source| DbError::Seed {
                item,
                source: Box::new(source),
            })?;
        created.push(row);
    }
    tracing::debug!(entity = T::KIND, rows = created.len(), "Seeded rows");
    Ok(created)
}

pub fn member_type_seed(user: &UserContext) -> Vec<MemberType> {
    [
        ("NEW", "New", "Newly registered member pending orientation"),
        ("REG", "Regular", "Member with full voting rights"),
        ("ASC", "Associate", "Member without voting rights"),
        ("CLS", "Closed", "Member whose account has been closed"),
    ]
    .into_iter()
    .map(|(prefix, name, description)| MemberType::new(user.tenant(), prefix, name, Some(description)))
    .collect()
}

pub fn loan_purpose_seed(user: &UserContext) -> Vec<LoanPurpose> {
    [
        ("Business capital", "briefcase"),
        ("Education", "book"),
        ("Housing", "home"),
        ("Medical", "heart"),
        ("Agriculture", "leaf"),
        ("Emergency", "alert"),
    ]
    .into_iter()
    .map(|(description, icon)| LoanPurpose::new(user.tenant(), description, Some(icon)))
    .collect()
}

pub fn loan_status_seed(user: &UserContext) -> Vec<LoanStatus> {
    [
        ("Current", "#22c55e", "Payments are up to date"),
        ("Past due", "#f59e0b", "At least one installment is late"),
        ("Restructured", "#3b82f6", "Terms were renegotiated"),
        ("Written off", "#ef4444", "Balance deemed uncollectible"),
    ]
    .into_iter()
    .map(|(name, color, description)| LoanStatus::new(user.tenant(), name, Some(color), Some(description)))
    .collect()
}

/// Seed every lookup table of a new branch inside `tx`.
pub async fn seed_branch_defaults<S: Store>(store: &S, tx: &mut S::Tx, user: &UserContext) -> Result<(), DbError> {
    seed_rows(
        &member_type_registry(store.clone()),
        tx,
        user,
        member_type_seed(user),
        |row| row.name.clone(),
    )
    .await?;
    seed_rows(
        &loan_purpose_registry(store.clone()),
        tx,
        user,
        loan_purpose_seed(user),
        |row| row.description.clone(),
    )
    .await?;
    seed_rows(
        &loan_status_registry(store.clone()),
        tx,
        user,
        loan_status_seed(user),
        |row| row.name.clone(),
    )
    .await?;
    tracing::info!(
        organization_id = %user.organization_id,
        branch_id = %user.branch_id,
        "Seeded branch defaults"
    );
    Ok(())
}
