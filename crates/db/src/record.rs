//! The contract between an entity type and the generic registry.
//!
//! An entity row embeds an [`Audit`] block and describes itself through
//! [`Record`]: which table it lives in, which columns it writes, which scope
//! axes its change topics carry, which rows depend on it, and how its
//! relations are preloaded.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::FromRow;

use coop_core::error::CoreError;
use coop_core::filter::Value;
use coop_core::tenant::TenantScope;
use coop_core::topics::{SCOPE_BRANCH, SCOPE_ORGANIZATION};
use coop_core::types::{format_optional_timestamp, format_timestamp, DbId, Timestamp};

use crate::error::DbError;
use crate::store::Store;

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// Columns every table carries, in select order.
pub const AUDIT_COLUMNS: &[&str] = &[
    "id",
    "created_at",
    "created_by_id",
    "updated_at",
    "updated_by_id",
    "deleted_at",
    "deleted_by_id",
];

/// Identity, audit trail and soft-delete marker shared by every entity.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct Audit {
    pub id: DbId,
    pub created_at: Timestamp,
    pub created_by_id: Option<DbId>,
    pub updated_at: Timestamp,
    pub updated_by_id: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
    pub deleted_by_id: Option<DbId>,
}

impl Audit {
    /// Column values in [`AUDIT_COLUMNS`] order.
    pub fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("created_at", self.created_at.into()),
            ("created_by_id", self.created_by_id.into()),
            ("updated_at", self.updated_at.into()),
            ("updated_by_id", self.updated_by_id.into()),
            ("deleted_at", self.deleted_at.into()),
            ("deleted_by_id", self.deleted_by_id.into()),
        ]
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Stamp a new row. Keeps a caller-chosen id, generates one otherwise.
    pub fn stamp_created(&mut self, actor: DbId, at: Timestamp) {
        if self.id.is_nil() {
            self.id = coop_core::types::new_id();
        }
        self.created_at = at;
        self.created_by_id = Some(actor);
        self.updated_at = at;
        self.updated_by_id = Some(actor);
        self.deleted_at = None;
        self.deleted_by_id = None;
    }

    pub fn stamp_updated(&mut self, actor: DbId, at: Timestamp) {
        self.updated_at = at;
        self.updated_by_id = Some(actor);
    }

    pub fn stamp_deleted(&mut self, actor: Option<DbId>, at: Timestamp) {
        self.deleted_at = Some(at);
        self.deleted_by_id = actor;
    }
}

/// Wire form of [`Audit`], flattened into every response DTO.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditResponse {
    pub id: DbId,
    pub created_at: String,
    pub created_by_id: Option<DbId>,
    pub updated_at: String,
    pub updated_by_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by_id: Option<DbId>,
}

impl From<&Audit> for AuditResponse {
    fn from(audit: &Audit) -> Self {
        Self {
            id: audit.id,
            created_at: format_timestamp(&audit.created_at),
            created_by_id: audit.created_by_id,
            updated_at: format_timestamp(&audit.updated_at),
            updated_by_id: audit.updated_by_id,
            deleted_at: format_optional_timestamp(audit.deleted_at.as_ref()),
            deleted_by_id: audit.deleted_by_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// What happens to dependent rows when their parent is soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Dependents are soft-deleted with the parent.
    Cascade,
    /// The parent cannot be deleted while live dependents exist.
    Restrict,
    /// The foreign key on dependents is cleared.
    SetNull,
}

/// A table whose `column` references the parent entity.
#[derive(Debug, Clone, Copy)]
pub struct Dependent {
    pub table: &'static str,
    pub kind: &'static str,
    pub column: &'static str,
    pub on_delete: OnDelete,
    /// Dependents of the dependent, followed on cascade.
    pub dependents: fn() -> Vec<Dependent>,
}

impl Dependent {
    pub fn of<C: Record>(column: &'static str, on_delete: OnDelete) -> Self {
        Self {
            table: C::TABLE,
            kind: C::KIND,
            column,
            on_delete,
            dependents: C::dependents,
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// An entity the generic registry can persist.
#[async_trait]
pub trait Record: for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static {
    /// Table name.
    const TABLE: &'static str;

    /// Entity name used as the topic prefix (`loan_tag`).
    const KIND: &'static str;

    /// Domain and tenant columns written on insert/update, excluding
    /// [`AUDIT_COLUMNS`].
    const COLUMNS: &'static [&'static str];

    /// Scope axis the row's own id defines, for tenant roots such as the
    /// organization.
    const TENANT_ROOT: Option<&'static str> = None;

    /// Whether updates are checked against the stored row through
    /// [`Record::check_update`].
    const COMPARES_STORED: bool = false;

    fn audit(&self) -> &Audit;

    fn audit_mut(&mut self) -> &mut Audit;

    /// Values for [`Self::COLUMNS`], in the same order.
    fn values(&self) -> Vec<(&'static str, Value)>;

    /// Topic scope axes: branch, organization, then owner.
    fn scopes(&self) -> Vec<(&'static str, DbId)>;

    /// Rules every written row must satisfy.
    fn check(&self) -> Result<(), CoreError> {
        Ok(())
    }

    /// Rules for a row about to be inserted.
    fn check_insert(&self) -> Result<(), CoreError> {
        self.check()
    }

    /// Rules for replacing the live `stored` row. Only called when
    /// [`Record::COMPARES_STORED`] is set.
    fn check_update(&self, _stored: &Self) -> Result<(), CoreError> {
        self.check()
    }

    /// Tables referencing this entity and their delete policy.
    fn dependents() -> Vec<Dependent> {
        Vec::new()
    }

    /// Clear a nullable foreign key (the `SET NULL` policy).
    fn clear_reference(&mut self, _column: &str) {}

    /// Drop loaded relations so a stored copy holds only column data.
    fn clear_relations(&mut self) {}

    /// Load the relation named by the first segment of `path` into `rows`,
    /// passing any remaining segments on to the related type.
    async fn preload<S: Store>(_store: &S, _rows: &mut [Self], path: &str) -> Result<(), DbError> {
        Err(DbError::UnknownRelation {
            entity: Self::KIND,
            relation: path.to_string(),
        })
    }

    fn id(&self) -> DbId {
        self.audit().id
    }

    /// Current value of any audit or domain column.
    fn value(&self, column: &str) -> Option<Value> {
        self.audit()
            .values()
            .into_iter()
            .chain(self.values())
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    fn has_column(column: &str) -> bool {
        AUDIT_COLUMNS.contains(&column) || Self::COLUMNS.contains(&column)
    }
}

/// Entities partitioned by organization and branch.
pub trait BranchScoped: Record {
    fn tenant(&self) -> TenantScope;
}

/// Entities partitioned by organization only.
pub trait OrganizationScoped: Record {
    fn organization_id(&self) -> DbId;
}

/// Scope axes for a branch-scoped row.
pub fn tenant_scopes(tenant: TenantScope) -> Vec<(&'static str, DbId)> {
    vec![
        (SCOPE_BRANCH, tenant.branch_id),
        (SCOPE_ORGANIZATION, tenant.organization_id),
    ]
}
