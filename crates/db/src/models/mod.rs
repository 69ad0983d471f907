//! Entity rows, response DTOs and request DTOs.
//!
//! Each module follows the same layout: the row struct (`FromRow`), its
//! response projection, its validated request, and the [`Record`] impl
//! that wires table metadata, topic scopes, delete policies and preloads.
//!
//! [`Record`]: crate::record::Record

pub mod account;
pub mod branch;
pub mod browse_reference;
pub mod charges_rate_by_range_or_minimum_amount;
pub mod charges_rate_scheme;
pub mod interest_rate_by_amount;
pub mod loan_purpose;
pub mod loan_status;
pub mod loan_tag;
pub mod loan_transaction;
pub mod member_profile;
pub mod member_type;
pub mod mutual_fund;
pub mod mutual_fund_entry;
pub mod organization;
pub mod organization_daily_usage;
