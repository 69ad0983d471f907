//! Pure domain logic shared by the persistence and event layers.
//!
//! Nothing in this crate touches the database: it holds the id/timestamp
//! types, tenant context, the filter vocabulary understood by every store,
//! topic derivation, and the small business rules (loan state machine,
//! amount brackets, payment schedules) the entity registries build on.

#[macro_use]
mod text_enum;

pub mod account;
pub mod charges;
pub mod error;
pub mod filter;
pub mod interest;
pub mod loan_state;
pub mod member;
pub mod mutual_fund;
pub mod payment;
pub mod ranges;
pub mod tenant;
pub mod topics;
pub mod types;
pub mod validation;
