//! Explicit query vocabulary shared by every store.
//!
//! Queries are lists of `(column, operator, value)` predicates joined with
//! `AND`, plus sort specs and an optional limit. There is no
//! query-by-example: an unset field is never an implicit wildcard, so a
//! filter on a zero value is always expressible.
//!
//! The matching functions here implement SQL semantics (comparisons with
//! `NULL` are false, `ILIKE` is case-insensitive) so the in-memory store and
//! PostgreSQL agree on results.

use std::cmp::Ordering;

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A typed, nullable column value.
///
/// The variant carries the SQL type so a `NULL` can still be bound with the
/// right parameter type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uuid(Option<DbId>),
    Text(Option<String>),
    Float(Option<f64>),
    Int(Option<i64>),
    Bool(Option<bool>),
    Timestamp(Option<Timestamp>),
    UuidList(Vec<DbId>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Uuid(v) => v.is_none(),
            Value::Text(v) => v.is_none(),
            Value::Float(v) => v.is_none(),
            Value::Int(v) => v.is_none(),
            Value::Bool(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::UuidList(_) => false,
        }
    }

    /// Order two values of compatible types. `None` when either side is
    /// `NULL` or the types cannot be compared.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Uuid(Some(a)), Value::Uuid(Some(b))) => Some(a.cmp(b)),
            (Value::Text(Some(a)), Value::Text(Some(b))) => Some(a.cmp(b)),
            (Value::Float(Some(a)), Value::Float(Some(b))) => a.partial_cmp(b),
            (Value::Int(Some(a)), Value::Int(Some(b))) => Some(a.cmp(b)),
            (Value::Float(Some(a)), Value::Int(Some(b))) => a.partial_cmp(&(*b as f64)),
            (Value::Int(Some(a)), Value::Float(Some(b))) => (*a as f64).partial_cmp(b),
            (Value::Bool(Some(a)), Value::Bool(Some(b))) => Some(a.cmp(b)),
            (Value::Timestamp(Some(a)), Value::Timestamp(Some(b))) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<DbId> for Value {
    fn from(v: DbId) -> Self {
        Value::Uuid(Some(v))
    }
}

impl From<Option<DbId>> for Value {
    fn from(v: Option<DbId>) -> Self {
        Value::Uuid(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(Some(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        Value::Text(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(Some(v))
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(Some(v))
    }
}

impl From<Option<i64>> for Value {
    fn from(v: Option<i64>) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(Some(v))
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Value::Timestamp(Some(v))
    }
}

impl From<Option<Timestamp>> for Value {
    fn from(v: Option<Timestamp>) -> Self {
        Value::Timestamp(v)
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Comparison operator of a [`FilterSql`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    IsNull,
    NotNull,
    /// Case-insensitive pattern match with `%` and `_` wildcards.
    Like,
    /// Membership in a [`Value::UuidList`].
    In,
}

impl FilterOp {
    /// Whether the operator takes a bound parameter.
    pub fn takes_value(self) -> bool {
        !matches!(self, FilterOp::IsNull | FilterOp::NotNull)
    }
}

/// One `column <op> value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSql {
    pub field: &'static str,
    pub op: FilterOp,
    pub value: Value,
}

impl FilterSql {
    pub fn new(field: &'static str, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn ne(field: &'static str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Ne, value)
    }

    pub fn lt(field: &'static str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lt, value)
    }

    pub fn lte(field: &'static str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }

    pub fn gt(field: &'static str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gt, value)
    }

    pub fn gte(field: &'static str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    pub fn is_null(field: &'static str) -> Self {
        Self::new(field, FilterOp::IsNull, Value::Text(None))
    }

    pub fn not_null(field: &'static str) -> Self {
        Self::new(field, FilterOp::NotNull, Value::Text(None))
    }

    pub fn like(field: &'static str, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Like, Value::Text(Some(pattern.into())))
    }

    pub fn any_of(field: &'static str, ids: Vec<DbId>) -> Self {
        Self::new(field, FilterOp::In, Value::UuidList(ids))
    }

    /// Evaluate the predicate against a row's column value.
    ///
    /// `actual` is `None` when the row has no such column, which never
    /// matches.
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.op {
            FilterOp::IsNull => actual.is_null(),
            FilterOp::NotNull => !actual.is_null(),
            FilterOp::Eq => actual.compare(&self.value) == Some(Ordering::Equal),
            FilterOp::Ne => matches!(
                actual.compare(&self.value),
                Some(Ordering::Less | Ordering::Greater)
            ),
            FilterOp::Lt => actual.compare(&self.value) == Some(Ordering::Less),
            FilterOp::Lte => matches!(
                actual.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt => actual.compare(&self.value) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(
                actual.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Like => match (actual, &self.value) {
                (Value::Text(Some(text)), Value::Text(Some(pattern))) => {
                    like_match(&text.to_lowercase(), &pattern.to_lowercase())
                }
                _ => false,
            },
            FilterOp::In => match (actual, &self.value) {
                (Value::Uuid(Some(id)), Value::UuidList(ids)) => ids.contains(id),
                _ => false,
            },
        }
    }
}

/// SQL `LIKE` matching over chars: `%` matches any run, `_` one char.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: &'static str,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn asc(field: &'static str) -> Self {
        Self {
            field,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: &'static str) -> Self {
        Self {
            field,
            order: SortOrder::Desc,
        }
    }

    /// Order two rows by this sort key with PostgreSQL's default null placement
    /// (`NULLS LAST` ascending, `NULLS FIRST` descending).
    pub fn compare(&self, a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let a_null = a.map_or(true, Value::is_null);
        let b_null = b.map_or(true, Value::is_null);
        let ordering = match (a_null, b_null) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match (a, b) {
                (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            },
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A complete read request: predicates, ordering and an optional limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<FilterSql>,
    pub sorts: Vec<SortSpec>,
    pub limit: Option<i64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(filters: Vec<FilterSql>, sorts: Vec<SortSpec>) -> Self {
        Self {
            filters,
            sorts,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: FilterSql) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn equality_against_null_never_matches() {
        let filter = FilterSql::eq("name", "x");
        assert!(!filter.matches(Some(&Value::Text(None))));
        assert!(!FilterSql::ne("name", "x").matches(Some(&Value::Text(None))));
    }

    #[test]
    fn unknown_column_never_matches() {
        assert!(!FilterSql::is_null("missing").matches(None));
    }

    #[test]
    fn null_checks() {
        assert!(FilterSql::is_null("d").matches(Some(&Value::Timestamp(None))));
        assert!(!FilterSql::not_null("d").matches(Some(&Value::Timestamp(None))));
        assert!(FilterSql::not_null("d").matches(Some(&Value::from(chrono::Utc::now()))));
    }

    #[test]
    fn range_operators_are_inclusive_where_expected() {
        let amount = Value::from(1000.0);
        assert!(FilterSql::lte("from_amount", 1000.0).matches(Some(&amount)));
        assert!(FilterSql::gte("to_amount", 1000.0).matches(Some(&amount)));
        assert!(!FilterSql::lt("from_amount", 1000.0).matches(Some(&amount)));
        assert!(!FilterSql::gt("to_amount", 1000.0).matches(Some(&amount)));
    }

    #[test]
    fn ints_and_floats_compare() {
        assert_eq!(
            Value::Int(Some(3)).compare(&Value::Float(Some(2.5))),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn like_is_case_insensitive_with_wildcards() {
        let name = Value::from("Salary Loan");
        assert!(FilterSql::like("name", "salary%").matches(Some(&name)));
        assert!(FilterSql::like("name", "%LOAN").matches(Some(&name)));
        assert!(FilterSql::like("name", "s_lary loan").matches(Some(&name)));
        assert!(!FilterSql::like("name", "emergency%").matches(Some(&name)));
    }

    #[test]
    fn in_matches_listed_ids_only() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let filter = FilterSql::any_of("id", vec![a]);
        assert!(filter.matches(Some(&Value::from(a))));
        assert!(!filter.matches(Some(&Value::from(b))));
    }

    #[test]
    fn sort_places_nulls_last_ascending_first_descending() {
        let some = Value::from(1_i64);
        let none = Value::Int(None);
        assert_eq!(
            SortSpec::asc("n").compare(Some(&none), Some(&some)),
            Ordering::Greater
        );
        assert_eq!(
            SortSpec::desc("n").compare(Some(&none), Some(&some)),
            Ordering::Less
        );
    }

    #[test]
    fn query_builder_accumulates() {
        let query = Query::new()
            .filter(FilterSql::eq("a", 1_i64))
            .sort(SortSpec::desc("created_at"))
            .limit(5);
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.sorts.len(), 1);
        assert_eq!(query.limit, Some(5));
    }
}
