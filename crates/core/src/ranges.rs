//! Amount brackets (`from_amount ..= to_amount`) used by interest-rate and
//! charge tables.

use crate::error::CoreError;

/// Validate a single bracket: both bounds non-negative and `to >= from`.
pub fn validate_amount_range(from: f64, to: f64, name: &str) -> Result<(), CoreError> {
    if !from.is_finite() || !to.is_finite() || from < 0.0 {
        return Err(CoreError::Validation(format!(
            "{name} bounds must be finite and non-negative, got {from}..{to}"
        )));
    }
    if to < from {
        return Err(CoreError::Validation(format!(
            "{name} upper bound {to} must not be below lower bound {from}"
        )));
    }
    Ok(())
}

/// Whether `amount` falls inside the inclusive bracket.
pub fn bracket_contains(from: f64, to: f64, amount: f64) -> bool {
    from <= amount && amount <= to
}

/// Find the first pair of brackets that overlap, by index.
///
/// Touching brackets (`..=999` and `999..`) count as overlapping because a
/// lookup for the shared bound would be ambiguous.
pub fn find_overlap(brackets: &[(f64, f64)]) -> Option<(usize, usize)> {
    for (i, a) in brackets.iter().enumerate() {
        for (j, b) in brackets.iter().enumerate().skip(i + 1) {
            if a.0 <= b.1 && b.0 <= a.1 {
                return Some((i, j));
            }
        }
    }
    None
}

/// Pick the bracket containing `amount`, preferring the lowest lower bound.
pub fn select_bracket<T>(items: &[T], amount: f64, bounds: impl Fn(&T) -> (f64, f64)) -> Option<&T> {
    items
        .iter()
        .filter(|item| {
            let (from, to) = bounds(item);
            bracket_contains(from, to, amount)
        })
        .min_by(|a, b| {
            bounds(a)
                .0
                .partial_cmp(&bounds(b).0)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: [(f64, f64, f64); 2] = [(0.0, 999.0, 1.0), (1000.0, 4999.0, 2.0)];

    fn rate_for(amount: f64) -> Option<f64> {
        select_bracket(&TABLE, amount, |row| (row.0, row.1)).map(|row| row.2)
    }

    #[test]
    fn picks_the_containing_bracket() {
        assert_eq!(rate_for(500.0), Some(1.0));
        assert_eq!(rate_for(4999.0), Some(2.0));
    }

    #[test]
    fn lower_bound_is_inclusive() {
        assert_eq!(rate_for(1000.0), Some(2.0));
        assert_eq!(rate_for(0.0), Some(1.0));
    }

    #[test]
    fn amounts_outside_every_bracket_have_no_rate() {
        assert_eq!(rate_for(5000.0), None);
        assert_eq!(rate_for(999.5), None);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(validate_amount_range(10.0, 5.0, "rate").is_err());
        assert!(validate_amount_range(-1.0, 5.0, "rate").is_err());
        assert!(validate_amount_range(5.0, 5.0, "rate").is_ok());
    }

    #[test]
    fn detects_overlapping_brackets() {
        assert_eq!(find_overlap(&[(0.0, 999.0), (1000.0, 4999.0)]), None);
        assert_eq!(find_overlap(&[(0.0, 1000.0), (1000.0, 4999.0)]), Some((0, 1)));
        assert_eq!(
            find_overlap(&[(0.0, 10.0), (20.0, 30.0), (25.0, 40.0)]),
            Some((1, 2))
        );
    }
}
