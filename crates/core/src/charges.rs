//! Charges rate scheme classification.

define_text_enum! {
    /// How a charges rate scheme selects the charge for a loan.
    ChargesRateSchemeType {
        ByRange = "by_range",
        ByType = "by_type",
        ByTerm = "by_term",
    }
}

impl Default for ChargesRateSchemeType {
    fn default() -> Self {
        ChargesRateSchemeType::ByRange
    }
}

/// Compute the charge for a bracket: the percentage of `amount` plus the
/// fixed amount, never below `minimum_amount`.
pub fn compute_charge(amount: f64, rate_percent: f64, fixed: f64, minimum_amount: f64) -> f64 {
    let computed = amount * rate_percent / 100.0 + fixed;
    computed.max(minimum_amount)
}
