define_text_enum! {
    /// Basis a browse reference uses to pick an interest rate.
    InterestType {
        Year = "year",
        Date = "date",
        Amount = "amount",
        Fixed = "fixed",
    }
}

impl Default for InterestType {
    fn default() -> Self {
        InterestType::Fixed
    }
}

impl InterestType {
    /// Whether rates come from an `interest_rate_by_amount` bracket table.
    pub fn uses_amount_brackets(self) -> bool {
        self == InterestType::Amount
    }
}
