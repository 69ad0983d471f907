//! Ledger account classification.

define_text_enum! {
    /// What kind of ledger an account posts to.
    AccountType {
        Deposit = "deposit",
        Loan = "loan",
        ArLedger = "ar-ledger",
        ArAging = "ar-aging",
        Fines = "fines",
        Interest = "interest",
        SvfLedger = "svf-ledger",
        TimeDeposit = "time-deposit",
        Other = "other",
    }
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::Other
    }
}

impl AccountType {
    /// Accounts that a loan transaction may be booked against.
    pub fn is_lending(self) -> bool {
        matches!(self, AccountType::Loan | AccountType::ArLedger | AccountType::ArAging)
    }
}
