define_text_enum! {
    /// How each member's contribution to a mutual fund is computed.
    MutualFundComputationType {
        FixedAmount = "fixed_amount",
        PerMember = "per_member",
    }
}

impl Default for MutualFundComputationType {
    fn default() -> Self {
        MutualFundComputationType::FixedAmount
    }
}

/// Split a fund `amount` across `contributors` when computed per member.
///
/// Returns `None` when there is nobody to split across.
pub fn contribution_per_member(
    computation: MutualFundComputationType,
    amount: f64,
    contributors: usize,
) -> Option<f64> {
    match computation {
        MutualFundComputationType::FixedAmount => Some(amount),
        MutualFundComputationType::PerMember if contributors > 0 => {
            Some(amount / contributors as f64)
        }
        MutualFundComputationType::PerMember => None,
    }
}
