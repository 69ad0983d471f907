//! Mode-of-payment header fields on loan transactions.

use crate::error::CoreError;

define_text_enum! {
    /// How often a loan is amortized.
    ModeOfPayment {
        Daily = "daily",
        Weekly = "weekly",
        SemiMonthly = "semi-monthly",
        Monthly = "monthly",
        Quarterly = "quarterly",
        SemiAnnual = "semi-annual",
        Lumpsum = "lumpsum",
    }
}

define_text_enum! {
    /// Collection day for weekly amortization.
    Weekday {
        Sunday = "sunday",
        Monday = "monday",
        Tuesday = "tuesday",
        Wednesday = "wednesday",
        Thursday = "thursday",
        Friday = "friday",
        Saturday = "saturday",
    }
}

impl Default for ModeOfPayment {
    fn default() -> Self {
        ModeOfPayment::Monthly
    }
}

impl ModeOfPayment {
    /// Installments per year, `None` for a single lump-sum payment.
    pub fn payments_per_year(self) -> Option<i64> {
        match self {
            ModeOfPayment::Daily => Some(365),
            ModeOfPayment::Weekly => Some(52),
            ModeOfPayment::SemiMonthly => Some(24),
            ModeOfPayment::Monthly => Some(12),
            ModeOfPayment::Quarterly => Some(4),
            ModeOfPayment::SemiAnnual => Some(2),
            ModeOfPayment::Lumpsum => None,
        }
    }

    /// Number of installments over a term of `terms` months, rounded up.
    pub fn installments(self, terms: i64) -> i64 {
        match self.payments_per_year() {
            Some(per_year) => (terms * per_year + 11) / 12,
            None => 1,
        }
    }
}

/// Validate the schedule fields that belong to the chosen mode.
///
/// Weekly loans need a collection day; semi-monthly loans need two distinct
/// days of the month in `1..=31`.
pub fn validate_schedule(
    mode: ModeOfPayment,
    weekly_day: Option<Weekday>,
    semi_monthly_pay_1: Option<i64>,
    semi_monthly_pay_2: Option<i64>,
) -> Result<(), CoreError> {
    match mode {
        ModeOfPayment::Weekly if weekly_day.is_none() => Err(CoreError::Validation(
            "Weekly mode of payment requires a collection day".to_string(),
        )),
        ModeOfPayment::SemiMonthly => match (semi_monthly_pay_1, semi_monthly_pay_2) {
            (Some(a), Some(b)) if (1..=31).contains(&a) && (1..=31).contains(&b) && a != b => {
                Ok(())
            }
            _ => Err(CoreError::Validation(
                "Semi-monthly mode of payment requires two distinct days between 1 and 31"
                    .to_string(),
            )),
        },
        _ => Ok(()),
    }
}
