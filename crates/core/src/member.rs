define_text_enum! {
    /// Membership verification status.
    MemberStatus {
        Pending = "pending",
        Verified = "verified",
        NotAllowed = "not allowed",
    }
}

impl Default for MemberStatus {
    fn default() -> Self {
        MemberStatus::Pending
    }
}

/// Join name parts into the display name stored in `full_name`.
pub fn full_name(first: &str, middle: Option<&str>, last: &str, suffix: Option<&str>) -> String {
    [Some(first), middle, Some(last), suffix]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
