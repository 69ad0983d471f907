//! Bridges between domain rule checks and `validator` derive rules.

use std::borrow::Cow;

use validator::{Validate, ValidationError};

use crate::error::CoreError;

/// Run the declarative rules of a request DTO.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), CoreError> {
    request.validate().map_err(CoreError::from)
}

/// Turn a domain rule failure into a schema-level `ValidationError` so it can
/// be returned from a `#[validate(schema(function = ...))]` hook.
pub fn schema_error(code: &'static str, result: Result<(), CoreError>) -> Result<(), ValidationError> {
    result.map_err(|err| {
        let message = match err {
            CoreError::Validation(msg) => msg,
            other => other.to_string(),
        };
        ValidationError::new(code).with_message(Cow::Owned(message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_keeps_the_domain_message() {
        let err = schema_error(
            "amount_range",
            Err(CoreError::Validation("to below from".into())),
        )
        .unwrap_err();
        assert_eq!(err.code, "amount_range");
        assert_eq!(err.message.as_deref(), Some("to below from"));
    }

    #[test]
    fn passing_rules_pass_through() {
        assert!(schema_error("x", Ok(())).is_ok());
    }
}
