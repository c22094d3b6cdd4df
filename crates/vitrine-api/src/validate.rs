use crate::error::{ApiError, FieldErrors};

/// Accumulates per-field validation failures; empty means the input passed.
#[derive(Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_default().push(message.into());
    }

    pub fn require(&mut self, field: &'static str, ok: bool, message: &str) {
        if !ok {
            self.push(field, message);
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// Minimal well-formedness check: one `@`, non-empty local part, and a dot
/// somewhere in the domain. Anything stricter belongs in a mail round-trip.
pub fn email_is_well_formed(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.len() >= 3
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Price must parse, be finite, and be non-negative.
pub fn parse_price(raw: &str) -> Option<f64> {
    let price: f64 = raw.trim().parse().ok()?;
    (price.is_finite() && price >= 0.0).then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(email_is_well_formed("a@x.com"));
        assert!(email_is_well_formed("first.last@sub.example.org"));
        assert!(!email_is_well_formed("nope"));
        assert!(!email_is_well_formed("@x.com"));
        assert!(!email_is_well_formed("a@xcom"));
        assert!(!email_is_well_formed("a b@x.com"));
        assert!(!email_is_well_formed("a@.com"));
    }

    #[test]
    fn price_bounds() {
        assert_eq!(parse_price("10"), Some(10.0));
        assert_eq!(parse_price(" 0.99 "), Some(0.99));
        assert_eq!(parse_price("0"), Some(0.0));
        assert_eq!(parse_price("-1"), None);
        assert_eq!(parse_price("NaN"), None);
        assert_eq!(parse_price("inf"), None);
        assert_eq!(parse_price("ten"), None);
    }

    #[test]
    fn validator_collects_all_failures() {
        let mut v = Validator::new();
        v.require("name", false, "The name field is required");
        v.require("price", true, "unused");
        v.push("name", "Second failure");

        let Err(ApiError::Validation(errors)) = v.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(errors["name"].len(), 2);
        assert!(!errors.contains_key("price"));
    }
}
