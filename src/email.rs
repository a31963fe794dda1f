use std::{fmt, str::FromStr};

use compact_str::CompactString;
use serde::Serialize;

use crate::result::GhprobeError;

/// Syntactically validated email address.
///
/// Validation is intentionally shallow: the address must contain an `@` and
/// the segment after the first `@` must contain a `.`. Anything stricter
/// belongs to the mail system, not to us.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct EmailAddress {
    value: CompactString,
}

impl EmailAddress {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl FromStr for EmailAddress {
    type Err = GhprobeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut segments = trimmed.split('@');
        let _local = segments.next();
        let domain_ok = segments.next().is_some_and(|domain| domain.contains('.'));

        if trimmed.is_empty() || !domain_ok {
            return Err(GhprobeError::InvalidEmail { input: s.into() });
        }

        Ok(Self { value: trimmed.into() })
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        let email: EmailAddress = "alice@example.com".parse().unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let email: EmailAddress = "  bob@nowhere.test \n".parse().unwrap();
        assert_eq!(email.as_str(), "bob@nowhere.test");
    }

    #[test]
    fn rejects_missing_at_sign() {
        assert!("not-an-email".parse::<EmailAddress>().is_err());
    }

    #[test]
    fn rejects_domain_without_dot() {
        assert!("alice@localhost".parse::<EmailAddress>().is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!("".parse::<EmailAddress>().is_err());
        assert!("   ".parse::<EmailAddress>().is_err());
    }

    #[test]
    fn validates_only_the_first_domain_segment() {
        // The segment between the first and second `@` is what counts.
        assert!("a@b@c.d".parse::<EmailAddress>().is_err());
        assert!("a@b.c@d".parse::<EmailAddress>().is_ok());
    }
}
