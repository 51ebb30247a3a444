//! AWS identity types shared across crates.

use std::fmt;

/// AWS Account ID (12-digit string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Account ID used when no real account is known (local emulators, tests).
    pub const DEFAULT: &str = "000000000000";

    /// Create a new account ID from a string.
    ///
    /// # Errors
    /// Returns an error if the account ID is not a 12-digit numeric string.
    pub fn new(id: impl Into<String>) -> Result<Self, crate::SiteStackError> {
        let id = id.into();
        if id.len() != 12 || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(crate::SiteStackError::InvalidAccountId(id));
        }
        Ok(Self(id))
    }

    /// Get the account ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// AWS Region identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AwsRegion(String);

impl AwsRegion {
    /// Default region.
    pub const DEFAULT: &str = "us-east-1";

    /// Create a new region without validation.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    /// Parse a region identifier such as `eu-west-1` or `us-gov-west-1`.
    ///
    /// A region is two or more lowercase alphabetic segments followed by a
    /// numeric segment, separated by hyphens.
    ///
    /// # Errors
    /// Returns [`SiteStackError::InvalidRegion`](crate::SiteStackError::InvalidRegion)
    /// if the identifier does not have that shape.
    pub fn parse(region: impl Into<String>) -> Result<Self, crate::SiteStackError> {
        let region = region.into();
        let segments: Vec<&str> = region.split('-').collect();
        let valid = segments.len() >= 3
            && segments.iter().all(|s| !s.is_empty())
            && segments[..segments.len() - 1]
                .iter()
                .all(|s| s.bytes().all(|b| b.is_ascii_lowercase()))
            && segments[segments.len() - 1]
                .bytes()
                .all(|b| b.is_ascii_digit());
        if !valid {
            return Err(crate::SiteStackError::InvalidRegion(region));
        }
        Ok(Self(region))
    }

    /// Get the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AwsRegion {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_valid_account_id() {
        let id = AccountId::new("123456789012").unwrap();
        assert_eq!(id.as_str(), "123456789012");
    }

    #[test]
    fn test_should_reject_invalid_account_id() {
        assert!(AccountId::new("12345").is_err());
        assert!(AccountId::new("abcdefghijkl").is_err());
        assert!(AccountId::new("1234567890123").is_err());
    }

    #[test]
    fn test_should_use_default_account_id() {
        assert_eq!(AccountId::default().as_str(), "000000000000");
    }

    #[test]
    fn test_should_parse_valid_regions() {
        for region in ["us-east-1", "eu-west-2", "ap-southeast-1", "us-gov-west-1"] {
            assert_eq!(AwsRegion::parse(region).unwrap().as_str(), region);
        }
    }

    #[test]
    fn test_should_reject_malformed_regions() {
        for region in ["", "us-east", "US-EAST-1", "us--1", "us-east-x", "useast1"] {
            assert!(AwsRegion::parse(region).is_err(), "{region} should be rejected");
        }
    }

    #[test]
    fn test_should_use_default_region() {
        assert_eq!(AwsRegion::default().as_str(), "us-east-1");
    }
}
