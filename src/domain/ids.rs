//! Validated identifier newtypes. Region ids, rule/condition codes, and
//! user ids each have distinct shapes; wrapping them catches mix-ups at
//! compile time instead of at a query boundary.

use crate::errors::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 2-5 character uppercase region code, optionally `AA-BB` for subdivisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionId(String);

impl RegionId {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = raw.split('-').collect();
        let valid = match parts.as_slice() {
            [country] => is_region_segment(country),
            [country, subdivision] => is_region_segment(country) && is_region_segment(subdivision),
            _ => false,
        };
        if !valid {
            return Err(CoreError::validation(format!("invalid region id: {raw}")));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_region_segment(segment: &str) -> bool {
    (2..=5).contains(&segment.len()) && segment.chars().all(|c| c.is_ascii_uppercase())
}

impl TryFrom<String> for RegionId {
    type Error = CoreError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegionId> for String {
    fn from(value: RegionId) -> Self {
        value.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Uppercase `[A-Z0-9_-]+` code, ≤128 chars, used for rule and condition ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let valid = !raw.is_empty()
            && raw.len() <= 128
            && raw
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if !valid {
            return Err(CoreError::validation(format!("invalid code: {raw}")));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Code {
    type Error = CoreError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Code> for String {
    fn from(value: Code) -> Self {
        value.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque 64-bit user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_subdivision_region_ids() {
        assert!(RegionId::parse("JE").is_ok());
        assert!(RegionId::parse("GG").is_ok());
        assert!(RegionId::parse("AA-BB").is_ok());
    }

    #[test]
    fn rejects_lowercase_and_bad_length() {
        assert!(RegionId::parse("je").is_err());
        assert!(RegionId::parse("A").is_err());
        assert!(RegionId::parse("TOOLONG").is_err());
        assert!(RegionId::parse("AA-").is_err());
    }

    #[test]
    fn code_accepts_uppercase_alnum_and_separators() {
        assert!(Code::parse("MAINTAINS_ABODE").is_ok());
        assert!(Code::parse("183-DAY").is_ok());
        assert!(Code::parse("lowercase").is_err());
        assert!(Code::parse("").is_err());
    }
}
