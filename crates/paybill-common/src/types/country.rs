//! Country scoping for cost rules
//!
//! A rule either names one ISO country or applies to every country that has
//! no rule of its own. On the wire the wildcard is the empty string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Country a cost rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Country {
    /// ISO 3166-1 alpha-2 code, upper-cased
    Specific(String),
    /// Applies to any country not covered by a more specific rule
    #[default]
    Wildcard,
}

impl Country {
    /// Build a specific country; blank input yields the wildcard
    pub fn specific(code: impl AsRef<str>) -> Self {
        let code = code.as_ref().trim();
        if code.is_empty() {
            Country::Wildcard
        } else {
            Country::Specific(code.to_ascii_uppercase())
        }
    }

    /// Interpret an optional request country. `None` and `""` both mean "no country".
    pub fn from_request(code: Option<&str>) -> Self {
        code.map(Self::specific).unwrap_or(Country::Wildcard)
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Country::Wildcard)
    }

    /// ISO code, or `""` for the wildcard
    pub fn code(&self) -> &str {
        match self {
            Country::Specific(code) => code,
            Country::Wildcard => "",
        }
    }
}

impl From<String> for Country {
    fn from(code: String) -> Self {
        Country::specific(code)
    }
}

impl From<&str> for Country {
    fn from(code: &str) -> Self {
        Country::specific(code)
    }
}

impl From<Country> for String {
    fn from(country: Country) -> Self {
        match country {
            Country::Specific(code) => code,
            Country::Wildcard => String::new(),
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Country::Specific(code) => f.write_str(code),
            Country::Wildcard => f.write_str("*"),
        }
    }
}
