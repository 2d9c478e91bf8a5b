//! Visitor location as reported by the geolocation signal.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing a [`CountryCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CountryCodeError {
    /// Not exactly two characters.
    #[error("country code must be two letters, got {0:?}")]
    InvalidLength(String),
    /// Contains something other than ASCII letters.
    #[error("country code must be ASCII letters, got {0:?}")]
    InvalidCharacters(String),
}

/// An ISO 3166-1 alpha-2 country code, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    /// Nigeria.
    pub const NIGERIA: &'static str = "NG";
    /// Ghana.
    pub const GHANA: &'static str = "GH";

    /// Parse a country code, normalizing to upper case.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not two ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CountryCodeError> {
        let s = s.trim();
        if s.chars().count() != 2 {
            return Err(CountryCodeError::InvalidLength(s.to_owned()));
        }
        if !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CountryCodeError::InvalidCharacters(s.to_owned()));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CountryCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CountryCode {
    type Err = CountryCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Where the visitor appears to be browsing from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInfo {
    /// Two-letter country code used for price selection.
    pub country_code: CountryCode,
    /// City name, when the provider knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Country display name, when the provider knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl LocationInfo {
    /// A location known only by its country code (e.g. a manual selection).
    #[must_use]
    pub const fn from_country(country_code: CountryCode) -> Self {
        Self {
            country_code,
            city: None,
            country: None,
        }
    }
}

/// Ticket handed out when a detection request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionTicket(u64);

/// Per-session detection bookkeeping.
///
/// Detection requests may overlap (the visitor hits "retry" while the first
/// lookup is still in flight). Each request takes a ticket from [`begin`];
/// its result is only applied when no request issued *later* has already
/// been applied, so the newest request that resolves wins and a slow, stale
/// response can never overwrite it.
///
/// [`begin`]: DetectionState::begin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionState {
    issued: u64,
    applied: u64,
    location: Option<LocationInfo>,
}

impl DetectionState {
    /// Start a new detection request.
    pub const fn begin(&mut self) -> DetectionTicket {
        self.issued += 1;
        DetectionTicket(self.issued)
    }

    /// Apply the outcome of the request holding `ticket`.
    ///
    /// `None` records a failed detection: the previous location (if any) is
    /// kept, but the ticket still counts as the latest answer. Returns
    /// `false` when the result is stale and was ignored.
    pub fn complete(&mut self, ticket: DetectionTicket, outcome: Option<LocationInfo>) -> bool {
        if ticket.0 <= self.applied {
            return false;
        }
        self.applied = ticket.0;
        if let Some(location) = outcome {
            self.location = Some(location);
        }
        true
    }

    /// Set the location from a manual choice. Manual choices supersede any
    /// detection that is still in flight.
    pub fn set_manual(&mut self, location: LocationInfo) {
        self.issued += 1;
        self.applied = self.issued;
        self.location = Some(location);
    }

    /// The location currently used for pricing.
    #[must_use]
    pub const fn location(&self) -> Option<&LocationInfo> {
        self.location.as_ref()
    }

    /// Whether any detection request has started.
    #[must_use]
    pub const fn has_attempted(&self) -> bool {
        self.issued > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn loc(code: &str) -> LocationInfo {
        LocationInfo::from_country(CountryCode::parse(code).unwrap())
    }

    #[test]
    fn test_country_code_normalizes() {
        assert_eq!(CountryCode::parse(" ng ").unwrap().as_str(), "NG");
        assert!(matches!(
            CountryCode::parse("NGA"),
            Err(CountryCodeError::InvalidLength(_))
        ));
        assert!(matches!(
            CountryCode::parse("N1"),
            Err(CountryCodeError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn test_location_deserializes_with_optional_fields() {
        let info: LocationInfo = serde_json::from_str(r#"{"country_code":"gh"}"#).unwrap();
        assert_eq!(info.country_code.as_str(), "GH");
        assert!(info.city.is_none());
        assert!(serde_json::from_str::<LocationInfo>(r#"{"country_code":"Ghana"}"#).is_err());
    }

    #[test]
    fn test_detection_in_order() {
        let mut state = DetectionState::default();
        let first = state.begin();
        assert!(state.complete(first, Some(loc("NG"))));
        assert_eq!(state.location(), Some(&loc("NG")));
    }

    #[test]
    fn test_stale_detection_is_ignored() {
        let mut state = DetectionState::default();
        let first = state.begin();
        let second = state.begin();

        assert!(state.complete(second, Some(loc("GH"))));
        assert!(!state.complete(first, Some(loc("NG"))));
        assert_eq!(state.location(), Some(&loc("GH")));
    }

    #[test]
    fn test_older_request_applies_when_newer_still_pending() {
        let mut state = DetectionState::default();
        let first = state.begin();
        let second = state.begin();

        assert!(state.complete(first, Some(loc("NG"))));
        assert!(state.complete(second, Some(loc("GH"))));
        assert_eq!(state.location(), Some(&loc("GH")));
    }

    #[test]
    fn test_failed_detection_keeps_previous_location() {
        let mut state = DetectionState::default();
        let first = state.begin();
        state.complete(first, Some(loc("NG")));

        let retry = state.begin();
        assert!(state.complete(retry, None));
        assert_eq!(state.location(), Some(&loc("NG")));
    }

    #[test]
    fn test_manual_choice_supersedes_in_flight_detection() {
        let mut state = DetectionState::default();
        let pending = state.begin();
        state.set_manual(loc("GH"));

        assert!(!state.complete(pending, Some(loc("NG"))));
        assert_eq!(state.location(), Some(&loc("GH")));
    }
}
