// crates/evoseal-core/src/time.rs
// ============================================================================
// Module: EVOSEAL Timestamps
// Description: Canonical timestamp type used across all EVOSEAL crates.
// Purpose: Provide one RFC3339-backed time type instead of ad hoc SystemTime.
// Dependencies: time
// ============================================================================

//! ## Overview
//! A single canonical [`Timestamp`] type is used everywhere a point in time
//! is recorded (version creation, checkpoint creation, event emission,
//! rollback records). Wire form is always RFC 3339 with a UTC offset.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// A point in time, serialized on the wire as RFC 3339.
///
/// # Invariants
/// - Always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(OffsetDateTime);

/// Error returned when a timestamp cannot be parsed or constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp: {0}")]
pub struct TimestampError(String);

impl Timestamp {
    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parses an RFC 3339 string into a [`Timestamp`].
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] when `raw` is not valid RFC 3339.
    pub fn parse(raw: &str) -> Result<Self, TimestampError> {
        OffsetDateTime::parse(raw, &Rfc3339)
            .map(Self)
            .map_err(|err| TimestampError(err.to_string()))
    }

    /// Returns the number of whole seconds since a reference instant.
    ///
    /// Used for duration arithmetic (checkpoint retention windows,
    /// timeouts) without exposing the underlying `time` crate type.
    #[must_use]
    pub fn seconds_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).whole_seconds()
    }

    /// Returns the RFC 3339 wire-form string.
    ///
    /// # Panics
    ///
    /// Never panics: [`Timestamp`] values are always constructed from valid
    /// `OffsetDateTime`s, so formatting cannot fail.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        self.0.format(&Rfc3339).unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
