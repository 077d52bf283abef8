// crates/evoseal-core/src/identifiers.rs
// ============================================================================
// Module: EVOSEAL Identifiers
// Description: Canonical opaque identifiers shared across EVOSEAL components.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, rand
// ============================================================================

//! ## Overview
//! Identifiers are opaque, non-empty strings wrapped in newtypes so that a
//! `VersionId` and a `CheckpointId`, for example, are never interchangeable
//! at compile time even though both are backed by a string on the wire.
//! Construction validates non-emptiness and a conservative length bound;
//! callers cannot forge an identifier from an arbitrary path or URI.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted length, in bytes, for any identifier in this module.
const MAX_ID_LEN: usize = 256;

/// Error returned when a raw string cannot be used as an identifier.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The supplied string was empty.
    #[error("identifier must not be empty")]
    Empty,
    /// The supplied string exceeded [`MAX_ID_LEN`].
    #[error("identifier exceeds {max} bytes", max = MAX_ID_LEN)]
    TooLong,
}

/// Generates a random, URL-safe, lowercase-hex identifier suffix.
///
/// Used by constructors that mint fresh identifiers (new versions, new
/// checkpoints, new subscriptions) rather than parsing one from storage.
#[must_use]
fn random_hex_suffix(bytes: usize) -> String {
    let mut buf = vec![0_u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

/// Defines a newtype identifier wrapping a validated, opaque `String`.
macro_rules! opaque_id {
    ($name:ident, $prefix:literal) => {
        #[doc = concat!("Opaque identifier for a `", stringify!($name), "`.")]
        ///
        /// # Invariants
        /// - Never empty.
        /// - Never longer than the configured maximum length.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Builds an identifier from an already-validated raw string.
            ///
            /// # Errors
            ///
            /// Returns [`IdError`] when `raw` is empty or too long.
            pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
                let raw = raw.into();
                if raw.is_empty() {
                    return Err(IdError::Empty);
                }
                if raw.len() > MAX_ID_LEN {
                    return Err(IdError::TooLong);
                }
                Ok(Self(raw))
            }

            /// Mints a fresh, random identifier with this type's conventional prefix.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!("{}{}", $prefix, random_hex_suffix(16)))
            }

            /// Returns the identifier's wire-form string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(VersionId, "ver_");
opaque_id!(ExperimentId, "exp_");
opaque_id!(CheckpointId, "chk_");
opaque_id!(WorkflowId, "wf_");
opaque_id!(StepId, "step_");
opaque_id!(SubscriptionId, "sub_");
opaque_id!(AdapterId, "adp_");
opaque_id!(ModelVersionId, "mv_");
opaque_id!(VariantId, "var_");
