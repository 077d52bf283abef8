// crates/evoseal-core/src/hashing.rs
// ============================================================================
// Module: EVOSEAL Hashing
// Description: Canonical hashing for checkpoint payloads and other content.
// Purpose: Define the single content-hash algorithm used for integrity checks.
// Dependencies: sha2, serde_jcs, serde
// ============================================================================

//! ## Overview
//! All content-addressed integrity checks in EVOSEAL (checkpoint payloads,
//! in particular) go through this module so there is exactly one
//! canonicalization rule in the codebase. See `DESIGN.md` for why this
//! particular scheme was chosen over a simpler whole-tree hash.
//!
//! A payload is a map of runpack-relative path to file bytes. The canonical
//! form hashes each file independently, sorts the resulting
//! `(path, digest)` pairs by path, JSON-Canonicalization-Scheme (RFC 8785)
//! encodes that sorted list, and hashes the encoded bytes as a whole. This
//! gives a single "tree hash" that is stable regardless of map iteration
//! order while still letting callers diagnose which single file changed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while computing a canonical content hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    /// The sorted per-file digest list could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalize(String),
}

// ============================================================================
// SECTION: Hex Digest
// ============================================================================

/// A lowercase-hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct HexDigest(String);

impl HexDigest {
    /// Wraps an already-hex-encoded digest read back from storage.
    #[must_use]
    pub const fn from_hex(value: String) -> Self {
        Self(value)
    }

    /// Returns the digest's lowercase-hex wire form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HexDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes raw bytes with SHA-256 and returns the lowercase-hex digest.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> HexDigest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    HexDigest(hex_encode(&hasher.finalize()))
}

/// Encodes raw bytes as lowercase hex without pulling in a hex crate.
fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

// ============================================================================
// SECTION: Payload Tree Hash
// ============================================================================

/// A single file entry in a canonicalized payload tree, used only as the
/// JCS-encoded unit hashed to produce the overall content hash.
#[derive(Serialize)]
struct PathDigestEntry<'a> {
    /// Runpack-relative path.
    path: &'a str,
    /// Lowercase-hex SHA-256 digest of the file's bytes.
    digest: String,
}

/// Computes the canonical content hash of a checkpoint payload.
///
/// `payload` maps each runpack-relative path to its file bytes. The
/// returned digest is stable under any input iteration order.
///
/// # Errors
///
/// Returns [`HashError`] if the intermediate per-file digest list cannot be
/// canonicalized (this can only happen if `path` contains invalid UTF-8
/// surrogate sequences that JCS rejects).
pub fn hash_payload_tree(payload: &BTreeMap<String, Vec<u8>>) -> Result<HexDigest, HashError> {
    let entries: Vec<PathDigestEntry<'_>> = payload
        .iter()
        .map(|(path, bytes)| PathDigestEntry { path, digest: hash_bytes(bytes).as_str().to_string() })
        .collect();
    let canonical =
        serde_jcs::to_string(&entries).map_err(|err| HashError::Canonicalize(err.to_string()))?;
    Ok(hash_bytes(canonical.as_bytes()))
}

/// Computes the per-file digests of a payload tree without combining them,
/// used for `metadata.json`'s diagnostic per-file hash list.
#[must_use]
pub fn per_file_digests(payload: &BTreeMap<String, Vec<u8>>) -> BTreeMap<String, HexDigest> {
    payload.iter().map(|(path, bytes)| (path.clone(), hash_bytes(bytes))).collect()
}
