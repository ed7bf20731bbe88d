// crates/factoid-store-sqlite/src/paths.rs
// ============================================================================
// Module: SQLite Store Paths
// Description: Scope file naming and filesystem path limits.
// Purpose: Map every valid scope id to a portable, collision-free file name.
// Dependencies: factoid-core, sha2
// ============================================================================

//! ## Overview
//! Scope ids become file names through a byte-wise escape:
//! - ASCII lowercase letters, digits, `_` and `-` are kept as-is.
//! - Every other byte, including ASCII uppercase, becomes `%XX`.
//!
//! The output is fixed under ASCII case folding, so two scopes that differ
//! only in case never share a file on case-insensitive filesystems.
//!
//! Escaping can triple a name. When the escaped stem would not fit in one
//! path component, the name becomes a readable escaped prefix, a `~`
//! separator and the SHA-256 of the full scope id. `~` never appears in an
//! unhashed name, so hashed and unhashed names cannot collide.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::path::Path;

use factoid_core::ScopeId;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name suffix of every scope database.
pub const SCOPE_FILE_SUFFIX: &str = ".factoids.sqlite3";
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Longest escaped stem kept verbatim before falling back to a digest.
const MAX_PLAIN_STEM_LENGTH: usize = MAX_PATH_COMPONENT_LENGTH - SCOPE_FILE_SUFFIX.len();
/// Escaped prefix kept in front of the digest of a long scope id.
const HASHED_PREFIX_LENGTH: usize = 96;
/// Separator between the readable prefix and the digest.
const DIGEST_SEPARATOR: char = '~';

// ============================================================================
// SECTION: Path Limits
// ============================================================================

/// Which filesystem length limit a path broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLimitViolation {
    /// The whole path exceeds [`MAX_TOTAL_PATH_LENGTH`].
    TotalLength,
    /// One component exceeds [`MAX_PATH_COMPONENT_LENGTH`].
    ComponentLength,
}

/// Checks a path against total and per-component length limits.
///
/// # Errors
///
/// Returns the first [`PathLimitViolation`] found.
pub fn check_path_limits(path: &Path) -> Result<(), PathLimitViolation> {
    if path.as_os_str().to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(PathLimitViolation::TotalLength);
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(PathLimitViolation::ComponentLength);
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Scope File Names
// ============================================================================

/// Encodes a scope id as a filesystem-safe database file name.
///
/// Distinct scope ids always map to distinct names, and every name fits in a
/// single path component.
#[must_use]
pub fn scope_file_name(scope: &ScopeId) -> String {
    let raw = scope.as_str().as_bytes();
    let escaped = escape_bytes(raw, usize::MAX);
    let mut name = if escaped.len() <= MAX_PLAIN_STEM_LENGTH {
        escaped
    } else {
        let mut stem = escape_bytes(raw, HASHED_PREFIX_LENGTH);
        stem.push(DIGEST_SEPARATOR);
        stem.push_str(&sha256_hex(raw));
        stem
    };
    name.push_str(SCOPE_FILE_SUFFIX);
    name
}

/// Escapes bytes until the next one would push the output past `limit`.
fn escape_bytes(bytes: &[u8], limit: usize) -> String {
    let mut out = String::new();
    for &byte in bytes {
        let kept = byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_' || byte == b'-';
        let width = if kept { 1 } else { 3 };
        if out.len() + width > limit {
            break;
        }
        if kept {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Returns the lowercase hex SHA-256 of `bytes`.
fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
