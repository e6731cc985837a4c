//! Text armor for binary containers
//!
//! `snailcrypt1:` followed by unpadded URL-safe base64. The result contains
//! no whitespace and no characters that need quoting in a URL or a POSIX
//! shell.
//!
//! Ciphers produced by the server-locked snailcrypt releases (`1:…`,
//! `2:…`, `3:…`) are recognized so they can be rejected with a precise
//! error instead of "unrecognized input".

use crate::error::{ErrorCategory, ErrorKind, Result, SnailcryptError};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

/// Magic prefix for all armored snailcrypt versions
const MAGIC_PREFIX: &str = "snailcrypt";

/// Version 1 magic marker
const V1_MAGIC: &str = "snailcrypt1:";

/// Armor version produced by [`wrap`].
pub const ARMOR_VERSION: u8 = 1;

/// Highest version number used by the server-locked cipher strings.
const LEGACY_MAX_VERSION: u8 = 3;

/// Armor a container.
pub fn wrap(body: &[u8]) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(body);
    format!("{}{}", V1_MAGIC, encoded)
}

/// Strip the armor, failing for anything [`detect_version`] rejects.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    detect_version(armored)?;

    let encoded = armored.strip_prefix(V1_MAGIC).ok_or_else(|| {
        SnailcryptError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "version detection accepted input without the v1 marker",
        )
    })?;

    URL_SAFE_NO_PAD.decode(encoded).map_err(|e| {
        SnailcryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedContainer,
            format!("base64 decoding failed: {}", e),
            e,
        )
    })
}

/// Classify armored text without decoding its body.
///
/// Returns the armor version for text this crate can unwrap; fails with
/// `UnsupportedVersion` for future or legacy snailcrypt text and with
/// `MalformedContainer` for anything else.
pub fn detect_version(armored: &str) -> Result<u8> {
    if armored.len() < V1_MAGIC.len() {
        return Err(SnailcryptError::malformed(
            "input size smaller than magic marker; likely truncated",
        ));
    }

    if armored.starts_with(V1_MAGIC) {
        return Ok(ARMOR_VERSION);
    }

    if armored.starts_with(MAGIC_PREFIX) {
        return Err(SnailcryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::UnsupportedVersion,
            "input claims to be snailcrypt, but not a version we support",
        ));
    }

    if let Some(version) = legacy_version(armored) {
        return Err(SnailcryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::UnsupportedVersion,
            format!(
                "input is a server-locked snailcrypt v{} cipher, which cannot be decoded offline",
                version
            ),
        ));
    }

    Err(SnailcryptError::malformed(
        "input unrecognized as snailcrypt data",
    ))
}

/// Version number of a legacy `N:lockdate:cipher[:hint[:filename]]` string.
fn legacy_version(text: &str) -> Option<u8> {
    let mut components = text.split(':');
    let version: u8 = components.next()?.parse().ok()?;
    if !(1..=LEGACY_MAX_VERSION).contains(&version) {
        return None;
    }
    // Every legacy layout carries at least a lockdate and a cipher.
    let rest: Vec<&str> = components.collect();
    if rest.len() < 2 || rest.iter().any(|c| c.is_empty()) {
        return None;
    }
    Some(version)
}
