//! Key derivation and authenticated encryption primitives
//!
//! This module holds the cryptographic collaborators of the container codec:
//! - scrypt for key derivation from a passphrase and a per-container salt
//! - the [`AeadCipher`] seam, with NaCl secretbox (XSalsa20Poly1305) as the
//!   default implementation
//! - OS randomness for salts and nonces
//!
//! The codec never touches cipher internals; it only calls `seal`/`open`.

use crate::error::{ErrorCategory, ErrorKind, Result, SnailcryptError};
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Nonce, XSalsa20Poly1305};
use rand::RngCore;
use rand::rngs::OsRng;
use scrypt::{Params, scrypt};
use std::fmt;
use std::mem::size_of;
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Length of the Poly1305 authentication tag
pub const TAG_LEN: usize = 16;

/// Upper bound for scrypt log2(N)
const MAX_LOG_N: u8 = 20;

/// Upper bound for scrypt r
const MAX_R: u32 = 32;

/// Upper bound for scrypt p
const MAX_P: u32 = 16;

/// Upper bound for scrypt working memory (128 * r * N bytes).
///
/// Containers carry their own work factors, so a tampered header must not
/// be able to make the decoder allocate without limit.
const MAX_KDF_MEMORY: u64 = 256 * 1024 * 1024;

/// scrypt work factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    log_n: u8,
    r: u32,
    p: u32,
}

impl KdfParams {
    /// Default scrypt log2(N) (N = 32768)
    pub const DEFAULT_LOG_N: u8 = 15;

    /// Default scrypt r (block size)
    pub const DEFAULT_R: u32 = 8;

    /// Default scrypt p (parallelization)
    pub const DEFAULT_P: u32 = 1;

    /// Validated work factors; out-of-range values are `InvalidInput`.
    pub fn new(log_n: u8, r: u32, p: u32) -> Result<Self> {
        Self::checked(log_n, r, p).map_err(SnailcryptError::invalid_input)
    }

    /// Work factors read back from a container header; out-of-range values
    /// are `MalformedContainer`.
    pub(crate) fn from_header(log_n: u8, r: u32, p: u32) -> Result<Self> {
        Self::checked(log_n, r, p).map_err(SnailcryptError::malformed)
    }

    fn checked(log_n: u8, r: u32, p: u32) -> std::result::Result<Self, String> {
        if log_n == 0 || log_n > MAX_LOG_N {
            return Err(format!("scrypt log2(N) must be in 1..={}, got {}", MAX_LOG_N, log_n));
        }
        if r == 0 || r > MAX_R {
            return Err(format!("scrypt r must be in 1..={}, got {}", MAX_R, r));
        }
        if p == 0 || p > MAX_P {
            return Err(format!("scrypt p must be in 1..={}, got {}", MAX_P, p));
        }
        let memory = 128u64 * u64::from(r) * (1u64 << log_n);
        if memory > MAX_KDF_MEMORY {
            return Err(format!(
                "scrypt parameters need {} bytes of memory, limit is {}",
                memory, MAX_KDF_MEMORY
            ));
        }
        Params::new(log_n, r, p, KEY_LEN)
            .map_err(|e| format!("scrypt rejected parameters: {}", e))?;
        Ok(Self { log_n, r, p })
    }

    pub fn log_n(&self) -> u8 {
        self.log_n
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    pub fn p(&self) -> u32 {
        self.p
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            log_n: Self::DEFAULT_LOG_N,
            r: Self::DEFAULT_R,
            p: Self::DEFAULT_P,
        }
    }
}

/// A symmetric key derived from a passphrase. Wiped from memory on drop.
pub struct DerivedKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive a 32-byte key from a passphrase and salt using scrypt
pub fn derive_key(passphrase: &[u8], salt: &[u8; SALT_LEN], params: &KdfParams) -> Result<DerivedKey> {
    let scrypt_params = Params::new(params.log_n, params.r, params.p, KEY_LEN).map_err(|e| {
        SnailcryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::KeyDerivation,
            "failed to create scrypt params",
            e,
        )
    })?;

    let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
    scrypt(passphrase, salt, &scrypt_params, &mut bytes[..]).map_err(|e| {
        SnailcryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::KeyDerivation,
            "scrypt key derivation failed",
            e,
        )
    })?;

    Ok(DerivedKey { bytes })
}

/// Fresh random salt from the OS CSPRNG.
pub fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Fresh random nonce from the OS CSPRNG.
pub fn random_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Authenticated encryption with associated data.
///
/// `open` must verify the tag over both the sealed bytes and `aad` before
/// returning anything, and must fail with `AuthenticationFailure` when
/// either was altered or the key is wrong.
pub trait AeadCipher: Send + Sync {
    /// Number of bytes `seal` adds on top of the plaintext.
    fn overhead(&self, aad_len: usize) -> usize;

    fn seal(
        &self,
        key: &DerivedKey,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    fn open(
        &self,
        key: &DerivedKey,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        sealed: &[u8],
    ) -> Result<Vec<u8>>;
}

/// NaCl secretbox (XSalsa20Poly1305).
///
/// Secretbox has no associated-data input, so the associated data is
/// bound by sealing `len(aad) (u64 BE) || aad || plaintext` and comparing
/// the recovered prefix on open.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretBox;

impl AeadCipher for SecretBox {
    fn overhead(&self, aad_len: usize) -> usize {
        TAG_LEN + size_of::<u64>() + aad_len
    }

    fn seal(
        &self,
        key: &DerivedKey,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let mut framed = Zeroizing::new(Vec::with_capacity(
            size_of::<u64>() + aad.len() + plaintext.len(),
        ));
        framed.extend_from_slice(&(aad.len() as u64).to_be_bytes());
        framed.extend_from_slice(aad);
        framed.extend_from_slice(plaintext);

        let cipher = XSalsa20Poly1305::new(key.as_bytes().into());
        let nonce_obj = Nonce::from(*nonce);
        cipher.encrypt(&nonce_obj, framed.as_slice()).map_err(|e| {
            SnailcryptError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::CipherFailure,
                format!("encryption failed: {}", e),
            )
        })
    }

    fn open(
        &self,
        key: &DerivedKey,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        sealed: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = XSalsa20Poly1305::new(key.as_bytes().into());
        let nonce_obj = Nonce::from(*nonce);
        let framed = Zeroizing::new(
            cipher
                .decrypt(&nonce_obj, sealed)
                .map_err(|_| authentication_failure())?,
        );

        let prefix_len = size_of::<u64>();
        if framed.len() < prefix_len {
            return Err(authentication_failure());
        }
        let (len_bytes, rest) = framed.split_at(prefix_len);
        let mut len_buf = [0u8; 8];
        len_buf.copy_from_slice(len_bytes);
        let bound_len = u64::from_be_bytes(len_buf);

        if bound_len != aad.len() as u64 || rest.len() < aad.len() {
            return Err(authentication_failure());
        }
        let (bound_aad, plaintext) = rest.split_at(aad.len());
        if bound_aad != aad {
            return Err(authentication_failure());
        }

        Ok(plaintext.to_vec())
    }
}

fn authentication_failure() -> SnailcryptError {
    SnailcryptError::with_kind(
        ErrorCategory::User,
        ErrorKind::AuthenticationFailure,
        "corrupt input, tampered-with data, or bad passphrase",
    )
}
