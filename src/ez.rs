//! The easy API: armored text in, armored text out.
//!
//! [`Snailcrypt::encrypt`] and [`Snailcrypt::decrypt`] return structured
//! results. [`Snailcrypt::encrypt_with`] and [`Snailcrypt::decrypt_with`]
//! offer the status-code surface instead: the callback runs exactly once on
//! success, never on failure, and `0` means success.

use crate::config::Config;
use crate::container::{self, Codec, Header, PlainRecord};
use crate::error::{Result, SnailcryptError};
use crate::lockdate::Lockdate;
use crate::passphrase::PassphraseReader;
use crate::varmor;
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// Status returned by the callback adapters on success.
pub const STATUS_OK: i32 = 0;

/// Encrypts and decrypts under one passphrase.
///
/// Holds no mutable state, so a single instance can serve concurrent calls.
pub struct Snailcrypt {
    passphrase: Zeroizing<Vec<u8>>,
    codec: Codec,
}

impl Snailcrypt {
    pub fn new(passphrase: impl Into<Vec<u8>>) -> Self {
        Self::with_config(passphrase, Config::default())
    }

    pub fn with_config(passphrase: impl Into<Vec<u8>>, config: Config) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
            codec: Codec::new(*config.kdf()),
        }
    }

    pub fn from_reader(reader: &mut dyn PassphraseReader, config: Config) -> Result<Self> {
        let passphrase = reader.read_passphrase()?;
        Ok(Self {
            passphrase,
            codec: Codec::new(*config.kdf()),
        })
    }

    /// Encrypt `plaintext` with its metadata into armored container text.
    ///
    /// `lockdate` must be a date-time with offset, e.g.
    /// `2022-11-19T17:00:00+0100`; anything else fails with `InvalidInput`
    /// before any cryptographic work.
    pub fn encrypt(
        &self,
        plaintext: impl AsRef<[u8]>,
        lockdate: &str,
        hint: &str,
        filename: &str,
    ) -> Result<String> {
        let lockdate = Lockdate::parse(lockdate)?;
        let record = PlainRecord::new(plaintext.as_ref(), lockdate, hint, filename);
        self.encrypt_record(&record)
    }

    pub fn encrypt_record(&self, record: &PlainRecord) -> Result<String> {
        let container = self
            .codec
            .encode(&self.passphrase, record)
            .map_err(|e| e.with_context("encryption failed"))?;
        Ok(varmor::wrap(&container))
    }

    /// Authenticate and decrypt armored container text.
    pub fn decrypt(&self, armored: &str) -> Result<PlainRecord> {
        let container = varmor::unwrap(armored).map_err(|e| e.with_context("failed to unarmor"))?;
        self.codec
            .decode(&self.passphrase, &container)
            .map_err(|e| e.with_context("failed to decrypt"))
    }

    /// Status-code flavour of [`Snailcrypt::encrypt`].
    ///
    /// `on_success` receives the armored container, borrowed for the
    /// duration of the call.
    pub fn encrypt_with<F>(
        &self,
        plaintext: impl AsRef<[u8]>,
        lockdate: &str,
        hint: &str,
        filename: &str,
        on_success: F,
    ) -> i32
    where
        F: FnOnce(&str),
    {
        match self.encrypt(plaintext, lockdate, hint, filename) {
            Ok(armored) => {
                on_success(&armored);
                STATUS_OK
            }
            Err(e) => failure_status("encrypt", &e),
        }
    }

    /// Status-code flavour of [`Snailcrypt::decrypt`].
    ///
    /// `on_success` receives `(plaintext, hint, filename)`, borrowed for the
    /// duration of the call. Empty hints and filenames arrive as `""`.
    pub fn decrypt_with<F>(&self, armored: &str, on_success: F) -> i32
    where
        F: FnOnce(&[u8], &str, &str),
    {
        match self.decrypt(armored) {
            Ok(record) => {
                on_success(&record.plaintext, &record.hint, &record.filename);
                STATUS_OK
            }
            Err(e) => failure_status("decrypt", &e),
        }
    }
}

impl fmt::Debug for Snailcrypt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snailcrypt")
            .field("passphrase", &"[REDACTED]")
            .field("codec", &self.codec)
            .finish()
    }
}

/// Read the lockdate, hint and filename of armored text without a passphrase.
///
/// The result is NOT authenticated.
pub fn inspect(armored: &str) -> Result<Header> {
    let container = varmor::unwrap(armored).map_err(|e| e.with_context("failed to unarmor"))?;
    container::inspect(&container)
}

fn failure_status(operation: &str, err: &SnailcryptError) -> i32 {
    let status = err.status();
    debug!(operation, status, error = %err, "call failed");
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::passphrase::ConstantPassphraseReader;

    fn cheap() -> Config {
        Config::with_kdf_log_n(10).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let sc = Snailcrypt::with_config("test", cheap());
        let armored = sc
            .encrypt("hello world", "2022-11-19T17:00:00+0100", "a hint", "hello.txt")
            .unwrap();
        assert!(armored.starts_with("snailcrypt1:"));

        let record = sc.decrypt(&armored).unwrap();
        assert_eq!(record.plaintext, b"hello world");
        assert_eq!(record.hint, "a hint");
        assert_eq!(record.filename, "hello.txt");
        assert_eq!(record.lockdate.to_string(), "2022-11-19T17:00:00+0100");
    }

    #[test]
    fn test_from_reader() {
        let mut reader = ConstantPassphraseReader::new(b"test".to_vec());
        let sc = Snailcrypt::from_reader(&mut reader, cheap()).unwrap();
        let armored = sc.encrypt("x", "2022-11-19T17:00:00+0100", "", "").unwrap();
        assert_eq!(
            Snailcrypt::new("test").decrypt(&armored).unwrap().plaintext,
            b"x"
        );
    }

    #[test]
    fn test_invalid_lockdate() {
        let sc = Snailcrypt::with_config("test", cheap());
        let err = sc.encrypt("x", "not-a-date", "", "").unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidInput));
    }

    #[test]
    fn test_wrong_passphrase_keeps_kind() {
        let armored = Snailcrypt::with_config("right", cheap())
            .encrypt("x", "2022-11-19T17:00:00+0100", "", "")
            .unwrap();
        let err = Snailcrypt::new("wrong").decrypt(&armored).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailure));
        assert_eq!(err.message(), "failed to decrypt");
    }

    #[test]
    fn test_inspect_without_passphrase() {
        let armored = Snailcrypt::with_config("test", cheap())
            .encrypt("secret", "2022-11-19T17:00:00+0100", "the usual", "a.txt")
            .unwrap();
        let header = inspect(&armored).unwrap();
        assert_eq!(header.hint, "the usual");
        assert_eq!(header.filename, "a.txt");
    }

    #[test]
    fn test_debug_redacts_passphrase() {
        let rendered = format!("{:?}", Snailcrypt::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_shared_across_threads() {
        let sc = Snailcrypt::with_config("test", cheap());
        std::thread::scope(|s| {
            for i in 0..4 {
                let sc = &sc;
                s.spawn(move || {
                    let text = format!("message {}", i);
                    let armored = sc.encrypt(&text, "2022-11-19T17:00:00+0100", "", "").unwrap();
                    assert_eq!(sc.decrypt(&armored).unwrap().plaintext, text.as_bytes());
                });
            }
        });
    }
}
