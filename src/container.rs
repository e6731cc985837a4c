//! Container encoding and decoding
//!
//! A container bundles a plaintext with its lockdate, hint and filename.
//! The plaintext is sealed with an [`AeadCipher`]; every header byte is the
//! associated data of that seal, so the whole container is tamper-evident
//! while the metadata stays readable through [`inspect`].
//!
//! The binary format (version 1, all integers big-endian) is:
//! - format version: 1 byte
//! - scrypt log2(N): 1 byte
//! - scrypt r: 4 bytes
//! - scrypt p: 4 bytes
//! - salt: 4-byte length (always 16) + bytes
//! - nonce: 4-byte length (always 24) + bytes
//! - lockdate: 4-byte length + UTF-8 (`%Y-%m-%dT%H:%M:%S%z`)
//! - hint: 4-byte length + UTF-8
//! - filename: 4-byte length + UTF-8
//! - sealed box: 4-byte length + bytes (includes the authentication tag)
//!
//! Nothing may follow the sealed box.

use crate::error::{ErrorCategory, ErrorKind, Result, SnailcryptError};
use crate::lockdate::Lockdate;
use crate::secretcrypt::{
    self, AeadCipher, KdfParams, NONCE_LEN, SALT_LEN, SecretBox, derive_key,
};
use std::mem::size_of;
use tracing::debug;

/// Container format version written by this crate.
pub const FORMAT_VERSION: u8 = 1;

/// A plaintext together with the metadata that travels with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainRecord {
    pub plaintext: Vec<u8>,
    pub lockdate: Lockdate,
    pub hint: String,
    pub filename: String,
}

impl PlainRecord {
    pub fn new(
        plaintext: impl Into<Vec<u8>>,
        lockdate: Lockdate,
        hint: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            plaintext: plaintext.into(),
            lockdate,
            hint: hint.into(),
            filename: filename.into(),
        }
    }

    /// The plaintext as UTF-8 text.
    pub fn plaintext_utf8(&self) -> Result<&str> {
        std::str::from_utf8(&self.plaintext).map_err(|e| {
            SnailcryptError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidInput,
                "plaintext is not valid UTF-8",
                e,
            )
        })
    }
}

/// Container metadata as read by [`inspect`].
///
/// Nothing in here has been authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub kdf: KdfParams,
    pub lockdate: Lockdate,
    pub hint: String,
    pub filename: String,
}

/// Encodes records into containers and back.
///
/// The KDF parameters only affect encoding; decoding uses the parameters
/// recorded in each container.
#[derive(Debug, Clone)]
pub struct Codec<C = SecretBox> {
    cipher: C,
    kdf: KdfParams,
}

impl Codec<SecretBox> {
    pub fn new(kdf: KdfParams) -> Self {
        Self::with_cipher(SecretBox, kdf)
    }
}

impl Default for Codec<SecretBox> {
    fn default() -> Self {
        Self::new(KdfParams::default())
    }
}

impl<C: AeadCipher> Codec<C> {
    pub fn with_cipher(cipher: C, kdf: KdfParams) -> Self {
        Self { cipher, kdf }
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    /// Encode a record with a fresh random salt and nonce.
    pub fn encode(&self, passphrase: &[u8], record: &PlainRecord) -> Result<Vec<u8>> {
        let salt = secretcrypt::random_salt();
        let nonce = secretcrypt::random_nonce();
        self.encode_deterministic(passphrase, record, &salt, &nonce)
    }

    /// Encode a record with the provided salt and nonce.
    ///
    /// This function is ONLY for testing purposes to generate deterministic output.
    /// NEVER use this in production - always use `encode()` which generates random salt/nonce.
    pub fn encode_deterministic(
        &self,
        passphrase: &[u8],
        record: &PlainRecord,
        salt: &[u8; SALT_LEN],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>> {
        let lockdate = record.lockdate.to_wire_string();

        let mut header = Vec::with_capacity(
            64 + lockdate.len() + record.hint.len() + record.filename.len(),
        );
        header.push(FORMAT_VERSION);
        header.push(self.kdf.log_n());
        header.extend_from_slice(&self.kdf.r().to_be_bytes());
        header.extend_from_slice(&self.kdf.p().to_be_bytes());
        put_field(&mut header, "salt", salt)?;
        put_field(&mut header, "nonce", nonce)?;
        put_field(&mut header, "lockdate", lockdate.as_bytes())?;
        put_field(&mut header, "hint", record.hint.as_bytes())?;
        put_field(&mut header, "filename", record.filename.as_bytes())?;

        let sealed_len = record
            .plaintext
            .len()
            .checked_add(self.cipher.overhead(header.len()));
        if sealed_len.is_none_or(|n| u32::try_from(n).is_err()) {
            return Err(SnailcryptError::invalid_input(
                "plaintext too large to fit in a container",
            ));
        }

        let key = derive_key(passphrase, salt, &self.kdf)?;
        let sealed = self.cipher.seal(&key, nonce, &header, &record.plaintext)?;

        let mut output = header;
        put_field(&mut output, "sealed box", &sealed)?;

        debug!(
            version = FORMAT_VERSION,
            plaintext_len = record.plaintext.len(),
            hint_len = record.hint.len(),
            filename_len = record.filename.len(),
            container_len = output.len(),
            "encoded container"
        );

        Ok(output)
    }

    /// Authenticate and decode a container.
    pub fn decode(&self, passphrase: &[u8], container: &[u8]) -> Result<PlainRecord> {
        let raw = RawContainer::parse(container)?;

        if raw.sealed.len() < self.cipher.overhead(raw.aad.len()) {
            return Err(SnailcryptError::malformed(
                "sealed box shorter than the cipher overhead",
            ));
        }

        let key = derive_key(passphrase, &raw.salt, &raw.kdf)?;
        let plaintext = self
            .cipher
            .open(&key, &raw.nonce, raw.aad, raw.sealed)
            .inspect_err(|_| debug!(container_len = container.len(), "container failed authentication"))?;

        let record = PlainRecord {
            plaintext,
            lockdate: Lockdate::from_wire(utf8_field("lockdate", raw.lockdate)?)?,
            hint: utf8_field("hint", raw.hint)?.to_owned(),
            filename: utf8_field("filename", raw.filename)?.to_owned(),
        };

        debug!(
            version = raw.version,
            plaintext_len = record.plaintext.len(),
            container_len = container.len(),
            "decoded container"
        );

        Ok(record)
    }
}

/// Read the header of a container without a passphrase.
///
/// The result is NOT authenticated; only [`Codec::decode`] proves the
/// container is intact.
pub fn inspect(container: &[u8]) -> Result<Header> {
    let raw = RawContainer::parse(container)?;
    Ok(Header {
        version: raw.version,
        kdf: raw.kdf,
        lockdate: Lockdate::from_wire(utf8_field("lockdate", raw.lockdate)?)?,
        hint: utf8_field("hint", raw.hint)?.to_owned(),
        filename: utf8_field("filename", raw.filename)?.to_owned(),
    })
}

/// Append a length-prefixed field.
fn put_field(out: &mut Vec<u8>, what: &str, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| SnailcryptError::invalid_input(format!("{} too large to fit in a container", what)))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

fn utf8_field<'a>(what: &str, bytes: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| {
        SnailcryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedContainer,
            format!("{} is not valid UTF-8", what),
            e,
        )
    })
}

/// A structurally valid container whose contents are not yet authenticated.
struct RawContainer<'a> {
    version: u8,
    kdf: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    lockdate: &'a [u8],
    hint: &'a [u8],
    filename: &'a [u8],
    /// Every byte preceding the sealed box length prefix.
    aad: &'a [u8],
    sealed: &'a [u8],
}

impl<'a> RawContainer<'a> {
    fn parse(input: &'a [u8]) -> Result<Self> {
        let mut cursor = Cursor { input, pos: 0 };

        let version = cursor.read_u8("format version")?;
        if version == 0 {
            return Err(SnailcryptError::malformed("invalid format version 0"));
        }
        if version > FORMAT_VERSION {
            return Err(SnailcryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::UnsupportedVersion,
                format!(
                    "container format version {} is newer than the supported version {}",
                    version, FORMAT_VERSION
                ),
            ));
        }

        let log_n = cursor.read_u8("scrypt parameters")?;
        let r = cursor.read_u32("scrypt parameters")?;
        let p = cursor.read_u32("scrypt parameters")?;
        let kdf = KdfParams::from_header(log_n, r, p)?;

        let salt = cursor.read_fixed::<SALT_LEN>("salt")?;
        let nonce = cursor.read_fixed::<NONCE_LEN>("nonce")?;
        let lockdate = cursor.read_field("lockdate")?;
        let hint = cursor.read_field("hint")?;
        let filename = cursor.read_field("filename")?;
        let aad = &input[..cursor.pos];
        let sealed = cursor.read_field("sealed box")?;

        if cursor.pos < input.len() {
            return Err(SnailcryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::MalformedContainer,
                "invalid input: unexpected data after sealed box",
            ));
        }

        Ok(Self {
            version,
            kdf,
            salt,
            nonce,
            lockdate,
            hint,
            filename,
            aad,
            sealed,
        })
    }
}

struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| {
                SnailcryptError::malformed(format!("input likely truncated while reading {}", what))
            })?;
        let bytes = &self.input[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let mut buf = [0u8; size_of::<u32>()];
        buf.copy_from_slice(self.take(size_of::<u32>(), what)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn read_field(&mut self, what: &str) -> Result<&'a [u8]> {
        let len = self.read_u32(what)? as usize;
        if len > self.input.len() - self.pos {
            return Err(SnailcryptError::malformed(format!(
                "truncated or corrupt input; claimed {} length greater than available input",
                what
            )));
        }
        self.take(len, what)
    }

    fn read_fixed<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let field = self.read_field(what)?;
        let mut out = [0u8; N];
        if field.len() != N {
            return Err(SnailcryptError::malformed(format!(
                "{} must be {} bytes, got {}",
                what,
                N,
                field.len()
            )));
        }
        out.copy_from_slice(field);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> Codec {
        Codec::new(KdfParams::new(10, 8, 1).unwrap())
    }

    fn record(plaintext: &[u8], hint: &str, filename: &str) -> PlainRecord {
        PlainRecord::new(
            plaintext,
            Lockdate::parse("2022-11-19T17:00:00+0100").unwrap(),
            hint,
            filename,
        )
    }

    /// Offset of the first length-prefixed field (salt).
    const FIELDS_START: usize = 1 + 1 + 4 + 4;

    #[test]
    fn test_roundtrip() {
        let original = record(b"hello world", "the usual one", "notes.txt");
        let container = codec().encode(b"test", &original).unwrap();
        assert_eq!(codec().decode(b"test", &container).unwrap(), original);
    }

    #[test]
    fn test_empty_everything() {
        let original = record(b"", "", "");
        let container = codec().encode(b"", &original).unwrap();
        let decoded = codec().decode(b"", &container).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.hint, "");
        assert_eq!(decoded.filename, "");
    }

    #[test]
    fn test_embedded_nul_and_non_ascii() {
        let original = record(b"a\0b\0\xff", "h\0int \u{1F40C}", "d\u{e9}j\u{e0}\0vu.txt");
        let container = codec().encode(b"test", &original).unwrap();
        assert_eq!(codec().decode(b"test", &container).unwrap(), original);
    }

    #[test]
    fn test_layout() {
        let original = record(b"hello", "h", "f");
        let salt = [1u8; SALT_LEN];
        let nonce = [2u8; NONCE_LEN];
        let container = codec()
            .encode_deterministic(b"test", &original, &salt, &nonce)
            .unwrap();

        assert_eq!(container[0], FORMAT_VERSION);
        assert_eq!(container[1], 10);
        assert_eq!(&container[2..6], &8u32.to_be_bytes());
        assert_eq!(&container[6..10], &1u32.to_be_bytes());
        assert_eq!(&container[10..14], &(SALT_LEN as u32).to_be_bytes());
        assert_eq!(&container[14..30], &salt);
        assert_eq!(&container[30..34], &(NONCE_LEN as u32).to_be_bytes());
        assert_eq!(&container[34..58], &nonce);
        assert_eq!(&container[58..62], &24u32.to_be_bytes());
        assert_eq!(&container[62..86], b"2022-11-19T17:00:00+0100");

        let header_len = 86 + 4 + 1 + 4 + 1;
        let sealed_len = 5 + SecretBox.overhead(header_len);
        assert_eq!(container.len(), header_len + 4 + sealed_len);
    }

    #[test]
    fn test_deterministic_encoding() {
        let original = record(b"hello world", "", "");
        let salt = [1u8; SALT_LEN];
        let nonce = [2u8; NONCE_LEN];

        let c1 = codec().encode_deterministic(b"test", &original, &salt, &nonce).unwrap();
        let c2 = codec().encode_deterministic(b"test", &original, &salt, &nonce).unwrap();
        assert_eq!(c1, c2);

        let random = codec().encode(b"test", &original).unwrap();
        assert_ne!(c1, random);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let container = codec().encode(b"test", &record(b"x", "", "")).unwrap();
        assert_eq!(
            codec().decode(b"test", &container).unwrap(),
            codec().decode(b"test", &container).unwrap()
        );

        let e1 = codec().decode(b"wrong", &container).unwrap_err();
        let e2 = codec().decode(b"wrong", &container).unwrap_err();
        assert_eq!(e1.kind, e2.kind);
        assert_eq!(e1.to_string(), e2.to_string());
    }

    #[test]
    fn test_decode_ignores_encoder_kdf() {
        let container = codec().encode(b"test", &record(b"x", "", "")).unwrap();
        let other = Codec::new(KdfParams::new(11, 8, 2).unwrap());
        assert_eq!(other.decode(b"test", &container).unwrap().plaintext, b"x");
    }

    #[test]
    fn test_wrong_passphrase() {
        let container = codec().encode(b"correct", &record(b"secret", "", "")).unwrap();
        let err = codec().decode(b"wrong", &container).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailure));
    }

    #[test]
    fn test_tampered_metadata_fails_authentication() {
        let container = codec()
            .encode(b"test", &record(b"secret", "my hint", "a.txt"))
            .unwrap();

        // Flip a byte inside the hint text: still well-formed, no longer authentic.
        let hint_pos = container
            .windows(7)
            .position(|w| w == b"my hint")
            .unwrap();
        let mut tampered = container.clone();
        tampered[hint_pos] ^= 0x20;

        assert_eq!(inspect(&tampered).unwrap().hint, "My hint");
        let err = codec().decode(b"test", &tampered).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailure));
    }

    #[test]
    fn test_every_byte_flip_is_rejected() {
        let container = codec()
            .encode(b"test", &record(b"hello", "hi", "f"))
            .unwrap();
        for i in 0..container.len() {
            let mut tampered = container.clone();
            tampered[i] ^= 0x01;
            let err = codec()
                .decode(b"test", &tampered)
                .expect_err("tampered container must not decode");
            assert!(
                matches!(
                    err.kind,
                    Some(ErrorKind::AuthenticationFailure)
                        | Some(ErrorKind::MalformedContainer)
                        | Some(ErrorKind::UnsupportedVersion)
                ),
                "byte {}: unexpected {:?}",
                i,
                err.kind
            );
        }
    }

    #[test]
    fn test_empty_input() {
        let err = codec().decode(b"test", b"").unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedContainer));
        assert!(err.to_string().contains("truncated while reading format version"));
    }

    #[test]
    fn test_future_version() {
        let mut container = codec().encode(b"test", &record(b"x", "", "")).unwrap();
        container[0] = FORMAT_VERSION + 1;
        let err = codec().decode(b"test", &container).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::UnsupportedVersion));
    }

    #[test]
    fn test_version_zero() {
        let err = codec().decode(b"test", &[0u8; 64]).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedContainer));
    }

    #[test]
    fn test_every_truncation_is_malformed() {
        let container = codec().encode(b"test", &record(b"hello", "hi", "f")).unwrap();
        for len in 0..container.len() {
            let err = codec().decode(b"test", &container[..len]).unwrap_err();
            assert_eq!(err.kind, Some(ErrorKind::MalformedContainer), "length {}", len);
        }
    }

    #[test]
    fn test_trailing_data() {
        let mut container = codec().encode(b"test", &record(b"hello", "", "")).unwrap();
        container.push(0xFF);
        let err = codec().decode(b"test", &container).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedContainer));
        assert!(err.to_string().contains("unexpected data after sealed box"));
    }

    #[test]
    fn test_length_exceeds_available() {
        let mut container = codec().encode(b"test", &record(b"hello", "", "")).unwrap();
        container[FIELDS_START..FIELDS_START + 4].copy_from_slice(&u32::MAX.to_be_bytes());
        let err = codec().decode(b"test", &container).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedContainer));
        assert!(err.to_string().contains("claimed salt length greater than available input"));
    }

    #[test]
    fn test_wrong_salt_size() {
        let mut container = codec().encode(b"test", &record(b"hello", "", "")).unwrap();
        container[FIELDS_START..FIELDS_START + 4].copy_from_slice(&8u32.to_be_bytes());
        let err = codec().decode(b"test", &container).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedContainer));
    }

    #[test]
    fn test_oversized_kdf_parameters() {
        let mut container = codec().encode(b"test", &record(b"hello", "", "")).unwrap();
        container[1] = 40;
        let err = codec().decode(b"test", &container).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedContainer));
    }

    #[test]
    fn test_inspect() {
        let container = codec()
            .encode(b"test", &record(b"secret", "my cat", "diary.txt"))
            .unwrap();
        let header = inspect(&container).unwrap();
        assert_eq!(header.version, FORMAT_VERSION);
        assert_eq!(header.kdf, *codec().kdf());
        assert_eq!(header.lockdate.to_wire_string(), "2022-11-19T17:00:00+0100");
        assert_eq!(header.hint, "my cat");
        assert_eq!(header.filename, "diary.txt");
    }

    #[test]
    fn test_plaintext_utf8() {
        assert_eq!(record(b"hello", "", "").plaintext_utf8().unwrap(), "hello");
        let err = record(b"\xff", "", "").plaintext_utf8().unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::InvalidInput));
    }
}
