//! Error type shared by the library and the command-line tool.

use std::error::Error as StdError;

use thiserror::Error;

/// Who is most likely at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Fallback when blame cannot be assigned with confidence. It does not
    /// rule out a user mistake.
    Internal,

    /// Bad input from the caller, or a request that cannot be satisfied.
    User,
}

/// Specific failure conditions callers may match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Caller-supplied data was rejected before any cryptographic work
    /// (unparsable lockdate, oversized field, bad KDF parameters).
    InvalidInput,
    /// The container is structurally invalid: bad armor, truncated input,
    /// inconsistent length prefixes, out-of-range header values or
    /// trailing bytes.
    MalformedContainer,
    /// The input is a snailcrypt container, but of a format version this
    /// decoder does not understand.
    UnsupportedVersion,
    /// Wrong passphrase, or the container was altered.
    AuthenticationFailure,
    /// scrypt refused to derive a key.
    KeyDerivation,
    /// The AEAD primitive failed to seal data.
    CipherFailure,
    /// No passphrase could be obtained.
    PassphraseUnavailable,
    /// Interaction with stdin/stdout, the terminal or the environment failed.
    Io,
    /// A condition this crate believes impossible.
    InternalInvariant,
}

impl ErrorKind {
    /// Integer status reported by the status-returning call surface.
    ///
    /// Zero is reserved for success, so every kind maps to a non-zero value.
    pub fn status(self) -> i32 {
        match self {
            ErrorKind::InvalidInput => 1,
            ErrorKind::MalformedContainer => 2,
            ErrorKind::UnsupportedVersion => 3,
            ErrorKind::AuthenticationFailure => 4,
            ErrorKind::PassphraseUnavailable => 5,
            ErrorKind::Io => 6,
            ErrorKind::KeyDerivation | ErrorKind::CipherFailure | ErrorKind::InternalInvariant => {
                UNCLASSIFIED_STATUS
            }
        }
    }
}

/// Status for errors that carry no kind.
const UNCLASSIFIED_STATUS: i32 = 70;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct SnailcryptError {
    pub category: ErrorCategory,
    /// `None` for failures nobody is expected to branch on; consumers must
    /// handle it.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<BoxedSource>,
    msg: String,
}

impl SnailcryptError {
    fn build(
        category: ErrorCategory,
        kind: Option<ErrorKind>,
        msg: String,
        source: Option<BoxedSource>,
    ) -> Self {
        Self {
            category,
            kind,
            source,
            msg,
        }
    }

    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self::build(category, None, msg.into(), None)
    }

    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::build(category, Some(kind), msg.into(), None)
    }

    /// Like [`SnailcryptError::with_kind`], keeping `source` as the cause.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::build(category, Some(kind), msg.into(), Some(Box::new(source)))
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::User, ErrorKind::MalformedContainer, msg)
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::User, ErrorKind::InvalidInput, msg)
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Non-zero integer status for this error; see [`ErrorKind::status`].
    pub fn status(&self) -> i32 {
        self.kind.map_or(UNCLASSIFIED_STATUS, ErrorKind::status)
    }

    /// Replace the message with `msg`, demoting `self` to the cause.
    /// Category and kind carry over unchanged.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let (category, kind) = (self.category, self.kind);
        Self::build(category, kind, msg.into(), Some(Box::new(self)))
    }
}

pub type Result<T> = std::result::Result<T, SnailcryptError>;
