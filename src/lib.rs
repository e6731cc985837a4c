//! Snailcrypt - self-describing, tamper-evident encryption of a plaintext
//! together with its lockdate, hint and filename.

#![forbid(unsafe_code)]

pub mod config;
pub mod container;
pub mod error;
pub mod ez;
pub mod lockdate;
pub mod passphrase;
pub mod secretcrypt;
pub mod stream_ops;
pub mod varmor;

pub use config::Config;
pub use container::{Header, PlainRecord};
pub use error::{ErrorCategory, ErrorKind, Result, SnailcryptError};
pub use ez::{Snailcrypt, inspect};
pub use lockdate::Lockdate;
pub use varmor::detect_version;
