//! Where the command-line tool gets its passphrase from.

use crate::error::{ErrorCategory, ErrorKind, Result, SnailcryptError};
use std::env;
use zeroize::Zeroizing;

/// Default terminal prompt.
pub const DEFAULT_PROMPT: &str = "Passphrase (snailcrypt): ";

/// A source of passphrase bytes. The bytes need not be UTF-8.
pub trait PassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Hands out the same passphrase on every call.
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: impl Into<Vec<u8>>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(self.passphrase.clone())
    }
}

/// Reads the passphrase from a named environment variable.
///
/// Lets scripts supply the passphrase while stdin carries the data. On Unix
/// the raw bytes of the variable are used.
pub struct EnvPassphraseReader {
    var: String,
}

impl EnvPassphraseReader {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl PassphraseReader for EnvPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let value = env::var_os(&self.var).ok_or_else(|| {
            SnailcryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                format!("environment variable {} is not set", self.var),
            )
        })?;
        Ok(Zeroizing::new(value.into_encoded_bytes()))
    }
}

/// Prompts on the controlling terminal with echo disabled.
///
/// Prompt and input go through the terminal device rather than stdin and
/// stdout, so redirected data streams are left alone. Only UTF-8 input is
/// possible this way.
pub struct TerminalPassphraseReader {
    prompt: String,
}

impl TerminalPassphraseReader {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        // rpassword hands back a plain String; move it straight into Zeroizing.
        let entered = rpassword::prompt_password(&self.prompt).map_err(|e| {
            SnailcryptError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                format!("could not read passphrase from terminal: {}", e),
                e,
            )
        })?;
        Ok(Zeroizing::new(entered.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_reader_repeats() {
        let mut reader = ConstantPassphraseReader::new("hunter2");
        for _ in 0..3 {
            assert_eq!(reader.read_passphrase().unwrap().as_slice(), b"hunter2");
        }
    }

    #[test]
    fn test_env_reader_missing_var() {
        let mut reader = EnvPassphraseReader::new("SNAILCRYPT_TEST_SURELY_UNSET_VARIABLE");
        let err = reader.read_passphrase().unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::PassphraseUnavailable));
        assert_eq!(err.status(), ErrorKind::PassphraseUnavailable.status());
        assert!(err.to_string().contains("SNAILCRYPT_TEST_SURELY_UNSET_VARIABLE"));
    }

    #[test]
    fn test_env_reader_reads_var() {
        // PATH is set in any environment the test suite runs in.
        let expected = env::var_os("PATH").unwrap().into_encoded_bytes();
        let mut reader = EnvPassphraseReader::new("PATH");
        assert_eq!(*reader.read_passphrase().unwrap(), expected);
    }

    /// Needs a human at a terminal:
    ///
    /// cargo test test_terminal_prompt -- --ignored --nocapture
    #[test]
    #[ignore]
    fn test_terminal_prompt() {
        let mut reader = TerminalPassphraseReader::new("Type anything and press enter: ");
        let entered = reader.read_passphrase().unwrap();
        assert!(!entered.is_empty(), "nothing was entered");
    }
}
