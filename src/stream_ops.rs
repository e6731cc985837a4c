//! Stream encryption/decryption operations
//!
//! Whole-input operations over any `Read`/`Write` pair, as used by the
//! command-line tool with stdin and stdout.

use crate::config::Config;
use crate::container::{Header, PlainRecord};
use crate::error::{ErrorCategory, ErrorKind, Result, SnailcryptError};
use crate::ez::{self, Snailcrypt};
use crate::lockdate::Lockdate;
use crate::passphrase::PassphraseReader;
use crate::varmor;
use std::io::{self, Read, Write};

/// Encrypt everything readable from `input` and write the armored container
/// followed by a newline to `output`.
///
/// The lockdate is validated before the passphrase is requested.
pub fn encrypt_stream(
    input: &mut dyn Read,
    output: &mut dyn Write,
    passphrase_reader: &mut dyn PassphraseReader,
    config: Config,
    lockdate: &str,
    hint: &str,
    filename: &str,
) -> Result<()> {
    let lockdate = Lockdate::parse(lockdate)?;
    let plaintext = read_all(input)?;
    let snailcrypt = Snailcrypt::from_reader(passphrase_reader, config)?;
    let record = PlainRecord::new(plaintext, lockdate, hint, filename);
    let armored = snailcrypt.encrypt_record(&record)?;
    write_all(output, armored.as_bytes())?;
    write_all(output, b"\n")?;
    flush(output)
}

/// Decrypt the armored container readable from `input` and write the
/// plaintext to `output`.
///
/// Surrounding whitespace around the armored text is ignored. Input that is
/// not recognizably a container is rejected before the passphrase is
/// requested. Returns the decrypted record so callers can report its
/// metadata.
pub fn decrypt_stream(
    input: &mut dyn Read,
    output: &mut dyn Write,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<PlainRecord> {
    let armored = read_armored(input)?;
    let armored = armored.trim();
    varmor::detect_version(armored)?;
    let snailcrypt = Snailcrypt::from_reader(passphrase_reader, Config::default())?;
    let record = snailcrypt.decrypt(armored)?;
    write_all(output, &record.plaintext)?;
    flush(output)?;
    Ok(record)
}

/// Read the unauthenticated header of the armored container on `input`.
pub fn inspect_stream(input: &mut dyn Read) -> Result<Header> {
    let armored = read_armored(input)?;
    ez::inspect(armored.trim())
}

fn read_all(input: &mut dyn Read) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    input
        .read_to_end(&mut buf)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to read input", e))?;
    Ok(buf)
}

fn read_armored(input: &mut dyn Read) -> Result<String> {
    String::from_utf8(read_all(input)?).map_err(|e| {
        SnailcryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedContainer,
            "input is not valid UTF-8",
            e,
        )
    })
}

fn write_all(output: &mut dyn Write, bytes: &[u8]) -> Result<()> {
    output
        .write_all(bytes)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to write output", e))
}

fn flush(output: &mut dyn Write) -> Result<()> {
    output
        .flush()
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to flush output", e))
}

fn io_error(category: ErrorCategory, msg: &str, err: io::Error) -> SnailcryptError {
    SnailcryptError::with_kind_and_source(category, ErrorKind::Io, msg, err)
}
