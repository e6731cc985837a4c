//! Snailcrypt CLI
//!
//! Encrypts stdin into an armored container on stdout, and back, using
//! scrypt key derivation and NaCl secretbox (XSalsa20Poly1305).

use clap::{Parser, Subcommand};
use std::error::Error;
use std::io;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snailcrypt::passphrase::{EnvPassphraseReader, PassphraseReader, TerminalPassphraseReader};
use snailcrypt::{Config, Result, stream_ops};

#[derive(Parser)]
#[command(name = "snailcrypt")]
#[command(version)]
#[command(about = "Passphrase-based encryption of text with a lockdate, hint and filename.", long_about = None)]
struct Cli {
    /// Read the passphrase from this environment variable instead of the terminal
    #[arg(long, global = true, value_name = "VAR")]
    passphrase_env: Option<String>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt stdin, writing the armored container to stdout
    #[command(alias = "e")]
    Encrypt {
        /// Lockdate, e.g. 2022-11-19T17:00:00+0100
        #[arg(short, long, value_name = "TIMESTAMP")]
        lockdate: String,

        /// Hint stored alongside the ciphertext (readable without the passphrase)
        #[arg(long, default_value = "")]
        hint: String,

        /// Filename stored alongside the ciphertext (readable without the passphrase)
        #[arg(short, long, default_value = "")]
        filename: String,

        /// scrypt work factor, log2(N)
        #[arg(long, env = "SNAILCRYPT_KDF_LOG_N", default_value_t = snailcrypt::secretcrypt::KdfParams::DEFAULT_LOG_N)]
        kdf_log_n: u8,
    },

    /// Decrypt the container on stdin, writing the plaintext to stdout
    #[command(alias = "d")]
    Decrypt,

    /// Show the lockdate, hint and filename of the container on stdin
    /// without decrypting it. The output is not authenticated.
    #[command(alias = "i")]
    Inspect,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .without_time()
                .with_writer(io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if cli.verbose { "snailcrypt=debug" } else { "warn" }.into()
            }),
        )
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(e.status());
    }
}

fn run(cli: Cli) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();

    match cli.command {
        Commands::Encrypt {
            lockdate,
            hint,
            filename,
            kdf_log_n,
        } => {
            let config = Config::with_kdf_log_n(kdf_log_n)?;
            let mut reader = get_passphrase_reader(cli.passphrase_env);
            stream_ops::encrypt_stream(
                &mut stdin.lock(),
                &mut stdout.lock(),
                &mut *reader,
                config,
                &lockdate,
                &hint,
                &filename,
            )
        }
        Commands::Decrypt => {
            let mut reader = get_passphrase_reader(cli.passphrase_env);
            let record =
                stream_ops::decrypt_stream(&mut stdin.lock(), &mut stdout.lock(), &mut *reader)?;
            eprintln!("lockdate: {}", record.lockdate);
            eprintln!("hint: {}", record.hint);
            eprintln!("filename: {}", record.filename);
            Ok(())
        }
        Commands::Inspect => {
            let header = stream_ops::inspect_stream(&mut stdin.lock())?;
            println!("version: {}", header.version);
            println!("lockdate: {}", header.lockdate);
            println!("hint: {}", header.hint);
            println!("filename: {}", header.filename);
            Ok(())
        }
    }
}

fn get_passphrase_reader(passphrase_env: Option<String>) -> Box<dyn PassphraseReader> {
    match passphrase_env {
        Some(var) => Box::new(EnvPassphraseReader::new(var)),
        None => Box::new(TerminalPassphraseReader::default()),
    }
}
