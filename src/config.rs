//! Facade configuration

use crate::error::Result;
use crate::secretcrypt::KdfParams;

/// Settings applied when encrypting. Decryption reads everything it needs
/// from the container itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    kdf: KdfParams,
}

impl Config {
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    /// Default configuration with a different scrypt log2(N).
    pub fn with_kdf_log_n(log_n: u8) -> Result<Self> {
        let kdf = KdfParams::new(log_n, KdfParams::DEFAULT_R, KdfParams::DEFAULT_P)?;
        Ok(Self { kdf })
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }
}
