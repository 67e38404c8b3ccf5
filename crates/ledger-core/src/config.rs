use crate::constants::{HASH_BITS, SUBSIDY, TARGET_BITS};
use crate::error::{LedgerError, Result};

/// Knobs a ledger is opened with. Defaults match the compile-time constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Proof-of-work difficulty in leading zero bits; fixed for the lifetime of a chain.
    pub target_bits: u32,
    /// Value paid by the genesis coinbase.
    pub subsidy: u64,
    /// Search nonces on the rayon pool instead of the calling thread.
    pub parallel: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            target_bits: TARGET_BITS,
            subsidy: SUBSIDY,
            parallel: false,
        }
    }
}

impl LedgerConfig {
    pub fn with_target_bits(mut self, target_bits: u32) -> Self {
        self.target_bits = target_bits;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_bits == 0 || self.target_bits >= HASH_BITS {
            return Err(LedgerError::InvalidConfig(format!(
                "target_bits must be within 1..{HASH_BITS}, got {}",
                self.target_bits
            )));
        }
        if self.subsidy == 0 {
            return Err(LedgerError::InvalidConfig("subsidy must be positive".into()));
        }
        Ok(())
    }
}
