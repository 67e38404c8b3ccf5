//! Hashcash-style proof of work.
//!
//! A block is accepted when `SHA-256(mining_input(.., nonce))`, read as a
//! big-endian 256-bit integer, is strictly below `1 << (256 - target_bits)`.

use primitive_types::U256;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::codec::{digest_transactions, mining_input, sha256};
use crate::constants::{HASH_BITS, MAX_NONCE};
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;
use crate::{Block, Hash};

/// `1 << (256 - target_bits)`.
pub fn target(target_bits: u32) -> U256 {
    U256::one() << (HASH_BITS - target_bits) as usize
}

pub fn meets_target(hash: &Hash, target: &U256) -> bool {
    U256::from_big_endian(hash) < *target
}

/// The mining-relevant view of a block: everything except the nonce is fixed.
#[derive(Clone, Debug)]
pub struct ProofOfWork<'a> {
    prev_block_hash: &'a [u8],
    tx_digest: Hash,
    timestamp: i64,
    target_bits: u32,
    target: U256,
}

impl<'a> ProofOfWork<'a> {
    pub fn new(
        prev_block_hash: &'a [u8],
        transactions: &[Transaction],
        timestamp: i64,
        target_bits: u32,
    ) -> Self {
        Self {
            prev_block_hash,
            tx_digest: digest_transactions(transactions),
            timestamp,
            target_bits,
            target: target(target_bits),
        }
    }

    pub fn for_block(block: &'a Block, target_bits: u32) -> Self {
        Self::new(
            block.prev_block_hash(),
            block.transactions(),
            block.timestamp(),
            target_bits,
        )
    }

    pub fn target(&self) -> &U256 {
        &self.target
    }

    pub fn prepare_data(&self, nonce: u64) -> Vec<u8> {
        mining_input(
            self.prev_block_hash,
            &self.tx_digest,
            self.timestamp,
            self.target_bits,
            nonce,
        )
    }

    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        sha256(&self.prepare_data(nonce))
    }

    /// Try nonces from zero upwards on the calling thread; the first nonce that
    /// meets the target wins.
    pub fn run(&self) -> Result<(u64, Hash)> {
        debug!(target_bits = self.target_bits, "searching nonce");
        let mut nonce = 0u64;
        while nonce < MAX_NONCE {
            let hash = self.hash_with_nonce(nonce);
            if meets_target(&hash, &self.target) {
                info!(nonce, hash = %hex::encode(hash), "proof of work found");
                return Ok((nonce, hash));
            }
            nonce += 1;
        }
        Err(LedgerError::NonceExhausted(MAX_NONCE))
    }

    /// Same search spread over the rayon pool. `find_first` keeps the result
    /// identical to [`ProofOfWork::run`]: the lowest winning nonce.
    pub fn run_parallel(&self) -> Result<(u64, Hash)> {
        debug!(target_bits = self.target_bits, "searching nonce in parallel");
        let nonce = (0..MAX_NONCE)
            .into_par_iter()
            .find_first(|nonce| meets_target(&self.hash_with_nonce(*nonce), &self.target))
            .ok_or(LedgerError::NonceExhausted(MAX_NONCE))?;
        let hash = self.hash_with_nonce(nonce);
        info!(nonce, hash = %hex::encode(hash), "proof of work found");
        Ok((nonce, hash))
    }

    /// Recompute the hash for `nonce` and check it against the target. Never mines.
    pub fn validate(&self, nonce: u64) -> bool {
        meets_target(&self.hash_with_nonce(nonce), &self.target)
    }
}
