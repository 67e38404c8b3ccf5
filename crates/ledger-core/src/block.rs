use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::constants::TARGET_BITS;
use crate::error::Result;
use crate::pow::ProofOfWork;
use crate::transaction::Transaction;
use crate::{codec, Hash};

/// A block that has not been mined yet. Consumed by [`BlockTemplate::mine`].
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub prev_block_hash: Vec<u8>,
}

impl BlockTemplate {
    /// Template stamped with the current wall-clock time.
    pub fn new(transactions: Vec<Transaction>, prev_block_hash: Vec<u8>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        Self {
            timestamp,
            transactions,
            prev_block_hash,
        }
    }

    pub fn genesis(coinbase: Transaction) -> Self {
        Self::new(vec![coinbase], Vec::new())
    }

    pub fn mine(self, target_bits: u32) -> Result<Block> {
        let (nonce, hash) =
            ProofOfWork::new(&self.prev_block_hash, &self.transactions, self.timestamp, target_bits)
                .run()?;
        Ok(self.seal(nonce, hash))
    }

    pub fn mine_parallel(self, target_bits: u32) -> Result<Block> {
        let (nonce, hash) =
            ProofOfWork::new(&self.prev_block_hash, &self.transactions, self.timestamp, target_bits)
                .run_parallel()?;
        Ok(self.seal(nonce, hash))
    }

    fn seal(self, nonce: u64, hash: Hash) -> Block {
        Block {
            timestamp: self.timestamp,
            transactions: self.transactions,
            prev_block_hash: self.prev_block_hash,
            hash,
            nonce,
        }
    }
}

/// A mined block. Fields are read-only; the only way to get one is mining a
/// [`BlockTemplate`] or decoding a stored block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    timestamp: i64,
    transactions: Vec<Transaction>,
    prev_block_hash: Vec<u8>,
    hash: Hash,
    nonce: u64,
}

impl Block {
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Empty for genesis, otherwise the hash of the parent block.
    pub fn prev_block_hash(&self) -> &[u8] {
        &self.prev_block_hash
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_block_hash.is_empty()
    }

    pub fn hash_transactions(&self) -> Hash {
        codec::digest_transactions(&self.transactions)
    }

    /// Recheck the stored nonce against `target_bits`.
    pub fn validate_pow(&self, target_bits: u32) -> bool {
        ProofOfWork::for_block(self, target_bits).validate(self.nonce)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_summary(f, self, self.validate_pow(TARGET_BITS))
    }
}

pub(crate) fn write_summary(
    f: &mut impl fmt::Write,
    block: &Block,
    pow_valid: bool,
) -> fmt::Result {
    writeln!(f, "Prev. hash: {}", hex::encode(&block.prev_block_hash))?;
    writeln!(f, "Hash: {}", hex::encode(block.hash))?;
    writeln!(f, "PoW: {pow_valid}")?;
    writeln!(f)
}
