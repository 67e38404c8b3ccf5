//! Deterministic byte layouts fed into SHA-256.
//!
//! Nothing here goes through serde: the bytes that get hashed are spelled out
//! field by field so that the same block always produces the same digest.

use sha2::{Digest, Sha256};

use crate::transaction::Transaction;
use crate::Hash;

pub fn sha256(bytes: &[u8]) -> Hash {
    Sha256::digest(bytes).into()
}

/// Hash of the concatenated transaction ids, in list order.
pub fn digest_transactions(txs: &[Transaction]) -> Hash {
    let mut hasher = Sha256::new();
    for tx in txs {
        hasher.update(tx.id);
    }
    hasher.finalize().into()
}

/// Input to the proof-of-work hash:
/// `prev_block_hash ‖ tx_digest ‖ timestamp ‖ target_bits ‖ nonce`,
/// integers as fixed-width 8-byte big-endian.
pub fn mining_input(
    prev_block_hash: &[u8],
    tx_digest: &Hash,
    timestamp: i64,
    target_bits: u32,
    nonce: u64,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(prev_block_hash.len() + 32 + 8 + 8 + 8);
    bytes.extend_from_slice(prev_block_hash);
    bytes.extend_from_slice(tx_digest);
    bytes.extend_from_slice(&timestamp.to_be_bytes());
    bytes.extend_from_slice(&i64::from(target_bits).to_be_bytes());
    bytes.extend_from_slice(&nonce.to_be_bytes());
    bytes
}

pub(crate) fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    out.extend_from_slice(bytes);
}
