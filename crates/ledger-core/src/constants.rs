pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_BITS: u32 = (HASH_SIZE * BYTE) as u32;

/// Number of leading zero bits a block hash must carry. Shared by every block.
pub const TARGET_BITS: u32 = 24;
/// Highest nonce the miner will try before giving up.
pub const MAX_NONCE: u64 = i64::MAX as u64;
/// Value minted by every coinbase transaction.
pub const SUBSIDY: u64 = 10;

/// Reserved storage key holding the hash of the chain tip.
pub const TIP_KEY: &[u8] = b"l";
