use thiserror::Error;

/// Everything the ledger engine can fail with. Variants follow the failure
/// categories callers are expected to react to differently.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("a ledger already exists in this store")]
    AlreadyExists,

    #[error("no ledger found in this store; create one first")]
    NotFound,

    #[error("nonce space exhausted after {0} attempts without meeting the target")]
    NonceExhausted(u64),

    #[error("insufficient funds: {address} holds {available}, transfer needs {requested}")]
    InsufficientFunds {
        address: String,
        available: u64,
        requested: u64,
    },

    #[error("transfer amount must be positive")]
    InvalidAmount,

    #[error("block {0} is referenced by the chain but missing from storage")]
    MissingBlock(String),

    #[error("corrupt ledger data: {0}")]
    Corrupt(String),

    #[error("failed to encode or decode a block: {0}")]
    Codec(#[from] bincode::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
