//! Single-node UTXO ledger engine: proof-of-work blocks, coinbase and
//! transfer transactions, and balance queries over a persisted chain.

pub mod block;
pub mod chain;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod pow;
pub mod store;
pub mod transaction;
pub mod utxo;

pub type Hash = [u8; 32];

pub use block::{Block, BlockTemplate};
pub use chain::{print_chain, ChainStore, Ledger, LedgerIter};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use pow::ProofOfWork;
pub use store::MemoryStore;
pub use transaction::{Transaction, TxInput, TxOutput};
pub use utxo::{Selection, UnspentTx};
