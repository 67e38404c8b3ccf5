//! The persisted chain: tip pointer, block storage and backward traversal.
//!
//! Blocks are stored under their own hash; the reserved key [`TIP_KEY`] holds
//! the hash of the newest block. A block write and the tip update that points
//! at it always go through one atomic [`ChainStore::put_all`] call.
//!
//! Single writer: nothing here coordinates two processes mining against the
//! same store. Iterators re-read the store on every step and take no lock, so a
//! concurrent external writer could make a scan observe an inconsistent chain.

use std::fmt::Write as _;

use anyhow::Result as AnyResult;
use tracing::{debug, info, warn};

use crate::block::{write_summary, Block, BlockTemplate};
use crate::config::LedgerConfig;
use crate::constants::{HASH_SIZE, TIP_KEY};
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;
use crate::Hash;

/// Key-value bucket the ledger persists into. This lives in `ledger-core` so
/// storage backends can depend on the core without a cycle.
pub trait ChainStore: Send + Sync {
    fn get(&self, key: &[u8]) -> AnyResult<Option<Vec<u8>>>;

    /// Write every entry or none of them.
    fn put_all(&self, entries: &[(&[u8], &[u8])]) -> AnyResult<()>;

    fn put(&self, key: &[u8], value: &[u8]) -> AnyResult<()> {
        self.put_all(&[(key, value)])
    }

    fn close(&self) -> AnyResult<()>;
}

/// Handle to one chain. Owns its store exclusively.
pub struct Ledger<S: ChainStore> {
    tip: Hash,
    store: S,
    config: LedgerConfig,
}

impl<S: ChainStore> Ledger<S> {
    /// Bootstrap a new chain whose genesis coinbase pays `address`.
    pub fn create(store: S, address: &str, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        if store.get(TIP_KEY)?.is_some() {
            return Err(LedgerError::AlreadyExists);
        }

        let coinbase = Transaction::new_coinbase_with_subsidy(address, "", config.subsidy);
        let genesis = mine_template(BlockTemplate::genesis(coinbase), &config)?;
        persist(&store, &genesis)?;
        info!(tip = %hex::encode(genesis.hash()), address, "created ledger");

        Ok(Self {
            tip: *genesis.hash(),
            store,
            config,
        })
    }

    /// Load an existing chain. The chain itself is not re-validated here.
    pub fn open(store: S, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let raw = store.get(TIP_KEY)?.ok_or(LedgerError::NotFound)?;
        let tip = to_hash(&raw)?;
        info!(tip = %hex::encode(tip), "opened ledger");
        Ok(Self { tip, store, config })
    }

    pub fn tip(&self) -> &Hash {
        &self.tip
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mine `transactions` on top of the current tip, persist the block and
    /// advance the tip. Blocks the caller until a nonce is found.
    pub fn mine_block(&mut self, transactions: Vec<Transaction>) -> Result<Block> {
        let last = self.store.get(TIP_KEY)?.ok_or(LedgerError::NotFound)?;
        let template = BlockTemplate::new(transactions, last);
        let block = mine_template(template, &self.config)?;
        persist(&self.store, &block)?;
        self.tip = *block.hash();
        info!(
            hash = %hex::encode(block.hash()),
            nonce = block.nonce(),
            txs = block.transactions().len(),
            "appended block"
        );
        Ok(block)
    }

    /// Cursor from the current tip back to genesis. Blocks mined after this
    /// call are not visited.
    pub fn iter(&self) -> LedgerIter<'_, S> {
        LedgerIter {
            current_hash: Some(self.tip.to_vec()),
            current: None,
            store: &self.store,
        }
    }

    pub fn get_block(&self, hash: &[u8]) -> Result<Option<Block>> {
        self.store
            .get(hash)?
            .map(|bytes| Block::deserialize(&bytes))
            .transpose()
    }

    /// Number of blocks from tip to genesis.
    pub fn height(&self) -> Result<usize> {
        let mut count = 0;
        for block in self.iter() {
            block?;
            count += 1;
        }
        Ok(count)
    }

    pub fn validate_block(&self, block: &Block) -> bool {
        block.validate_pow(self.config.target_bits)
    }

    /// Printable summary of `block` checked against this ledger's difficulty.
    pub fn describe(&self, block: &Block) -> String {
        let valid = self.validate_block(block);
        if !valid {
            warn!(hash = %hex::encode(block.hash()), "block fails proof of work");
        }
        let mut out = String::new();
        write_summary(&mut out, block, valid).ok();
        out
    }

    /// Walk the whole chain checking linkage and proof of work. Returns the
    /// hash of the first offending block, if any.
    pub fn verify(&self) -> Result<Option<Hash>> {
        let mut expected = self.tip.to_vec();
        for block in self.iter() {
            let block = block?;
            if block.hash().as_slice() != expected.as_slice() || !self.validate_block(&block) {
                return Ok(Some(*block.hash()));
            }
            expected = block.prev_block_hash().to_vec();
        }
        Ok(None)
    }

    pub fn close(self) -> Result<()> {
        self.store.close()?;
        debug!("closed ledger");
        Ok(())
    }
}

fn mine_template(template: BlockTemplate, config: &LedgerConfig) -> Result<Block> {
    if config.parallel {
        template.mine_parallel(config.target_bits)
    } else {
        template.mine(config.target_bits)
    }
}

fn persist<S: ChainStore>(store: &S, block: &Block) -> Result<()> {
    let bytes = block.serialize()?;
    store.put_all(&[
        (block.hash().as_slice(), bytes.as_slice()),
        (TIP_KEY, block.hash().as_slice()),
    ])?;
    Ok(())
}

fn to_hash(raw: &[u8]) -> Result<Hash> {
    raw.try_into().map_err(|_| {
        LedgerError::Corrupt(format!(
            "tip pointer is {} bytes, expected {HASH_SIZE}",
            raw.len()
        ))
    })
}

/// Backward cursor over the stored chain. Strictly moves towards genesis and
/// is spent once genesis has been visited.
///
/// The chain is assumed well formed: every stored block links to an older one,
/// so the walk cannot cycle.
pub struct LedgerIter<'a, S: ChainStore> {
    current_hash: Option<Vec<u8>>,
    current: Option<Block>,
    store: &'a S,
}

impl<'a, S: ChainStore> LedgerIter<'a, S> {
    /// Load the block under the cursor into [`LedgerIter::current`] and step to
    /// its parent. Returns `true` for every loaded block, genesis included, and
    /// `false` once the cursor has moved past genesis. Use
    /// [`LedgerIter::has_next`] to ask whether more blocks remain.
    pub fn advance(&mut self) -> Result<bool> {
        self.current = self.load_next()?;
        Ok(self.current.is_some())
    }

    pub fn current(&self) -> Option<&Block> {
        self.current.as_ref()
    }

    /// Whether another block remains; `false` right after genesis was loaded.
    pub fn has_next(&self) -> bool {
        self.current_hash.is_some()
    }

    fn load_next(&mut self) -> Result<Option<Block>> {
        let Some(hash) = self.current_hash.take() else {
            return Ok(None);
        };
        let bytes = self
            .store
            .get(&hash)?
            .ok_or_else(|| LedgerError::MissingBlock(hex::encode(&hash)))?;
        let block = Block::deserialize(&bytes)?;
        if !block.is_genesis() {
            self.current_hash = Some(block.prev_block_hash().to_vec());
        }
        Ok(Some(block))
    }
}

impl<'a, S: ChainStore> Iterator for LedgerIter<'a, S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        self.load_next().transpose()
    }
}

/// Render every block from tip to genesis, including transaction ids.
pub fn print_chain<S: ChainStore>(ledger: &Ledger<S>) -> Result<String> {
    let mut out = String::new();
    let mut cursor = ledger.iter();
    while cursor.advance()? {
        if let Some(block) = cursor.current() {
            out.push_str(&ledger.describe(block));
            for tx in block.transactions() {
                let kind = if tx.is_coinbase() { "coinbase" } else { "transfer" };
                writeln!(out, "  tx {} ({kind})", tx.id_hex()).ok();
            }
            out.push('\n');
        }
    }
    Ok(out)
}
