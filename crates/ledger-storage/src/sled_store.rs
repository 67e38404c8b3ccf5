use anyhow::{anyhow, Context, Result};
use ledger_core::ChainStore;
use sled::transaction::TransactionResult;
use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, info};

pub const TREE_BLOCKS: &str = "blocks";

/// `ChainStore` over a single sled tree. Blocks and the tip pointer share the
/// `blocks` tree so one sled transaction can cover both.
#[derive(Clone)]
pub struct SledStore {
  db: Db,
  blocks: Tree,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let db = sled::open(path).with_context(|| format!("opening sled store at {}", path.display()))?;
    let blocks = db.open_tree(TREE_BLOCKS).context("opening blocks tree")?;
    info!(path = %path.display(), "sled store opened");
    Ok(Self { db, blocks })
  }

  /// Remove every entry, tip included.
  pub fn clear(&self) -> Result<()> {
    self.blocks.clear()?;
    self.db.flush()?;
    Ok(())
  }
}

impl ChainStore for SledStore {
  fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
    let value = self.blocks.get(key).context("reading from blocks tree")?;
    Ok(value.map(|ivec| ivec.to_vec()))
  }

  fn put_all(&self, entries: &[(&[u8], &[u8])]) -> Result<()> {
    let result: TransactionResult<(), ()> = self.blocks.transaction(|tx| {
      for (key, value) in entries {
        tx.insert(*key, *value)?;
      }
      Ok(())
    });
    result.map_err(|e| anyhow!("blocks transaction failed: {e:?}"))?;

    self.db.flush().context("flushing sled store")?;
    debug!(entries = entries.len(), "committed batch");
    Ok(())
  }

  fn close(&self) -> Result<()> {
    self.db.flush().context("flushing sled store")?;
    info!("sled store closed");
    Ok(())
  }
}
