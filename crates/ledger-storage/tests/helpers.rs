#![allow(dead_code)]

use std::fs;

use ledger_core::{Ledger, LedgerConfig};
use ledger_storage::SledStore;
use tempfile::{tempdir, TempDir};

/// Low difficulty so integration tests mine in milliseconds.
pub const TEST_BITS: u32 = 8;

pub fn test_config() -> LedgerConfig {
    LedgerConfig::default().with_target_bits(TEST_BITS)
}

pub fn create_temp_store() -> (TempDir, SledStore) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let store = SledStore::open(temp_dir.path()).expect("Failed to open SledStore");
    (temp_dir, store)
}

pub fn create_temp_ledger(address: &str) -> (TempDir, Ledger<SledStore>) {
    let (temp_dir, store) = create_temp_store();
    let ledger = Ledger::create(store, address, test_config()).expect("Failed to create ledger");
    (temp_dir, ledger)
}

pub fn reopen_ledger(temp_dir: &TempDir) -> Ledger<SledStore> {
    let store = SledStore::open(temp_dir.path()).expect("Failed to reopen SledStore");
    Ledger::open(store, test_config()).expect("Failed to open ledger")
}

pub fn send(ledger: &mut Ledger<SledStore>, from: &str, to: &str, amount: u64) {
    let tx = ledger_core::Transaction::new_transfer(from, to, amount, ledger)
        .expect("Failed to build transfer");
    ledger.mine_block(vec![tx]).expect("Failed to mine block");
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    // Verify the directory is removed
    assert!(!db_path.exists(), "Database directory should be removed");
}
