//! Balance and coin selection by scanning the chain from tip to genesis.
//!
//! Spends always live in blocks newer than the outputs they consume, so one
//! newest-first pass sees every spend before the output it suppresses. The
//! spent set is local to a single scan.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::chain::{ChainStore, Ledger};
use crate::error::Result;
use crate::transaction::{Transaction, TxOutput};

/// A transaction together with the indices of its outputs that the scanned
/// address can still spend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnspentTx {
    pub tx: Transaction,
    pub outputs: Vec<usize>,
}

impl UnspentTx {
    pub fn value(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |acc, &i| acc.saturating_add(self.tx.outputs[i].value))
    }
}

/// `(transaction id as hex, output index)` pairs picked to fund a transfer,
/// in the order they were picked.
pub type Selection = Vec<(String, usize)>;

impl<S: ChainStore> Ledger<S> {
    /// Transactions holding at least one output `address` can still spend,
    /// newest first. Each transaction appears once.
    pub fn find_unspent(&self, address: &str) -> Result<Vec<UnspentTx>> {
        let mut spent: HashMap<String, HashSet<usize>> = HashMap::new();
        let mut unspent = Vec::new();
        let mut blocks = 0usize;

        for block in self.iter() {
            let block = block?;
            blocks += 1;
            for tx in block.transactions() {
                let txid = tx.id_hex();
                let spent_here = spent.get(&txid);
                let outputs: Vec<usize> = tx
                    .outputs
                    .iter()
                    .enumerate()
                    .filter(|&(idx, out)| {
                        !spent_here.is_some_and(|s| s.contains(&idx))
                            && out.can_be_unlocked_with(address)
                    })
                    .map(|(idx, _)| idx)
                    .collect();
                if !outputs.is_empty() {
                    unspent.push(UnspentTx {
                        tx: tx.clone(),
                        outputs,
                    });
                }

                if tx.is_coinbase() {
                    continue;
                }
                for input in &tx.inputs {
                    if !input.can_unlock_output_with(address) {
                        continue;
                    }
                    if let Some(vout) = input.vout {
                        spent
                            .entry(hex::encode(&input.txid))
                            .or_default()
                            .insert(vout);
                    }
                }
            }
        }

        debug!(address, blocks, unspent = unspent.len(), "scanned chain");
        Ok(unspent)
    }

    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .find_unspent(address)?
            .into_iter()
            .map(|entry| entry.tx)
            .collect())
    }

    /// Every unspent output locked to `address`.
    pub fn find_utxo(&self, address: &str) -> Result<Vec<TxOutput>> {
        Ok(self
            .find_unspent(address)?
            .into_iter()
            .flat_map(|entry| {
                let UnspentTx { tx, outputs } = entry;
                outputs.into_iter().map(move |i| tx.outputs[i].clone())
            })
            .collect())
    }

    /// Sum of unspent outputs, saturating at `u64::MAX` like coin selection.
    pub fn balance(&self, address: &str) -> Result<u64> {
        Ok(self
            .find_utxo(address)?
            .iter()
            .fold(0u64, |acc, out| acc.saturating_add(out.value)))
    }

    /// Greedy first-fit: take unspent outputs in scan order until their sum
    /// reaches `amount`. The caller must check the returned total, which is
    /// below `amount` when funds are insufficient.
    pub fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<(u64, Selection)> {
        let mut accumulated = 0u64;
        let mut selection = Selection::new();

        'scan: for entry in self.find_unspent(address)? {
            let txid = entry.tx.id_hex();
            for idx in entry.outputs {
                if accumulated >= amount {
                    break 'scan;
                }
                accumulated = accumulated.saturating_add(entry.tx.outputs[idx].value);
                selection.push((txid.clone(), idx));
            }
        }

        Ok((accumulated, selection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::error::LedgerError;
    use crate::store::MemoryStore;

    fn ledger_for(address: &str) -> Ledger<MemoryStore> {
        let config = LedgerConfig::default().with_target_bits(8);
        Ledger::create(MemoryStore::new(), address, config).unwrap()
    }

    fn send(ledger: &mut Ledger<MemoryStore>, from: &str, to: &str, amount: u64) {
        let tx = Transaction::new_transfer(from, to, amount, ledger).unwrap();
        ledger.mine_block(vec![tx]).unwrap();
    }

    #[test]
    fn genesis_balance() {
        let ledger = ledger_for("alice");
        assert_eq!(ledger.balance("alice").unwrap(), 10);
        assert_eq!(ledger.balance("bob").unwrap(), 0);
        assert_eq!(ledger.find_utxo("alice").unwrap(), vec![TxOutput::new(10, "alice")]);
    }

    #[test]
    fn send_example() {
        let mut ledger = ledger_for("A");
        send(&mut ledger, "A", "B", 4);

        assert_eq!(ledger.balance("A").unwrap(), 6);
        assert_eq!(ledger.balance("B").unwrap(), 4);
        assert_eq!(ledger.height().unwrap(), 2);
        for block in ledger.iter() {
            assert!(ledger.validate_block(&block.unwrap()));
        }
    }

    #[test]
    fn transfer_conserves_value() {
        let mut ledger = ledger_for("A");
        send(&mut ledger, "A", "B", 7);
        send(&mut ledger, "B", "C", 3);
        send(&mut ledger, "A", "C", 3);
        let total: u64 = ["A", "B", "C"]
            .iter()
            .map(|addr| ledger.balance(addr).unwrap())
            .sum();
        assert_eq!(total, 10);
        assert_eq!(ledger.balance("A").unwrap(), 0);
        assert_eq!(ledger.balance("B").unwrap(), 4);
        assert_eq!(ledger.balance("C").unwrap(), 6);
    }

    #[test]
    fn spent_output_is_suppressed() {
        let mut ledger = ledger_for("A");
        let genesis_tx = ledger.find_unspent_transactions("A").unwrap()[0].clone();
        send(&mut ledger, "A", "B", 4);

        let unspent = ledger.find_unspent_transactions("A").unwrap();
        assert!(unspent.iter().all(|tx| tx.id != genesis_tx.id));
        assert_eq!(unspent.len(), 1);
        assert_eq!(unspent[0].outputs[1], TxOutput::new(6, "A"));
    }

    #[test]
    fn exact_amount_leaves_no_change() {
        let mut ledger = ledger_for("A");
        send(&mut ledger, "A", "B", 10);
        assert_eq!(ledger.balance("A").unwrap(), 0);
        assert!(ledger.find_unspent("A").unwrap().is_empty());

        let last = ledger.iter().next().unwrap().unwrap();
        assert_eq!(last.transactions()[0].outputs, vec![TxOutput::new(10, "B")]);
    }

    #[test]
    fn transfer_shape() {
        let ledger = ledger_for("A");
        let tx = Transaction::new_transfer("A", "B", 4, &ledger).unwrap();
        let genesis_tx = &ledger.find_unspent_transactions("A").unwrap()[0];

        assert!(!tx.is_coinbase());
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].txid, genesis_tx.id.to_vec());
        assert_eq!(tx.inputs[0].vout, Some(0));
        assert_eq!(tx.inputs[0].unlock_proof, "A");
        assert_eq!(tx.outputs, vec![TxOutput::new(4, "B"), TxOutput::new(6, "A")]);
        assert_eq!(tx.id, tx.compute_id());
    }

    #[test]
    fn insufficient_funds_leaves_ledger_untouched() {
        let mut ledger = ledger_for("A");
        send(&mut ledger, "A", "B", 4);
        let tip = *ledger.tip();
        let entries = ledger.store().len();

        let err = Transaction::new_transfer("A", "B", 7, &ledger).unwrap_err();
        match err {
            LedgerError::InsufficientFunds {
                address,
                available,
                requested,
            } => {
                assert_eq!(address, "A");
                assert_eq!(available, 6);
                assert_eq!(requested, 7);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*ledger.tip(), tip);
        assert_eq!(ledger.store().len(), entries);
        assert_eq!(ledger.height().unwrap(), 2);
    }

    #[test]
    fn unknown_sender_has_no_funds() {
        let ledger = ledger_for("A");
        let err = Transaction::new_transfer("nobody", "A", 1, &ledger).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { available: 0, .. }));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let ledger = ledger_for("A");
        let err = Transaction::new_transfer("A", "B", 0, &ledger).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount));
    }

    #[test]
    fn selection_is_greedy_in_scan_order() {
        let mut ledger = ledger_for("A");
        // A second coinbase makes two separate 10-coin outputs for A.
        let bonus = ledger
            .mine_block(vec![Transaction::new_coinbase("A", "bonus")])
            .unwrap();
        let bonus_id = bonus.transactions()[0].id_hex();
        let genesis_id = ledger.find_unspent("A").unwrap()[1].tx.id_hex();

        let (total, picked) = ledger.find_spendable_outputs("A", 5).unwrap();
        assert_eq!(total, 10);
        assert_eq!(picked, vec![(bonus_id.clone(), 0)]);

        let (total, picked) = ledger.find_spendable_outputs("A", 15).unwrap();
        assert_eq!(total, 20);
        assert_eq!(picked, vec![(bonus_id.clone(), 0), (genesis_id, 0)]);

        let (total, picked) = ledger.find_spendable_outputs("A", 25).unwrap();
        assert_eq!(total, 20);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn self_transfer_keeps_both_outputs() {
        let mut ledger = ledger_for("A");
        send(&mut ledger, "A", "A", 4);

        let unspent = ledger.find_unspent("A").unwrap();
        assert_eq!(unspent.len(), 1);
        assert_eq!(unspent[0].outputs, vec![0, 1]);
        assert_eq!(unspent[0].value(), 10);
        assert_eq!(ledger.balance("A").unwrap(), 10);

        send(&mut ledger, "A", "B", 7);
        assert_eq!(ledger.balance("A").unwrap(), 3);
        assert_eq!(ledger.balance("B").unwrap(), 7);
    }

    #[test]
    fn partially_spent_transaction_counts_only_unspent_outputs() {
        let mut ledger = ledger_for("A");
        // Outputs: [A 4, A 6]; spending 3 consumes only the first one.
        send(&mut ledger, "A", "A", 4);
        send(&mut ledger, "A", "B", 3);

        let unspent = ledger.find_unspent("A").unwrap();
        let values: Vec<u64> = unspent.iter().map(UnspentTx::value).collect();
        assert_eq!(values, vec![1, 6]);
        assert_eq!(ledger.balance("A").unwrap(), 7);
        assert_eq!(ledger.balance("B").unwrap(), 3);
    }

    #[test]
    fn oversized_outputs_saturate() {
        let mut ledger = ledger_for("A");
        let huge = Transaction::new_coinbase_with_subsidy("A", "huge", u64::MAX);
        ledger.mine_block(vec![huge]).unwrap();

        assert_eq!(ledger.balance("A").unwrap(), u64::MAX);
        let (total, picked) = ledger.find_spendable_outputs("A", u64::MAX).unwrap();
        assert_eq!(total, u64::MAX);
        assert_eq!(picked.len(), 1);

        let all: u64 = ledger
            .find_unspent("A")
            .unwrap()
            .iter()
            .fold(0u64, |acc, entry| acc.saturating_add(entry.value()));
        assert_eq!(all, u64::MAX);
    }
}
