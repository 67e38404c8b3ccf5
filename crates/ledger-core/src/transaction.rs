use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::{ChainStore, Ledger};
use crate::codec::{put_bytes, sha256};
use crate::error::{LedgerError, Result};
use crate::Hash;

/// A spendable amount locked to an address.
///
/// There is no script or signature scheme: the lock is the address string
/// itself and unlocking is plain string equality.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub unlock_key: String,
}

impl TxOutput {
    pub fn new(value: u64, address: &str) -> Self {
        Self {
            value,
            unlock_key: address.to_string(),
        }
    }

    pub fn can_be_unlocked_with(&self, address: &str) -> bool {
        self.unlock_key == address
    }
}

/// Reference to an output of an earlier transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Id of the transaction holding the spent output; empty for coinbase.
    pub txid: Vec<u8>,
    /// Index of the spent output; `None` for coinbase.
    pub vout: Option<usize>,
    /// The spender's address, or free-form data for coinbase.
    pub unlock_proof: String,
}

impl TxInput {
    pub fn can_unlock_output_with(&self, address: &str) -> bool {
        self.unlock_proof == address
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// SHA-256 over the inputs and outputs; never part of its own preimage.
    pub id: Hash,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            id: [0u8; 32],
            inputs,
            outputs,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// Mint `subsidy` coins to `to`. An empty `data` becomes `Reward to "<to>"`.
    pub fn new_coinbase_with_subsidy(to: &str, data: &str, subsidy: u64) -> Self {
        let data = if data.is_empty() {
            format!("Reward to {to:?}")
        } else {
            data.to_string()
        };
        let input = TxInput {
            txid: Vec::new(),
            vout: None,
            unlock_proof: data,
        };
        Self::new(vec![input], vec![TxOutput::new(subsidy, to)])
    }

    pub fn new_coinbase(to: &str, data: &str) -> Self {
        Self::new_coinbase_with_subsidy(to, data, crate::constants::SUBSIDY)
    }

    /// Build a transfer of `amount` from `from` to `to`, funded by the first
    /// unspent outputs of `from` that cover it. Change goes back to `from`.
    pub fn new_transfer<S: ChainStore>(
        from: &str,
        to: &str,
        amount: u64,
        ledger: &Ledger<S>,
    ) -> Result<Self> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let (accumulated, selection) = ledger.find_spendable_outputs(from, amount)?;
        if accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                address: from.to_string(),
                available: accumulated,
                requested: amount,
            });
        }

        let inputs = selection
            .into_iter()
            .map(|(txid_hex, vout)| {
                let txid = hex::decode(&txid_hex).map_err(|e| {
                    LedgerError::Corrupt(format!("transaction id {txid_hex:?}: {e}"))
                })?;
                Ok(TxInput {
                    txid,
                    vout: Some(vout),
                    unlock_proof: from.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut outputs = vec![TxOutput::new(amount, to)];
        if accumulated > amount {
            outputs.push(TxOutput::new(accumulated - amount, from));
        }

        let tx = Self::new(inputs, outputs);
        debug!(
            id = %hex::encode(tx.id),
            inputs = tx.inputs.len(),
            change = accumulated - amount,
            "built transfer"
        );
        Ok(tx)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].txid.is_empty()
    }

    pub fn id_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Length-prefixed encoding of inputs then outputs, in order.
    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.inputs.len() as u64).to_be_bytes());
        for input in &self.inputs {
            put_bytes(&mut bytes, &input.txid);
            // u64::MAX never names a real output, so it stands in for "no output".
            let vout = input.vout.map_or(u64::MAX, |v| v as u64);
            bytes.extend_from_slice(&vout.to_be_bytes());
            put_bytes(&mut bytes, input.unlock_proof.as_bytes());
        }
        bytes.extend_from_slice(&(self.outputs.len() as u64).to_be_bytes());
        for output in &self.outputs {
            bytes.extend_from_slice(&output.value.to_be_bytes());
            put_bytes(&mut bytes, output.unlock_key.as_bytes());
        }
        bytes
    }

    pub fn compute_id(&self) -> Hash {
        sha256(&self.hash_bytes())
    }
}
