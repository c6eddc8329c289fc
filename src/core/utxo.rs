//! Unspent output accounting
//!
//! The ledger maps each address to the ordered list of outputs it owns.
//! Spending selects a greedy prefix of that list, so selection (and the
//! resulting change output) depends on insertion order.

use crate::core::transaction::Transaction;
use crate::core::Amount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Suffix marking a change output derived from a spending transaction
pub const CHANGE_SUFFIX: &str = "-change";

/// Ledger errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds for {address}: have {have}, need {need}")]
    InsufficientFunds {
        address: String,
        have: Amount,
        need: Amount,
    },
    #[error("Coinbase transactions do not spend outputs")]
    CoinbaseSpend,
    #[error("Crediting {amount} would overflow the total supply of {supply}")]
    SupplyOverflow { supply: Amount, amount: Amount },
}

/// Sum amounts; the ledger never holds more than `Amount::MAX` in total
fn sum_amounts<'a>(utxos: impl Iterator<Item = &'a Utxo>) -> Amount {
    utxos.fold(0, |acc: Amount, u| acc.saturating_add(u.amount))
}

/// Unspent Transaction Output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Utxo {
    /// ID of the transaction that produced this output
    pub tx_id: String,
    pub owner: String,
    pub amount: Amount,
}

impl Utxo {
    pub fn new(tx_id: &str, owner: &str, amount: Amount) -> Self {
        Self {
            tx_id: tx_id.to_string(),
            owner: owner.to_string(),
            amount,
        }
    }
}

/// Entries removed and created by a single spend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpendOutcome {
    pub spent: Vec<Utxo>,
    pub created: Vec<Utxo>,
}

impl SpendOutcome {
    /// The change output returned to the spender, if any
    pub fn change(&self) -> Option<&Utxo> {
        self.created
            .iter()
            .find(|utxo| utxo.tx_id.ends_with(CHANGE_SUFFIX))
    }
}

/// Address-indexed set of unspent outputs
#[derive(Debug, Clone, Default)]
pub struct UtxoLedger {
    by_owner: HashMap<String, Vec<Utxo>>,
}

impl UtxoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted entries, keeping their order
    pub fn from_entries(entries: impl IntoIterator<Item = Utxo>) -> Self {
        let mut ledger = Self::new();
        for utxo in entries {
            ledger.push(utxo);
        }
        ledger
    }

    fn push(&mut self, utxo: Utxo) {
        self.by_owner
            .entry(utxo.owner.clone())
            .or_default()
            .push(utxo);
    }

    /// Sum of all outputs owned by `address`
    pub fn balance(&self, address: &str) -> Amount {
        sum_amounts(self.utxos_of(address).iter())
    }

    pub fn can_afford(&self, address: &str, amount: Amount) -> bool {
        self.balance(address) >= amount
    }

    /// Outputs owned by `address`, in selection order
    pub fn utxos_of(&self, address: &str) -> &[Utxo] {
        self.by_owner
            .get(address)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every entry in the ledger.
    ///
    /// Addresses come out in no particular order; each address's outputs
    /// keep their selection order.
    pub fn entries(&self) -> impl Iterator<Item = &Utxo> {
        self.by_owner.values().flatten()
    }

    /// Sum of every balance
    pub fn total_supply(&self) -> Amount {
        sum_amounts(self.entries())
    }

    /// Number of addresses holding at least one output
    pub fn holder_count(&self) -> usize {
        self.by_owner.values().filter(|v| !v.is_empty()).count()
    }

    /// Move `tx.amount` from the sender to the recipient.
    ///
    /// Selects the shortest prefix of the sender's outputs that covers the
    /// amount, removes it, credits the recipient under `tx.id` and returns
    /// any excess to the sender under `"{tx.id}-change"`. On error the
    /// ledger is left untouched.
    pub fn apply_spend(&mut self, tx: &Transaction) -> Result<SpendOutcome, LedgerError> {
        let sender = tx.sender().ok_or(LedgerError::CoinbaseSpend)?;

        let have = self.balance(sender);
        if have < tx.amount {
            return Err(LedgerError::InsufficientFunds {
                address: sender.to_string(),
                have,
                need: tx.amount,
            });
        }

        let owned = self.by_owner.entry(sender.to_string()).or_default();

        let mut selected = 0usize;
        let mut accumulated: Amount = 0;
        for utxo in owned.iter() {
            if accumulated >= tx.amount {
                break;
            }
            accumulated = accumulated.saturating_add(utxo.amount);
            selected += 1;
        }

        let spent: Vec<Utxo> = owned.drain(..selected).collect();
        let change = accumulated - tx.amount;

        let mut created = vec![Utxo::new(&tx.id, &tx.recipient, tx.amount)];
        if change > 0 {
            created.push(Utxo::new(
                &format!("{}{}", tx.id, CHANGE_SUFFIX),
                sender,
                change,
            ));
        }

        for utxo in &created {
            self.push(utxo.clone());
        }

        Ok(SpendOutcome { spent, created })
    }

    /// Whether `amount` can be issued without overflowing the total supply
    pub fn can_credit(&self, amount: Amount) -> Result<(), LedgerError> {
        let supply = self.total_supply();
        match supply.checked_add(amount) {
            Some(_) => Ok(()),
            None => Err(LedgerError::SupplyOverflow { supply, amount }),
        }
    }

    /// Credit `address` without any funding check (rewards and genesis).
    /// Fails only if the new output would overflow the total supply.
    pub fn credit_unconditional(
        &mut self,
        address: &str,
        source_id: &str,
        amount: Amount,
    ) -> Result<Utxo, LedgerError> {
        self.can_credit(amount)?;
        let utxo = Utxo::new(source_id, address, amount);
        self.push(utxo.clone());
        Ok(utxo)
    }
}
