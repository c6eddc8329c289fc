//! CLI commands for the ledger
//!
//! Implements all command handlers for the CLI interface.

use crate::config::ChainConfig;
use crate::core::{Amount, Blockchain};
use crate::storage::{SqliteStore, StorageConfig};
use crate::wallet::Wallet;
use chrono::{TimeZone, Utc};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub blockchain: Blockchain,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the database under `data_dir` and load (or create) the chain
    pub fn new(data_dir: PathBuf, config: ChainConfig) -> CliResult<Self> {
        let blockchain = open_blockchain(&data_dir, config)?;
        Ok(Self {
            blockchain,
            data_dir,
        })
    }
}

/// Open the SQLite-backed chain stored under `data_dir`
pub fn open_blockchain(data_dir: &Path, config: ChainConfig) -> CliResult<Blockchain> {
    let storage_config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };

    let store = SqliteStore::open(&storage_config)?;
    let blockchain = Blockchain::open(Box::new(store), config)?;
    Ok(blockchain)
}

fn abbreviate(s: &str, len: usize) -> &str {
    s.get(..len).unwrap_or(s)
}

/// Mine one or more blocks
pub fn cmd_mine(
    state: &mut AppState,
    address: &str,
    contribution: Option<&str>,
    reward: Option<Amount>,
    count: u32,
) -> CliResult<()> {
    let reward = reward.unwrap_or(state.blockchain.config().default_reward);

    println!("⛏️  Mining {} block(s) for address: {}", count, address);
    println!("   Current difficulty: {}", state.blockchain.difficulty());

    for _ in 0..count {
        let pending = state.blockchain.pending_transactions().len();
        let block = state
            .blockchain
            .mine(address, contribution.map(str::to_string), reward)?;

        println!("\n   Block {} mined!", state.blockchain.height());
        println!("   ├─ Hash: {}", abbreviate(&block.hash, 16));
        println!("   ├─ Transactions: {}", pending + 1);
        println!("   └─ Nonce: {}", block.nonce);
    }

    let balance = state.blockchain.balance_of(address);
    println!("\n💰 New balance for miner: {} coins", balance);

    Ok(())
}

/// Create a new wallet, optionally saving it to a file
pub fn cmd_wallet_new(save_to: Option<&Path>) -> CliResult<()> {
    let wallet = Wallet::new();

    println!("🔐 New wallet created!");
    println!("   📍 Address: {}", wallet.address());
    println!("   🔑 Private Key: {}", wallet.private_key());

    match save_to {
        Some(path) => {
            wallet.save(path)?;
            println!("\n   💾 Saved to {:?}", path);
        }
        None => {
            println!("\n   ⚠️  IMPORTANT: Store your private key somewhere safe.");
            println!("   It is the only way to spend your funds!");
        }
    }

    Ok(())
}

/// Restore a wallet from its private key and show its balance
pub fn cmd_wallet_load(state: &AppState, private_key: &str) -> CliResult<()> {
    let wallet = Wallet::from_private_key(private_key)?;

    println!("🔓 Wallet loaded");
    println!("   📍 Address: {}", wallet.address());
    println!("   💰 Balance: {} coins", wallet.balance(&state.blockchain));

    Ok(())
}

/// Get the balance of an address
pub fn cmd_balance(state: &AppState, address: &str) -> CliResult<()> {
    let balance = state.blockchain.balance_of(address);
    let utxos = state.blockchain.utxos_of(address);

    println!("💰 Balance for {}", address);
    println!("   Total: {} coins", balance);
    println!("   UTXOs: {}", utxos.len());

    if !utxos.is_empty() {
        println!("\n   Unspent outputs:");
        for utxo in utxos.iter().take(10) {
            println!("   └─ {} = {} coins", abbreviate(&utxo.tx_id, 16), utxo.amount);
        }
        if utxos.len() > 10 {
            println!("   ... and {} more", utxos.len() - 10);
        }
    }

    Ok(())
}

/// Send coins and mine them into a block right away.
///
/// Queued transactions are not persisted, so the transfer is sealed
/// before the process exits.
pub fn cmd_send(state: &mut AppState, private_key: &str, to: &str, amount: Amount) -> CliResult<()> {
    let wallet = Wallet::from_private_key(private_key)?;
    let from = wallet.address();

    let tx = wallet.create_transaction(to, amount, &state.blockchain)?;

    println!("📤 Transaction created:");
    println!("   ID: {}", tx.id);
    println!("   From: {}...", abbreviate(&from, 32));
    println!("   To: {}", to);
    println!("   Amount: {} coins", amount);

    state.blockchain.submit_transaction(tx)?;

    let reward = state.blockchain.config().default_reward;
    let block = state.blockchain.mine(&from, None, reward)?;

    println!("\n✅ Transaction mined in block {}", abbreviate(&block.hash, 16));
    println!("   New balance: {} coins", state.blockchain.balance_of(&from));

    Ok(())
}

/// Display chain info
pub fn cmd_chain_info(state: &AppState) -> CliResult<()> {
    let stats = state.blockchain.stats();

    println!("⛓️  Blockchain Info");
    println!("   ├─ Height: {}", stats.height);
    println!("   ├─ Total blocks: {}", stats.total_blocks);
    println!("   ├─ Total transactions: {}", stats.total_transactions);
    println!("   ├─ Total coins: {}", stats.total_supply);
    println!("   ├─ Difficulty: {}", stats.difficulty);
    println!("   └─ Latest hash: {}...", abbreviate(&stats.latest_hash, 32));

    Ok(())
}

/// List recent blocks
pub fn cmd_chain_blocks(state: &AppState, count: u32) -> CliResult<()> {
    let blocks = state.blockchain.blocks();
    let start = blocks.len().saturating_sub(count as usize);

    println!("🧱 Recent blocks:");
    for (index, block) in blocks.iter().enumerate().skip(start).rev() {
        let time = Utc
            .timestamp_millis_opt(block.timestamp)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| block.timestamp.to_string());

        println!(
            "   #{} | {} | {} tx | {}",
            index,
            abbreviate(&block.hash, 16),
            block.tx_count(),
            time
        );
        if let Some(contribution) = &block.contribution {
            println!("      └─ {}", contribution);
        }
    }

    Ok(())
}

/// Validate the chain
pub fn cmd_validate(state: &AppState) -> CliResult<()> {
    println!("🔍 Validating blockchain...");

    match state.blockchain.validate_chain_integrity() {
        Ok(()) => {
            println!("✅ Blockchain is valid!");
            println!("   {} blocks verified", state.blockchain.blocks().len());
        }
        Err(e) => {
            println!("❌ Blockchain validation FAILED!");
            println!("   {}", e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state(dir: &tempfile::TempDir, owner: &Wallet) -> AppState {
        let config = ChainConfig {
            difficulty: 1,
            ..ChainConfig::with_genesis_recipient(&owner.address())
        };
        AppState::new(dir.path().join("data"), config).unwrap()
    }

    #[test]
    fn test_send_persists_across_runs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let alice = Wallet::new();
        let bob = Wallet::new();

        {
            let mut state = test_state(&temp_dir, &alice);
            cmd_send(&mut state, &alice.private_key(), &bob.address(), 40).unwrap();
        }

        let state = test_state(&temp_dir, &alice);
        assert_eq!(state.blockchain.blocks().len(), 2);
        assert_eq!(state.blockchain.balance_of(&bob.address()), 40);
        assert_eq!(state.blockchain.balance_of(&alice.address()), 61);
        cmd_validate(&state).unwrap();
    }

    #[test]
    fn test_send_overspend_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let alice = Wallet::new();
        let mut state = test_state(&temp_dir, &alice);

        assert!(cmd_send(&mut state, &alice.private_key(), "bob", 500).is_err());
        assert_eq!(state.blockchain.blocks().len(), 1);
    }

    #[test]
    fn test_mine_multiple_blocks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = test_state(&temp_dir, &Wallet::new());

        cmd_mine(&mut state, "miner", Some("notes"), Some(5), 3).unwrap();
        assert_eq!(state.blockchain.height(), 3);
        assert_eq!(state.blockchain.balance_of("miner"), 15);
        cmd_chain_blocks(&state, 2).unwrap();
    }

    #[test]
    fn test_wallet_new_saves_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("wallet.json");
        cmd_wallet_new(Some(&path)).unwrap();
        assert!(Wallet::load(&path).is_ok());
    }
}
