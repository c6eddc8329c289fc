//! End-to-end ledger scenarios against an on-disk SQLite database

use action_chain::config::ChainConfig;
use action_chain::core::{Blockchain, BlockchainError, ChainState};
use action_chain::storage::{SqliteStore, StorageConfig};
use action_chain::wallet::Wallet;
use tempfile::TempDir;

fn storage_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    }
}

fn chain_config(owner: &Wallet) -> ChainConfig {
    ChainConfig::with_genesis_recipient(&owner.address())
}

fn open(dir: &TempDir, owner: &Wallet) -> Result<Blockchain, BlockchainError> {
    let store = SqliteStore::open(&storage_config(dir)).unwrap();
    Blockchain::open(Box::new(store), chain_config(owner))
}

#[test]
fn test_transfer_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let miner = Wallet::new();

    {
        let mut chain = open(&dir, &alice).unwrap();
        let genesis = &chain.blocks()[0];
        assert!(genesis.hash.starts_with("00"));

        let tx = alice.create_transaction(&bob.address(), 30, &chain).unwrap();
        chain.submit_transaction(tx).unwrap();
        chain.mine(&miner.address(), Some("first transfer".to_string()), 1).unwrap();

        assert_eq!(chain.balance_of(&alice.address()), 70);
        assert_eq!(chain.balance_of(&bob.address()), 30);
    }

    let chain = open(&dir, &alice).unwrap();
    assert_eq!(chain.state(), ChainState::Ready);
    assert_eq!(chain.blocks().len(), 2);
    assert_eq!(chain.blocks()[1].previous_hash, chain.blocks()[0].hash);
    assert_eq!(chain.balance_of(&alice.address()), 70);
    assert_eq!(chain.balance_of(&bob.address()), 30);
    assert_eq!(chain.balance_of(&miner.address()), 1);
    assert_eq!(chain.ledger().total_supply(), 101);
    assert!(chain.validate_chain_integrity().is_ok());
}

#[test]
fn test_overspend_leaves_everything_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let alice = Wallet::new();
    let bob = Wallet::new();

    let mut chain = open(&dir, &alice).unwrap();
    assert!(matches!(
        alice.create_transaction(&bob.address(), 150, &chain),
        Err(BlockchainError::InsufficientFunds { have: 100, need: 150, .. })
    ));

    // A hand-built overspend is refused at admission too
    let inputs = chain.utxos_of(&alice.address()).to_vec();
    let mut tx = action_chain::core::Transaction::transfer(&alice.address(), &bob.address(), 150, inputs);
    tx.sign(alice.key_pair()).unwrap();
    assert!(matches!(
        chain.submit_transaction(tx),
        Err(BlockchainError::InsufficientFunds { .. })
    ));
    drop(chain);

    let chain = open(&dir, &alice).unwrap();
    assert_eq!(chain.blocks().len(), 1);
    assert_eq!(chain.balance_of(&alice.address()), 100);
    assert_eq!(chain.balance_of(&bob.address()), 0);
}

#[test]
fn test_edited_hash_fails_reload() {
    let dir = tempfile::tempdir().unwrap();
    let alice = Wallet::new();

    {
        let mut chain = open(&dir, &alice).unwrap();
        chain.mine(&alice.address(), None, 1).unwrap();
        chain.mine(&alice.address(), None, 1).unwrap();
        chain.mine(&alice.address(), None, 1).unwrap();
    }

    // Row 3 holds block index 2
    let store = SqliteStore::open(&storage_config(&dir)).unwrap();
    store.overwrite_block_hash(3, &"0".repeat(64)).unwrap();
    drop(store);

    let err = open(&dir, &alice).unwrap_err();
    match err {
        BlockchainError::ChainCorruption { index, .. } => assert_eq!(index, 2),
        other => panic!("expected chain corruption, got {:?}", other),
    }
}
