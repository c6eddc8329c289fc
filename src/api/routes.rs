//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Chain endpoints
        .route("/api/blockchain", get(handlers::get_blockchain))
        .route("/api/blockchain/contribute", post(handlers::contribute))
        .route("/api/blockchain/validate", get(handlers::validate_chain))
        // Transactions
        .route("/api/transactions", post(handlers::submit_transaction))
        // Wallets
        .route("/api/wallet/create", post(handlers::create_wallet))
        .route("/api/wallet/load", post(handlers::load_wallet))
        .route("/api/wallet/send", post(handlers::send))
        .route(
            "/api/wallet/balance/{address}",
            get(handlers::get_balance),
        )
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::core::{Blockchain, Transaction};
    use crate::storage::MemoryStore;
    use crate::wallet::Wallet;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn test_server(owner: &Wallet) -> (TestServer, ApiState) {
        let config = ChainConfig {
            difficulty: 1,
            ..ChainConfig::with_genesis_recipient(&owner.address())
        };
        let chain = Blockchain::open(Box::new(MemoryStore::new()), config).unwrap();
        let state = ApiState::new(chain);
        let server = TestServer::new(create_router(state.clone())).unwrap();
        (server, state)
    }

    #[tokio::test]
    async fn test_health() {
        let (server, _) = test_server(&Wallet::new());
        let response = server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.text(), "OK");
    }

    #[tokio::test]
    async fn test_get_blockchain_returns_genesis() {
        let (server, _) = test_server(&Wallet::new());
        let response = server.get("/api/blockchain").await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        let blocks = body.as_array().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["previous_hash"], "0");
    }

    #[tokio::test]
    async fn test_send_mines_block() {
        let alice = Wallet::new();
        let bob = Wallet::new();
        let (server, state) = test_server(&alice);

        let response = server
            .post("/api/wallet/send")
            .json(&json!({
                "sender": alice.address(),
                "recipient": bob.address(),
                "amount": 30,
                "privateKey": alice.private_key(),
            }))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["block"]["transactions"].as_array().unwrap().len(), 2);

        let balance: Value = server
            .get(&format!("/api/wallet/balance/{}", bob.address()))
            .await
            .json();
        assert_eq!(balance["balance"], 30);

        // Sender also collects the default reward
        let chain = state.blockchain.lock().await;
        assert_eq!(chain.balance_of(&alice.address()), 71);
        assert_eq!(chain.blocks().len(), 2);
    }

    #[tokio::test]
    async fn test_send_with_foreign_key_rejected() {
        let alice = Wallet::new();
        let mallory = Wallet::new();
        let (server, state) = test_server(&alice);

        let response = server
            .post("/api/wallet/send")
            .json(&json!({
                "sender": alice.address(),
                "recipient": mallory.address(),
                "amount": 10,
                "privateKey": mallory.private_key(),
            }))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("does not belong"));
        assert_eq!(state.blockchain.lock().await.balance_of(&alice.address()), 100);
    }

    #[tokio::test]
    async fn test_overspend_rejected() {
        let alice = Wallet::new();
        let (server, state) = test_server(&alice);

        let response = server
            .post("/api/wallet/send")
            .json(&json!({
                "sender": alice.address(),
                "recipient": "bob",
                "amount": 150,
                "privateKey": alice.private_key(),
            }))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(state.blockchain.lock().await.blocks().len(), 1);
    }

    #[tokio::test]
    async fn test_contribute_uses_default_reward() {
        let (server, _) = test_server(&Wallet::new());
        let response = server
            .post("/api/blockchain/contribute")
            .json(&json!({ "minerAddress": "miner", "contribution": "docs" }))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["block"]["contribution"], "docs");

        let balance: Value = server.get("/api/wallet/balance/miner").await.json();
        assert_eq!(balance["balance"], 1);
    }

    #[tokio::test]
    async fn test_submit_transaction_and_validate() {
        let alice = Wallet::new();
        let (server, state) = test_server(&alice);

        let tx: Transaction = {
            let chain = state.blockchain.lock().await;
            alice.create_transaction("bob", 25, &chain).unwrap()
        };

        let response = server.post("/api/transactions").json(&tx).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["transactionId"], tx.id);

        // Replaying the same transaction is rejected
        let response = server.post("/api/transactions").json(&tx).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let body: Value = server.get("/api/blockchain/validate").await.json();
        assert_eq!(body["valid"], true);
        assert_eq!(body["blocksChecked"], 1);
    }

    #[tokio::test]
    async fn test_submit_with_rewritten_id_rejected() {
        let alice = Wallet::new();
        let bob = Wallet::new();
        let (server, state) = test_server(&alice);

        let response = server
            .post("/api/wallet/send")
            .json(&json!({
                "sender": alice.address(),
                "recipient": bob.address(),
                "amount": 30,
                "privateKey": alice.private_key(),
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        // Copy the sealed transfer out of the published chain
        let chain: Value = server.get("/api/blockchain").await.json();
        let mut replay = chain[1]["transactions"][0].clone();
        replay["id"] = json!("deadbeef");

        let response = server.post("/api/transactions").json(&replay).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("does not match"));

        let chain = state.blockchain.lock().await;
        assert_eq!(chain.balance_of(&bob.address()), 30);
        assert!(chain.pending_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_wallet_create_and_load() {
        let (server, _) = test_server(&Wallet::new());

        let response = server.post("/api/wallet/create").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let created: Value = response.json();

        let response = server
            .post("/api/wallet/load")
            .json(&json!({ "privateKey": created["privateKey"] }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let loaded: Value = response.json();
        assert_eq!(loaded["publicKey"], created["publicKey"]);
        assert_eq!(loaded["balance"], 0);

        let response = server
            .post("/api/wallet/load")
            .json(&json!({ "privateKey": "zz" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }
}
