//! REST API handlers for ledger operations

use crate::core::{Amount, Block, Blockchain, BlockchainError, Transaction};
use crate::wallet::Wallet;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub blockchain: Arc<Mutex<Blockchain>>,
}

impl ApiState {
    pub fn new(blockchain: Blockchain) -> Self {
        Self {
            blockchain: Arc::new(Mutex::new(blockchain)),
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResponse {
    pub message: String,
    pub block: Block,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedWalletResponse {
    pub private_key: String,
    pub public_key: String,
    pub balance: Amount,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub balance: Amount,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub transaction_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub valid: bool,
    pub blocks_checked: usize,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributeRequest {
    pub miner_address: String,
    pub contribution: Option<String>,
    pub reward: Option<Amount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadWalletRequest {
    pub private_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: Amount,
    pub private_key: String,
}

// ============================================================================
// Error mapping
// ============================================================================

fn api_error(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.into(),
        }),
    )
}

fn chain_error(err: BlockchainError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        BlockchainError::InvalidTransaction(_)
        | BlockchainError::InsufficientFunds { .. }
        | BlockchainError::Transaction(_) => StatusCode::BAD_REQUEST,
        BlockchainError::NotReady(_) | BlockchainError::InitializationFailure(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        BlockchainError::InvalidBlock(_) | BlockchainError::ChainCorruption { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, err.to_string())
}

/// Run a ledger operation on the blocking pool; mining holds the lock
/// for the whole proof-of-work search
async fn with_chain_blocking<T, F>(state: &ApiState, op: F) -> Result<T, (StatusCode, Json<ApiError>)>
where
    T: Send + 'static,
    F: FnOnce(&mut Blockchain) -> Result<T, BlockchainError> + Send + 'static,
{
    let blockchain = state.blockchain.clone();
    tokio::task::spawn_blocking(move || {
        let mut chain = blockchain.blocking_lock();
        op(&mut chain)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Task failed: {}", e)))?
    .map_err(chain_error)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blockchain - The full chain
pub async fn get_blockchain(State(state): State<ApiState>) -> Json<Vec<Block>> {
    let chain = state.blockchain.lock().await;
    Json(chain.blocks().to_vec())
}

/// POST /api/blockchain/contribute - Mine pending transactions
pub async fn contribute(
    State(state): State<ApiState>,
    Json(req): Json<ContributeRequest>,
) -> ApiResult<BlockResponse> {
    let block = with_chain_blocking(&state, move |chain| {
        let reward = req.reward.unwrap_or(chain.config().default_reward);
        chain.mine(&req.miner_address, req.contribution, reward)
    })
    .await?;

    Ok(Json(BlockResponse {
        message: "Block mined successfully".to_string(),
        block,
    }))
}

/// GET /api/blockchain/validate - Check chain integrity
pub async fn validate_chain(State(state): State<ApiState>) -> Json<ValidationResponse> {
    let chain = state.blockchain.lock().await;
    let block_count = chain.blocks().len();

    match chain.validate_chain_integrity() {
        Ok(()) => Json(ValidationResponse {
            valid: true,
            blocks_checked: block_count,
            message: format!("Blockchain is valid ({} blocks verified)", block_count),
        }),
        Err(e) => Json(ValidationResponse {
            valid: false,
            blocks_checked: block_count,
            message: e.to_string(),
        }),
    }
}

/// POST /api/transactions - Submit a signed transaction
pub async fn submit_transaction(
    State(state): State<ApiState>,
    Json(tx): Json<Transaction>,
) -> ApiResult<SubmitResponse> {
    let transaction_id = tx.id.clone();
    let mut chain = state.blockchain.lock().await;
    chain.submit_transaction(tx).map_err(chain_error)?;

    Ok(Json(SubmitResponse {
        message: "Transaction accepted".to_string(),
        transaction_id,
    }))
}

/// POST /api/wallet/create - Generate a key pair
pub async fn create_wallet() -> Json<WalletResponse> {
    let wallet = Wallet::new();
    Json(WalletResponse {
        private_key: wallet.private_key(),
        public_key: wallet.public_key(),
    })
}

/// POST /api/wallet/load - Restore a key pair and report its balance
pub async fn load_wallet(
    State(state): State<ApiState>,
    Json(req): Json<LoadWalletRequest>,
) -> ApiResult<LoadedWalletResponse> {
    let wallet = Wallet::from_private_key(&req.private_key)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let chain = state.blockchain.lock().await;

    Ok(Json(LoadedWalletResponse {
        private_key: wallet.private_key(),
        public_key: wallet.public_key(),
        balance: wallet.balance(&chain),
    }))
}

/// POST /api/wallet/send - Sign, submit and mine a transfer
pub async fn send(
    State(state): State<ApiState>,
    Json(req): Json<SendRequest>,
) -> ApiResult<BlockResponse> {
    let wallet = Wallet::from_private_key(&req.private_key)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let block = with_chain_blocking(&state, move |chain| {
        let inputs = chain.utxos_of(&req.sender).to_vec();
        let mut tx = Transaction::transfer(&req.sender, &req.recipient, req.amount, inputs);
        tx.sign(wallet.key_pair())?;
        chain.submit_transaction(tx)?;

        let reward = chain.config().default_reward;
        chain.mine(&req.sender, None, reward)
    })
    .await?;

    Ok(Json(BlockResponse {
        message: "Transaction sent and block mined".to_string(),
        block,
    }))
}

/// GET /api/wallet/balance/:address - Get balance
pub async fn get_balance(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> Json<BalanceResponse> {
    let chain = state.blockchain.lock().await;
    Json(BalanceResponse {
        balance: chain.balance_of(&address),
    })
}

/// GET /health - Health check
pub async fn health_check() -> &'static str {
    "OK"
}
