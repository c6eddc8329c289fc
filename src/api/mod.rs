//! REST API module
//!
//! Provides HTTP REST API for programmatic access to the ledger.
//!
//! # Endpoints
//!
//! ## Chain
//! - `GET /api/blockchain` - Full chain
//! - `POST /api/blockchain/contribute` - Mine pending transactions
//! - `GET /api/blockchain/validate` - Validate chain
//!
//! ## Transactions
//! - `POST /api/transactions` - Submit a signed transaction
//!
//! ## Wallet
//! - `POST /api/wallet/create` - Generate a key pair
//! - `POST /api/wallet/load` - Restore a key pair from its private key
//! - `POST /api/wallet/send` - Sign, submit and mine a transfer
//! - `GET /api/wallet/balance/:address` - Get balance

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
