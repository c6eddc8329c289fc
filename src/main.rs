//! Action Chain CLI Application
//!
//! A command-line interface for interacting with the ledger.

use action_chain::api::{create_router, ApiState};
use action_chain::cli::{self, AppState};
use action_chain::config::ChainConfig;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "action-chain")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A single-node proof-of-work ledger in Rust", long_about = None)]
struct Cli {
    /// Data directory for the ledger database
    #[arg(short, long, env = "ACTION_CHAIN_DB", default_value = ".action_chain")]
    data_dir: PathBuf,

    /// JSON file with chain settings (difficulty, reward, genesis)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the proof-of-work difficulty
    #[arg(long)]
    difficulty: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "4000")]
        port: u16,
    },

    /// Display chain information
    Chain {
        #[command(subcommand)]
        action: Option<ChainCommands>,
    },

    /// Validate the chain
    Validate,

    /// Show the balance of an address
    Balance {
        /// Address (uncompressed public key, hex)
        #[arg(short, long)]
        address: String,
    },

    /// Wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Send coins and mine the transfer into a block
    Send {
        /// Sender's private key (hex)
        #[arg(short = 'k', long)]
        private_key: String,

        /// Recipient's address
        #[arg(short, long)]
        to: String,

        /// Amount to send
        #[arg(short, long)]
        amount: u64,
    },

    /// Mine new blocks
    Mine {
        /// Miner's address for receiving rewards
        #[arg(short, long)]
        address: String,

        /// Annotation recorded in the block
        #[arg(long)]
        contribution: Option<String>,

        /// Reward per block (defaults to the configured reward)
        #[arg(short, long)]
        reward: Option<u64>,

        /// Number of blocks to mine
        #[arg(short, long, default_value = "1")]
        count: u32,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Create a new wallet
    New {
        /// Save the wallet to this file
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Load a wallet from its private key
    Load {
        /// Private key (hex)
        #[arg(short = 'k', long)]
        private_key: String,
    },
}

#[derive(Subcommand)]
enum ChainCommands {
    /// Show detailed info
    Info,

    /// List recent blocks
    Blocks {
        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ChainConfig::from_file(path)?,
        None => ChainConfig::default(),
    };
    if let Some(difficulty) = cli.difficulty {
        config.difficulty = difficulty;
    }

    // Wallet creation doesn't need the ledger
    if let Commands::Wallet {
        action: WalletCommands::New { save },
    } = &cli.command
    {
        return cli::cmd_wallet_new(save.as_deref());
    }

    // Handle the API server with a tokio runtime
    if let Commands::Serve { port } = cli.command {
        return run_server(port, &cli.data_dir, config);
    }

    // Initialize application state
    let mut state = AppState::new(cli.data_dir.clone(), config)?;

    // Process commands
    match cli.command {
        Commands::Serve { .. } => unreachable!(),

        Commands::Chain { action } => match action {
            None | Some(ChainCommands::Info) => {
                cli::cmd_chain_info(&state)?;
            }
            Some(ChainCommands::Blocks { count }) => {
                cli::cmd_chain_blocks(&state, count)?;
            }
        },

        Commands::Validate => {
            cli::cmd_validate(&state)?;
        }

        Commands::Balance { address } => {
            cli::cmd_balance(&state, &address)?;
        }

        Commands::Wallet { action } => match action {
            WalletCommands::New { .. } => unreachable!(),
            WalletCommands::Load { private_key } => {
                cli::cmd_wallet_load(&state, &private_key)?;
            }
        },

        Commands::Send {
            private_key,
            to,
            amount,
        } => {
            cli::cmd_send(&mut state, &private_key, &to, amount)?;
        }

        Commands::Mine {
            address,
            contribution,
            reward,
            count,
        } => {
            cli::cmd_mine(&mut state, &address, contribution.as_deref(), reward, count)?;
        }
    }

    Ok(())
}

fn run_server(
    port: u16,
    data_dir: &Path,
    config: ChainConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        println!("📂 Opening ledger in {:?}...", data_dir);
        let blockchain = cli::open_blockchain(data_dir, config)?;
        println!(
            "   {} blocks loaded, difficulty {}",
            blockchain.blocks().len(),
            blockchain.difficulty()
        );

        let state = ApiState::new(blockchain);
        let app = create_router(state);

        let addr = format!("0.0.0.0:{}", port);
        println!("🚀 REST API server starting on http://localhost:{}", port);
        println!("   Press Ctrl+C to stop");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                println!("\n📴 Shutting down API server...");
            })
            .await?;

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
