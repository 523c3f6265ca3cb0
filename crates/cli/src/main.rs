//! Tidesync CLI - Database migrations and tenant management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ts-cli migrate
//!
//! # Register a store tenant
//! ts-cli tenant register -d acme.myshopify.com -t shpat_xxx
//!
//! # Trigger a bulk sync for a tenant
//! ts-cli sync --tenant 1
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `tenant register` - Register a store tenant
//! - `sync` - Run a bulk sync for one tenant

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ts-cli")]
#[command(author, version, about = "Tidesync CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage store tenants
    Tenant {
        #[command(subcommand)]
        action: TenantAction,
    },
    /// Run a bulk sync for one tenant
    Sync {
        /// Internal tenant id
        #[arg(short, long)]
        tenant: i32,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    /// Register a new store tenant
    Register {
        /// Store domain (e.g., acme.myshopify.com)
        #[arg(short, long)]
        domain: String,

        /// Admin API access token for the store
        #[arg(short, long)]
        token: String,

        /// Display name (defaults to the domain's first label)
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Tenant { action } => match action {
            TenantAction::Register {
                domain,
                token,
                name,
            } => {
                commands::tenant::register(&domain, token, name.as_deref()).await?;
            }
        },
        Commands::Sync { tenant } => commands::sync::run(tenant).await?,
    }
    Ok(())
}
