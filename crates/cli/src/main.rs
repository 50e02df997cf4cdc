//! EcomCloth CLI - cart storage inspection and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart kept in a storefront storage file
//! ec-cli cart show --store /var/lib/ecomcloth/storage.json
//!
//! # Clear it
//! ec-cli cart clear --store /var/lib/ecomcloth/storage.json
//!
//! # List the catalog
//! ec-cli catalog list
//! ```
//!
//! # Commands
//!
//! - `cart show` - Print the stored cart, or why tabs would load it as empty
//! - `cart clear` - Remove the stored cart
//! - `catalog list` - Print the product catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ecomcloth_storefront::cart::DEFAULT_CART_KEY;

mod commands;

#[derive(Parser)]
#[command(name = "ec-cli")]
#[command(author, version, about = "EcomCloth CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or clear the stored cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Inspect the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

/// Location of the stored cart.
#[derive(Args)]
struct StoreArgs {
    /// Storefront storage file
    #[arg(short, long, env = "STOREFRONT_STORAGE_PATH")]
    store: PathBuf,

    /// Storage key of the cart
    #[arg(short, long, env = "STOREFRONT_CART_KEY", default_value = DEFAULT_CART_KEY)]
    key: String,
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the stored cart
    Show(StoreArgs),
    /// Remove the stored cart
    Clear(StoreArgs),
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List all products
    List,
}

fn main() {
    // Load .env so the store location can come from the storefront's settings
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show(args) => commands::cart::show(&args.store, &args.key)?,
            CartAction::Clear(args) => commands::cart::clear(&args.store, &args.key)?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::List => commands::catalog::list(),
        },
    }
    Ok(())
}
