//! # Revenda CLI
//!
//! Drives a persisted storefront session from the terminal. Every command
//! prints its result as pretty JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Write a default config file
//! revenda config init
//!
//! # Build a cart
//! revenda cart add --id 1 --name "Hidratante Facial" --price 100,00
//! revenda cart set --id 1 --qty 3
//! revenda cart show
//!
//! # Pay
//! revenda checkout card --address addr-1 --token tok_visa_4242 --installments 3
//! revenda checkout pix --address addr-1 --coupon BEMVINDA10 --credit 15,00
//!
//! # Retry a failed order
//! revenda order retry
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use revenda_core::{CheckoutPhase, Money, Product, ProductId};
use revenda_sync::StorefrontConfig;
use serde::Serialize;
use storefront_lib::checkout::{CardPayment, CheckoutRequest};
use storefront_lib::{commands, init_tracing, Session};
use tracing::info;

#[derive(Parser)]
#[command(name = "revenda")]
#[command(author, version, about = "Reseller storefront checkout")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true, env = "REVENDA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit or show the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Pay for the current cart
    Checkout {
        #[command(subcommand)]
        method: CheckoutMethod,
    },
    /// Manage the pending order
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add one unit of a product
    Add {
        #[arg(long)]
        id: ProductId,

        #[arg(long)]
        name: String,

        /// Table price in reais, e.g. 129,90
        #[arg(long, value_parser = parse_money)]
        price: Money,
    },
    /// Remove a product
    Remove {
        #[arg(long)]
        id: ProductId,
    },
    /// Set a product's quantity (0 removes it)
    Set {
        #[arg(long)]
        id: ProductId,

        #[arg(long)]
        qty: i64,
    },
    /// Empty the cart
    Clear,
    /// Show items and pricing
    Show,
}

#[derive(Args)]
struct CheckoutArgs {
    /// Delivery address id
    #[arg(long)]
    address: String,

    #[arg(long)]
    coupon: Option<String>,

    /// Commission credit to apply, in reais
    #[arg(long, value_parser = parse_money, default_value = "0")]
    credit: Money,

    /// Add the starter kit (customer's first order)
    #[arg(long)]
    first_order: bool,
}

impl From<CheckoutArgs> for CheckoutRequest {
    fn from(args: CheckoutArgs) -> Self {
        CheckoutRequest {
            address_id: Some(args.address),
            coupon_code: args.coupon,
            credit: args.credit,
            is_first_order: args.first_order,
        }
    }
}

#[derive(Subcommand)]
enum CheckoutMethod {
    /// Charge a gateway card token
    Card {
        #[command(flatten)]
        order: CheckoutArgs,

        /// Token issued by the gateway SDK (never a card number)
        #[arg(long)]
        token: String,

        #[arg(long, default_value_t = 1)]
        installments: u32,
    },
    /// Generate a PIX code
    Pix {
        #[command(flatten)]
        order: CheckoutArgs,

        /// Return right after the code is generated
        #[arg(long)]
        no_wait: bool,
    },
    /// Show the checkout session
    Status,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Make a failed order chargeable again
    Retry,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the current configuration to the config file
    Init,
    /// Print the config file location
    Path,
}

fn parse_money(input: &str) -> Result<Money, String> {
    Money::parse_reais(input).map_err(|e| e.to_string())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if let Commands::Config { action } = &cli.command {
        return run_config(action, cli.config.clone());
    }

    let config = StorefrontConfig::load(cli.config.clone()).context("Failed to load config")?;
    let session = Session::open(config).await.context("Failed to open session")?;

    let result = run(&session, cli.command).await;
    session.close().await;
    result
}

fn run_config(action: &ConfigAction, path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path
        .or_else(StorefrontConfig::default_config_path)
        .context("No config path available")?;

    match action {
        ConfigAction::Init => {
            let config = StorefrontConfig::load_or_default(Some(path.clone()));
            config.save(Some(path.clone()))?;
            info!(path = %path.display(), "Config written");
            println!("{}", path.display());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

async fn run(session: &Session, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Cart { action } => match action {
            CartAction::Add { id, name, price } => {
                let product = Product {
                    id,
                    name,
                    table_price: price,
                };
                print_json(&commands::add_to_cart(session, product).await?)
            }
            CartAction::Remove { id } => print_json(&commands::remove_from_cart(session, id).await?),
            CartAction::Set { id, qty } => {
                print_json(&commands::update_cart_item(session, id, qty).await?)
            }
            CartAction::Clear => print_json(&commands::clear_cart(session).await),
            CartAction::Show => print_json(&commands::get_cart(session).await),
        },
        Commands::Checkout { method } => match method {
            CheckoutMethod::Card {
                order,
                token,
                installments,
            } => {
                let card = CardPayment {
                    token,
                    installments,
                };
                let outcome = commands::checkout_card(session, order.into(), card).await?;
                print_json(&outcome)?;
                if outcome.phase == CheckoutPhase::PendingAsync {
                    print_json(&commands::wait_for_payment(session).await)?;
                }
                Ok(())
            }
            CheckoutMethod::Pix { order, no_wait } => {
                let outcome = commands::checkout_pix(session, order.into()).await?;
                print_json(&outcome)?;
                if !no_wait {
                    eprintln!("Waiting for the PIX payment (Ctrl+C to stop)...");
                    print_json(&commands::wait_for_payment(session).await)?;
                }
                Ok(())
            }
            CheckoutMethod::Status => print_json(&commands::get_checkout(session).await),
        },
        Commands::Order { action } => match action {
            OrderAction::Retry => print_json(&commands::retry_order(session).await?),
        },
        Commands::Config { .. } => Ok(()),
    }
}
