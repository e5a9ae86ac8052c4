//! Rent-a-car CLI
//!
//! Command-line front end for the orchestration client: session commands
//! (connect, role, disconnect) plus one subcommand per contract method.

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use rent_a_car_client::wallet::{BackendKind, BackendSelector};
use rent_a_car_client::{Config, Outcome, RentACar, Result, Role};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rent-a-car")]
#[command(about = "Transaction client for the rent-a-car contract")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect a wallet
    Connect {
        /// Wallet backend (freighter, xbull, albedo); prompts when omitted
        #[arg(short, long)]
        backend: Option<String>,
    },

    /// Disconnect and clear the session
    Disconnect,

    /// Select the session role (admin, owner, renter)
    Role { role: String },

    /// Show the current session
    Session,

    /// List a car for rental (owner)
    AddCar {
        #[arg(short, long)]
        owner: String,
        #[arg(short, long)]
        price_per_day: i128,
    },

    /// Rent a car (renter)
    Rent {
        #[arg(short, long)]
        renter: String,
        #[arg(short, long)]
        owner: String,
        #[arg(short, long)]
        days: u32,
    },

    /// Return a rented car (renter)
    Return {
        #[arg(short, long)]
        renter: String,
        #[arg(short, long)]
        owner: String,
    },

    /// Remove a listing (admin)
    RemoveCar {
        #[arg(short, long)]
        owner: String,
    },

    /// Query a car's status
    CarStatus {
        #[arg(short, long)]
        owner: String,
    },

    /// Set the admin commission (admin)
    SetCommission { commission: i128 },

    /// Query the admin commission
    Commission,

    /// Withdraw owner proceeds (owner)
    PayoutOwner {
        #[arg(short, long)]
        owner: String,
        #[arg(short, long)]
        amount: i128,
    },

    /// Withdraw admin commission (admin)
    PayoutAdmin { amount: i128 },

    /// Query the admin balance
    AdminBalance,
}

/// Selector used when `--backend` is given: resolves immediately.
struct FixedSelector(BackendKind);

#[async_trait]
impl BackendSelector for FixedSelector {
    async fn select(&self, options: &[BackendKind]) -> Option<BackendKind> {
        options.contains(&self.0).then_some(self.0)
    }
}

/// Interactive selector: lists the configured backends and reads a choice
/// from stdin. Empty input or EOF cancels.
struct StdinSelector;

#[async_trait]
impl BackendSelector for StdinSelector {
    async fn select(&self, options: &[BackendKind]) -> Option<BackendKind> {
        let options = options.to_vec();
        tokio::task::spawn_blocking(move || {
            println!("Select a wallet:");
            for (i, kind) in options.iter().enumerate() {
                println!("  {}) {}", i + 1, kind);
            }
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).ok()?;
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            if let Ok(index) = line.parse::<usize>() {
                return options.get(index.checked_sub(1)?).copied();
            }
            BackendKind::from_id(line).filter(|kind| options.contains(kind))
        })
        .await
        .ok()
        .flatten()
    }
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Success { hash, .. } => println!("Confirmed: {hash}"),
        Outcome::Unresolved { hash } => {
            println!("Unresolved: {hash} (still pending; check the relay later)")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let client = RentACar::new(&config)?;
    client.restore().await;

    match cli.command {
        Commands::Connect { backend } => {
            let address = match backend {
                Some(id) => {
                    let kind = BackendKind::from_id(&id).ok_or_else(|| {
                        rent_a_car_client::Error::Wallet(format!("unknown backend `{id}`"))
                    })?;
                    client.connect(&FixedSelector(kind)).await?
                }
                None => client.connect(&StdinSelector).await?,
            };
            println!("Connected: {address}");
        }
        Commands::Disconnect => {
            client.disconnect().await?;
            println!("Disconnected");
        }
        Commands::Role { role } => {
            let role = match role.as_str() {
                "admin" => Role::Admin,
                "owner" => Role::Owner,
                "renter" => Role::Renter,
                other => {
                    return Err(rent_a_car_client::Error::Config(format!(
                        "unknown role `{other}` (expected admin, owner, or renter)"
                    )))
                }
            };
            client.select_role(role).await?;
            println!("Role set to {role}");
        }
        Commands::Session => {
            let session = client.session().await;
            if session.is_connected() {
                println!("Address: {}", session.address);
                println!("Backend: {}", session.backend_id.as_deref().unwrap_or("-"));
            } else {
                println!("Not connected");
            }
            println!("Role:    {}", session.role);
        }
        Commands::AddCar {
            owner,
            price_per_day,
        } => print_outcome(&client.add_car(&owner, price_per_day).await?),
        Commands::Rent {
            renter,
            owner,
            days,
        } => print_outcome(&client.rental(&renter, &owner, days).await?),
        Commands::Return { renter, owner } => {
            print_outcome(&client.return_car(&renter, &owner).await?)
        }
        Commands::RemoveCar { owner } => print_outcome(&client.remove_car(&owner).await?),
        Commands::CarStatus { owner } => {
            let outcome = client.get_car_status(&owner).await?;
            match &outcome {
                Outcome::Success { .. } => println!("Status: {}", outcome.car_status()?.name()),
                Outcome::Unresolved { .. } => print_outcome(&outcome),
            }
        }
        Commands::SetCommission { commission } => {
            print_outcome(&client.set_admin_commission(commission).await?)
        }
        Commands::Commission => {
            let outcome = client.get_admin_commission().await?;
            match &outcome {
                Outcome::Success { .. } => println!("Commission: {}", outcome.amount()?),
                Outcome::Unresolved { .. } => print_outcome(&outcome),
            }
        }
        Commands::PayoutOwner { owner, amount } => {
            print_outcome(&client.payout_owner(&owner, amount).await?)
        }
        Commands::PayoutAdmin { amount } => print_outcome(&client.payout_admin(amount).await?),
        Commands::AdminBalance => {
            let outcome = client.get_admin_balance().await?;
            match &outcome {
                Outcome::Success { .. } => println!("Balance: {}", outcome.amount()?),
                Outcome::Unresolved { .. } => print_outcome(&outcome),
            }
        }
    }

    Ok(())
}
