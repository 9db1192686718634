//! Rollapp node configuration CLI.
//!
//! Every command except `init` loads `<home>/roller.toml` first, which runs
//! pending config migrations before anything else happens.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use da_layer::{Celestia, UnderfundedAddress};
use genesis::HttpGenesisSource;
use migrations::VersionData;
use process_runner::SystemRunner;
use roller::{Confirm, Roller, SetDaOutcome};
use roller_config::{ConfigStore, DaType, HubData, RollappConfig, TomlConfigStore};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "roller")]
#[command(about = "Configure and operate a rollapp node")]
struct Cli {
    /// Roller home directory (defaults to ~/.roller)
    #[arg(long, env = "ROLLER_HOME", global = true)]
    home: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a rollapp home
    Init {
        /// Rollapp chain id
        #[arg(long)]
        rollapp_id: String,
        /// Hub chain id, "mock" for a local hub
        #[arg(long, default_value = "mock")]
        hub_id: String,
        /// Hub RPC URL
        #[arg(long, default_value = "")]
        hub_rpc: String,
        /// Hub gas price, without denom
        #[arg(long, default_value = "")]
        hub_gas_price: String,
        /// DA backend
        #[arg(long, default_value = "local")]
        da: String,
        /// Rollapp node binary
        #[arg(long, default_value = "rollapp-evm")]
        rollapp_binary: String,
        /// Base denom, used when the hub is a mock
        #[arg(long, default_value = "urax")]
        base_denom: String,
        /// Overwrite an existing roller.toml
        #[arg(long)]
        force: bool,
    },
    /// Change a setting of an initialized rollapp
    Set {
        #[command(subcommand)]
        setting: Setting,
    },
    /// Run pending config migrations
    Migrate,
    /// Show accounts that need funding
    Balances,
    /// Show DA light node status
    Status,
    /// DA light node commands
    Da {
        #[command(subcommand)]
        command: DaCommand,
    },
}

#[derive(Subcommand)]
enum Setting {
    /// DA backend (celestia, avail, local)
    Da { value: String },
    /// Celestia light client RPC port
    LcRpcPort { value: String },
    /// Celestia light client gateway port
    LcGatewayPort { value: String },
}

#[derive(Subcommand)]
enum DaCommand {
    /// Start the light node in the background
    Start {
        /// Export light node metrics to this OTLP endpoint
        #[arg(long)]
        metrics_endpoint: Option<String>,
    },
    /// Print the light node account's private key
    ExportKey,
}

/// Reads y/n answers from stdin.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        print!("{} (y/n)? ", prompt);
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

fn default_home() -> Result<PathBuf> {
    match std::env::var_os("HOME") {
        Some(home) => Ok(PathBuf::from(home).join(".roller")),
        None => bail!("HOME is not set, pass --home"),
    }
}

fn print_addresses(title: &str, addresses: &[UnderfundedAddress]) {
    println!("{}", title);
    for addr in addresses {
        println!(
            "  {} ({}): {} has {}{}, needs {}{}",
            addr.key_name,
            addr.network,
            addr.address,
            addr.current_balance,
            addr.denom,
            addr.required_balance,
            addr.denom
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let home = match cli.home {
        Some(home) => home,
        None => default_home()?,
    };
    let version: VersionData = migrations::TOOL_VERSION.parse()?;
    let roller = Roller::new(Arc::new(TomlConfigStore), Arc::new(SystemRunner), version);

    match cli.command {
        Commands::Init {
            rollapp_id,
            hub_id,
            hub_rpc,
            hub_gas_price,
            da,
            rollapp_binary,
            base_denom,
            force,
        } => {
            if roller_config::config_path(&home).exists() && !force {
                bail!(
                    "{} is already initialized, pass --force to overwrite",
                    home.display()
                );
            }
            let backend: DaType = da.parse()?;
            if !backend.is_supported() {
                bail!("unsupported DA backend {}, use celestia, avail or local", backend);
            }
            let denom = genesis::display_denom(&base_denom)?;
            let mut config = RollappConfig {
                home: home.clone(),
                rollapp_id,
                rollapp_binary,
                hub_data: HubData {
                    id: hub_id,
                    rpc_url: hub_rpc,
                    gas_price: hub_gas_price,
                    ..Default::default()
                },
                da: da_layer::default_da_config(backend),
                denom,
                base_denom,
                ..Default::default()
            };
            init(&roller, &mut config).await?;
        }
        Commands::Set { setting } => {
            let mut config = roller.load(&home)?;
            match setting {
                Setting::Da { value } => set_da(&roller, &mut config, &value)?,
                Setting::LcRpcPort { value } => {
                    roller.set_lc_rpc_port(&config, &value)?;
                    println!("Light client RPC port set to {}", value);
                }
                Setting::LcGatewayPort { value } => {
                    roller.set_lc_gateway_port(&config, &value)?;
                    println!("Light client gateway port set to {}", value);
                }
            }
        }
        Commands::Migrate => {
            let mut config = roller.store().load(&home)?;
            let applied = roller.migrate(&mut config)?;
            if applied.is_empty() {
                println!("Config is up to date ({})", config.roller_version);
            } else {
                println!("Applied migrations: {}", applied.join(", "));
            }
        }
        Commands::Balances => {
            let config = roller.load(&home)?;
            let report = roller.check_funding(&config)?;
            if report.is_funded() {
                println!("All accounts are funded");
            } else {
                let short: Vec<_> = report.underfunded().cloned().collect();
                print_addresses("Please fund these addresses:", &short);
            }
        }
        Commands::Status => {
            let config = roller.load(&home)?;
            let status = roller.da_status(&config);
            println!("Rollapp: {}", config.rollapp_id);
            println!("  Hub: {}", config.hub_data.id);
            println!("  DA: {} ({})", status.backend, status.network);
            println!("  DA light node: {}", status.status);
        }
        Commands::Da { command } => {
            let config = roller.load(&home)?;
            match command {
                DaCommand::Start { metrics_endpoint } => {
                    match roller.start_da_light_node(&config, metrics_endpoint.as_deref())? {
                        Some(pid) => println!("DA light node started (pid {})", pid),
                        None => println!("{} DA has no light node to start", config.da.backend),
                    }
                }
                DaCommand::ExportKey => {
                    if config.da.backend != DaType::Celestia {
                        bail!("key export is only supported for celestia");
                    }
                    let celestia = Celestia::new(&config, roller.runner());
                    println!("{}", celestia.export_private_key()?);
                }
            }
        }
    }

    Ok(())
}

async fn init(roller: &Roller, config: &mut RollappConfig) -> Result<()> {
    info!("Initializing rollapp {} in {}", config.rollapp_id, config.home.display());

    let outcome = roller
        .initialize_rollapp(config, &HttpGenesisSource::new())
        .await?;

    println!("Rollapp {} initialized", config.rollapp_id);
    println!("  Home: {}", config.home.display());
    println!("  Denom: {} (base {})", config.denom, config.base_denom);
    if let Some(genesis) = &outcome.genesis {
        println!("  Genesis checksum: {}", genesis.checksum);
    }
    println!("  DA: {}", config.da.backend);
    if !outcome.da_mnemonic.is_empty() {
        println!("\nDA key mnemonic, store it somewhere safe:");
        println!("  {}", outcome.da_mnemonic);
    }
    if let Some(key) = &outcome.da_address {
        println!("\nPlease fund {} ({}) to run the DA light client.", key.address, key.name);
    }
    Ok(())
}

fn set_da(roller: &Roller, config: &mut RollappConfig, value: &str) -> Result<()> {
    match roller.set_da(config, value, &StdinConfirm)? {
        SetDaOutcome::Unchanged => println!("DA is already {}", config.da.backend),
        SetDaOutcome::Declined => println!("DA unchanged"),
        SetDaOutcome::Switched {
            backend,
            mnemonic,
            fund,
        } => {
            println!("RollApp DA has been successfully set to '{}'", backend);
            if !mnemonic.is_empty() {
                println!("\nDA key mnemonic, store it somewhere safe:");
                println!("  {}", mnemonic);
            }
            if let Some(key) = fund {
                println!("\n  {}: {}", key.name, key.address);
                println!("\nPlease fund this address to run the DA light client.");
            }
        }
    }
    Ok(())
}
