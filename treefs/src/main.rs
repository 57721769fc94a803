use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use treefs::naming::{self, NamingServer};
use treefs::proto::RegistrationStub;
use treefs::storage::StorageServer;
use treefs_rpc::RpcAddr;

#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the naming server
    Naming(NamingConfig),

    /// Start a storage server and register it with a naming server
    Storage(StorageConfig),
}

#[derive(Parser, Debug)]
pub struct NamingConfig {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = naming::SERVICE_PORT)]
    service_port: u16,

    #[arg(long, default_value_t = naming::REGISTRATION_PORT)]
    registration_port: u16,

    #[arg(
        long,
        default_value = "info",
        help = "Log level (error, warn, info, debug, trace). Can also be set via RUST_LOG env var"
    )]
    log_level: String,
}

#[derive(Parser, Debug)]
pub struct StorageConfig {
    #[arg(long, default_value = ".", help = "Directory whose contents this server hosts")]
    root: PathBuf,

    #[arg(
        long,
        default_value = "127.0.0.1",
        help = "Externally routable hostname advertised to the naming server"
    )]
    hostname: String,

    #[arg(long, default_value = "127.0.0.1")]
    naming_host: String,

    #[arg(long, default_value_t = naming::REGISTRATION_PORT)]
    naming_port: u16,

    #[arg(
        long,
        default_value = "info",
        help = "Log level (error, warn, info, debug, trace). Can also be set via RUST_LOG env var"
    )]
    log_level: String,
}

fn setup_tracing(log_level: &str) {
    // Try to use RUST_LOG env var first, fall back to CLI flag
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', falling back to 'info'", log_level);
            EnvFilter::new("info")
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let log_level = match &cli.command {
        Command::Naming(config) => config.log_level.clone(),
        Command::Storage(config) => config.log_level.clone(),
    };
    setup_tracing(&log_level);

    match cli.command {
        Command::Naming(config) => run_naming(config),
        Command::Storage(config) => run_storage(config),
    }
}

#[tokio::main]
async fn run_naming(config: NamingConfig) -> Result<()> {
    let server = NamingServer::new(
        RpcAddr::new(config.host.clone(), config.service_port),
        RpcAddr::new(config.host, config.registration_port),
    );
    server.start().await?;
    info!(
        service = %server.service_addr(),
        registration = %server.registration_addr(),
        "naming server is running"
    );

    tokio::signal::ctrl_c().await?;
    server.stop().await;
    Ok(())
}

#[tokio::main]
async fn run_storage(config: StorageConfig) -> Result<()> {
    let naming = RegistrationStub::new(RpcAddr::new(config.naming_host, config.naming_port));
    let server = StorageServer::new(config.root);
    server.start(&config.hostname, &naming).await?;
    info!(
        storage = %server.storage_addr(),
        command = %server.command_addr(),
        "storage server is running"
    );

    tokio::signal::ctrl_c().await?;
    server.stop().await;
    Ok(())
}
