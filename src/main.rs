use anyhow::Result;
use clap::Parser;
use netbox_exporter::{config::Config, server};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// NetBox address, host[:port] without scheme (overrides config)
    #[arg(long, env = "NETBOX_ADDRESS")]
    netbox_address: Option<String>,

    /// NetBox API token (overrides config)
    #[arg(long, env = "NETBOX_TOKEN", hide_env_values = true)]
    netbox_token: Option<String>,

    /// Port to listen on for metrics (overrides config)
    #[arg(short, long, env = "EXPORTER_PORT")]
    port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long, env = "EXPORTER_ADDR")]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting NetBox Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let mut config = Config::load(&args.config)?;

    if let Some(address) = args.netbox_address {
        config.netbox.address = address;
    }
    if let Some(token) = args.netbox_token {
        config.netbox.token = Some(secrecy::SecretString::from(token));
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }

    config.validate()?;

    info!("Configuration loaded successfully");
    info!(
        "NetBox address: {} (tls={})",
        config.netbox.address, config.netbox.use_tls
    );
    info!("Snapshot path: {}", config.snapshot.path.display());
    info!(
        "Metrics endpoint: http://{}:{}{}",
        config.server.addr, config.server.port, config.server.metrics_path
    );

    if let Err(e) = server::start(config).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
