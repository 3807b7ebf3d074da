use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qrsign_bridge::{Config, Connect, DisplayMode, IpfsGateway, TerminalPresenter};

#[derive(Parser)]
#[command(name = "qrsign-bridge")]
#[command(about = "Sign Ethereum requests with a mobile identity app via QR codes or deep links", version)]
struct Cli {
    /// Configuration file path (defaults are used when it does not exist)
    #[arg(short, long, default_value = "qrsign.toml", global = true)]
    config: String,

    /// Name shown to the user in the signing app
    #[arg(long, default_value = "qrsign-bridge", env = "QRSIGN_APP_NAME", global = true)]
    app_name: String,

    /// Print deep links instead of drawing QR codes
    #[arg(long, global = true)]
    deep_link: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a default configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "qrsign.toml")]
        output: String,
    },

    /// Ask the signing app for the user's address
    Connect,

    /// Send a transaction through the signing app
    Send {
        /// Sender address; resolved through the signing app when omitted
        #[arg(long)]
        from: Option<String>,
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Value in wei, hex encoded (e.g. 0xde0b6b3a7640000)
        #[arg(long)]
        value: Option<String>,
        /// Call data, hex encoded
        #[arg(long)]
        data: Option<String>,
        /// Gas limit, hex encoded
        #[arg(long)]
        gas: Option<String>,
        /// RPC endpoint overriding the configured one
        #[arg(long)]
        rpc_url: Option<String>,
    },

    /// Fetch the connected user's identity document
    Identity {
        /// IPFS API endpoint overriding the configured one
        #[arg(long)]
        ipfs_url: Option<String>,
        /// RPC endpoint overriding the configured one
        #[arg(long)]
        rpc_url: Option<String>,
    },
}

fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::load(path).with_context(|| format!("failed to load {}", path))
    } else {
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrsign_bridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Commands::Init { output } = &cli.command {
        let config = Config::default();
        config.save(output)?;
        info!("Configuration file created at: {}", output);
        return Ok(());
    }

    let mut config = load_config(&cli.config)?;
    if cli.deep_link {
        config.display.mode = Some(DisplayMode::DeepLink);
    }

    let mut connect = Connect::new(cli.app_name.clone(), config, Arc::new(TerminalPresenter))?;

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Connect => {
            let provider = connect.provider(None)?;
            let accounts = provider.send("eth_accounts", vec![]).await?;
            println!("{}", accounts);
        }
        Commands::Send { from, to, value, data, gas, rpc_url } => {
            let provider = connect.provider(rpc_url.as_deref())?;
            let from = match from {
                Some(from) => from,
                None => connect.subprovider().address().await?,
            };

            let mut tx = json!({ "from": from, "to": to });
            for (key, field) in [("value", value), ("data", data), ("gas", gas)] {
                if let Some(field) = field {
                    tx[key] = Value::String(field);
                }
            }

            let tx_hash = provider.send("eth_sendTransaction", vec![tx]).await?;
            info!("Transaction hash: {}", tx_hash);
            println!("{}", tx_hash);
        }
        Commands::Identity { ipfs_url, rpc_url } => {
            let ipfs_url = match ipfs_url.or_else(|| connect.config().ipfs.as_ref().map(|i| i.api_url.clone())) {
                Some(url) => url,
                None => bail!("No IPFS endpoint configured; pass --ipfs-url or set [ipfs] in the config"),
            };

            connect.provider(rpc_url.as_deref())?;
            connect.set_providers(None, Some(Arc::new(IpfsGateway::new(ipfs_url)?)))?;

            let document = connect.user_identity().await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }

    Ok(())
}
