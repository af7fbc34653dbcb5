use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "quarxd",
    about = "Quarxd — license-key validation and activation server daemon",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Quarx HTTP server
    Serve {
        /// Port to listen on (default: $QUARX_PORT or 8080)
        #[arg(long, env = "QUARX_PORT", default_value = "8080")]
        port: u16,
        /// Host to bind (default: $QUARX_HOST or 0.0.0.0)
        #[arg(long, env = "QUARX_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Keep licenses in memory only; state dies with the process
        #[arg(long, env = "QUARX_IN_MEMORY")]
        in_memory: bool,
        /// Log level: error, warn, info, debug, verbose (default: $QUARX_LOG_LEVEL or warn)
        #[arg(long, env = "QUARX_LOG_LEVEL")]
        log_level: Option<String>,
    },
    /// Generate a fresh QUARX license key and insert it into the local store
    /// (offline). Requires direct access to the quarx.db file.
    Genkey {
        /// License type recorded on the key
        #[arg(long, default_value = "premium")]
        license_type: String,
        /// Days until expiry
        #[arg(long, default_value = "30")]
        days: i64,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let effective_log_level = if let Commands::Serve { ref log_level, .. } = cli.command {
        let raw = log_level
            .clone()
            .or_else(|| std::env::var("QUARX_LOG_LEVEL").ok())
            .unwrap_or_else(|| "warn".into());
        if raw.eq_ignore_ascii_case("verbose") {
            "debug".to_owned()
        } else {
            raw
        }
    } else {
        std::env::var("QUARX_LOG_LEVEL").unwrap_or_else(|_| "warn".into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&effective_log_level))
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            in_memory,
            log_level: _,
        } => cmd_serve(host, port, in_memory).await,

        Commands::Genkey { license_type, days } => cmd_genkey(license_type, days).await,
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_serve(host: String, port: u16, in_memory: bool) -> Result<()> {
    let cfg = quarx_server::ServerConfig {
        host,
        port,
        in_memory,
        api_key: std::env::var("QUARX_API_KEY").ok(),
        data_dir: std::env::var("QUARX_DATA_DIR").ok().map(Into::into),
        ..Default::default()
    };

    quarx_server::run(cfg).await
}

async fn cmd_genkey(license_type: String, days: i64) -> Result<()> {
    // Resolve data directory and open the store directly, without the server.
    let data_dir_env = std::env::var("QUARX_DATA_DIR").ok().map(Into::into);
    let data_dir = quarx_server::resolve_data_dir(data_dir_env.as_ref())?;
    let db_path = data_dir.join("quarx.db");
    let store = quarx_server::store::Store::open(&db_path).context("open store")?;

    let key = generate_key();
    let now = Utc::now().timestamp();
    let expires_at = now + days * quarx_server::store::model::SECONDS_PER_DAY;
    let rec = store
        .create(&key, &license_type, expires_at, now)
        .context("insert license")?;

    println!("{}", rec.key);
    println!(
        "type: {}  expires: {}",
        rec.license_type,
        DateTime::<Utc>::from_timestamp(rec.expires_at, 0)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| rec.expires_at.to_string())
    );
    Ok(())
}

/// Admin key format: QUARX-XXXX-XXXX-XXXX-XXXX, four groups of random hex.
fn generate_key() -> String {
    let bytes: [u8; 8] = rand::random();
    let hex = hex::encode_upper(bytes);
    format!(
        "QUARX-{}-{}-{}-{}",
        &hex[0..4],
        &hex[4..8],
        &hex[8..12],
        &hex[12..16]
    )
}
