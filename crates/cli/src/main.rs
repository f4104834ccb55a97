mod config_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    config_commands::{Overrides, ensure_valid, load_settings},
    secrecy::ExposeSecret,
    streamhook_eventsub::{SubscriptionStatus, compute_signature},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "streamhook", about = "Relay Twitch go-live events to Discord", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ./streamhook.{toml,yaml,json}, then the user config dir).
    #[arg(long, global = true, env = "STREAMHOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Channel list file, one login per line.
    #[arg(long, global = true)]
    channels_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server and subscribe channels (default).
    Serve,
    /// Create subscriptions for every configured channel, then exit.
    Subscribe,
    /// Print the signature header for a delivery, for local testing.
    Sign {
        /// Twitch-Eventsub-Message-Id value.
        #[arg(long)]
        id: String,
        /// Twitch-Eventsub-Message-Timestamp value.
        #[arg(long)]
        timestamp: String,
        /// File holding the exact request body (`-` for stdin).
        #[arg(long)]
        body_file: PathBuf,
    },
    /// Validate the configuration and report errors/warnings.
    CheckConfig,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            bind: self.bind.clone(),
            port: self.port,
            channels_file: self.channels_file.clone(),
        }
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let overrides = cli.overrides();
    match cli.command {
        None | Some(Commands::Serve) => serve(&overrides).await,
        Some(Commands::Subscribe) => subscribe(&overrides).await,
        Some(Commands::Sign {
            id,
            timestamp,
            body_file,
        }) => sign(&overrides, &id, &timestamp, &body_file),
        Some(Commands::CheckConfig) => config_commands::check(&overrides),
    }
}

async fn serve(overrides: &Overrides) -> anyhow::Result<()> {
    let settings = load_settings(overrides)?;
    ensure_valid(&settings)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        channels = settings.channels.len(),
        "streamhook starting"
    );
    streamhook_gateway::start_gateway(settings.config, settings.channels).await
}

async fn subscribe(overrides: &Overrides) -> anyhow::Result<()> {
    let settings = load_settings(overrides)?;
    ensure_valid(&settings)?;
    if settings.channels.is_empty() {
        println!("No channels configured.");
        return Ok(());
    }

    let relay = streamhook_gateway::bootstrap(&settings.config).await?;
    let reports = streamhook_gateway::run_subscriptions(&relay, &settings.channels).await;

    for report in &reports {
        match &report.status {
            SubscriptionStatus::Created(sub) => {
                println!("  subscribed  {} ({})", report.login, sub.channel_id);
            },
            SubscriptionStatus::AlreadySubscribed(sub) => {
                println!("  existing    {} ({})", report.login, sub.channel_id);
            },
            SubscriptionStatus::Failed(reason) => {
                println!("  failed      {}: {reason}", report.login);
            },
        }
    }

    if !reports.is_empty() && reports.iter().all(|r| !r.status.is_success()) {
        anyhow::bail!("every subscription failed");
    }
    Ok(())
}

fn sign(
    overrides: &Overrides,
    id: &str,
    timestamp: &str,
    body_file: &std::path::Path,
) -> anyhow::Result<()> {
    let settings = load_settings(overrides)?;
    let secret = settings.config.twitch.webhook_secret.expose_secret();
    if secret.is_empty() {
        anyhow::bail!("twitch.webhook_secret is not set");
    }
    let body = config_commands::read_body(body_file)?;
    println!(
        "{}",
        compute_signature(secret.as_bytes(), id, timestamp, &body)
    );
    Ok(())
}
