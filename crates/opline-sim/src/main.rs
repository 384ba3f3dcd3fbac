use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use opline_link::{channel_pair, run_session, LinkEndpoint, SessionConfig, SessionRole};
use opline_sim::{SimConfig, Simulator};
use opline_store::{LogStore, StoreConfig};

#[derive(Parser)]
#[command(
    name = "opline-sim",
    about = "Opline traffic simulator — loopback demo against an in-process display endpoint",
    version,
)]
struct Cli {
    /// How long to run, in seconds.
    #[arg(long, default_value = "10")]
    duration: u64,

    /// Traffic seed; overrides the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Optional TOML config for cadences and handshake tuning.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the display side's session logs.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Autosaved session logs to keep.
    #[arg(long, default_value = "5")]
    auto_save_limit: usize,

    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let store = LogStore::open(StoreConfig {
        log_dir: cli.log_dir.clone(),
        auto_save_limit: cli.auto_save_limit,
    })?;

    let (sim_side, display_side) = channel_pair();
    let sim_token = CancellationToken::new();
    let display_token = CancellationToken::new();

    let display_task = {
        let token = display_token.clone();
        tokio::spawn(async move {
            let mut display = LinkEndpoint::with_store(Some(store));
            let session = SessionConfig {
                role: SessionRole::Responder,
                ..SessionConfig::default()
            };
            let result = run_session(&mut display, &display_side, &session, token).await;
            (display, result)
        })
    };

    let stopper = sim_token.clone();
    let duration = Duration::from_secs(cli.duration);
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        stopper.cancel();
    });

    info!(seconds = cli.duration, seed = config.seed, "loopback demo starting");
    let mut simulator = Simulator::new(config);
    let report = simulator.run(&sim_side, sim_token).await?;

    display_token.cancel();
    let (display, _) = display_task.await?;
    // The closing exchange frees the display journal; the session log file
    // is what survives the run.
    let session_log = display
        .store()
        .map(|store| store.session_path().display().to_string());

    match cli.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "simulator": report,
                    "display": { "session_log": session_log },
                })
            );
        }
        OutputFormat::Text => {
            println!("simulator:");
            println!("  events generated  {}", report.events_generated);
            println!("  errors generated  {}", report.errors_generated);
            println!("  errors cleared    {}", report.errors_cleared);
            println!("  lines sent        {}", report.lines_sent);
            if let Some(path) = session_log {
                println!("display session log: {path}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::try_parse_from(["opline-sim"]).unwrap();
        assert_eq!(cli.duration, 10);
        assert!(cli.seed.is_none());
        assert!(matches!(cli.format, OutputFormat::Text));
    }

    #[test]
    fn parse_overrides() {
        let cli = Cli::try_parse_from([
            "opline-sim",
            "--duration",
            "3",
            "--seed",
            "42",
            "--format",
            "json",
            "--log-dir",
            "/tmp/opline",
        ])
        .unwrap();
        assert_eq!(cli.duration, 3);
        assert_eq!(cli.seed, Some(42));
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.log_dir, PathBuf::from("/tmp/opline"));
    }
}
