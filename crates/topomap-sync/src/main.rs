//! CLI entry point for the topomap replay tool.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use topomap_sync::{replay, Fixture, SyncConfig};

#[derive(Parser)]
#[command(name = "topomap-replay")]
#[command(about = "Reconcile a recorded topology fixture and print the resulting graph")]
struct Cli {
    /// Fixture file with switch, port and link status plus live events.
    #[arg(short, long)]
    fixture: PathBuf,

    /// Output format: text, dot, json.
    #[arg(long, default_value = "text")]
    format: String,

    /// Config file prefix (default: topomap).
    #[arg(short, long, default_value = "topomap")]
    config: String,
}

enum OutputFormat {
    Text,
    Dot,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let format = parse_format(&cli.format)?;
    let config = SyncConfig::load(&cli.config)?;

    let fixture = Fixture::load(&cli.fixture)?;
    tracing::info!(
        fixture = %cli.fixture.display(),
        switches = fixture.switches.len(),
        ports = fixture.ports.len(),
        links = fixture.links.len(),
        events = fixture.events.len(),
        "Fixture loaded"
    );

    let controller = replay(fixture, &config).await?;
    let graph = controller.current_graph();
    tracing::info!(
        epoch = %controller.epoch(),
        up_to_date = controller.is_up_to_date(),
        changes = controller.history().len(),
        "Replay complete"
    );

    match format {
        OutputFormat::Text => print!("{graph}"),
        OutputFormat::Dot => print!("{}", graph.to_dot()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&graph.snapshot())?),
    }

    Ok(())
}

fn parse_format(s: &str) -> anyhow::Result<OutputFormat> {
    match s.to_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "dot" => Ok(OutputFormat::Dot),
        "json" => Ok(OutputFormat::Json),
        _ => anyhow::bail!("Invalid format: {s}. Choose: text, dot, json"),
    }
}
