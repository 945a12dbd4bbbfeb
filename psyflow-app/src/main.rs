mod app;
mod demo;
mod engine;
mod view;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::App;

/// Runs a random-dot-motion session and saves its data.
#[derive(Parser, Debug, Clone)]
#[command(name = "psyflow", version, about)]
pub struct Cli {
    /// Show the debrief and the raw data instead of redirecting
    #[arg(long, env = "PSYFLOW_DEBUG")]
    pub debug: bool,

    /// Keep data in memory instead of a real backend
    #[arg(long, env = "PSYFLOW_MOCK")]
    pub mock: bool,

    #[arg(long, env = "PROLIFIC_PID", default_value = "anonymous")]
    pub participant: String,

    #[arg(
        long,
        env = "PSYFLOW_COMPLETION_URL",
        default_value = "https://app.prolific.com/submissions/complete"
    )]
    pub completion_url: String,

    #[arg(long, env = "PSYFLOW_COMPLETION_CODE")]
    pub completion_code: String,

    /// Directory for the file backend
    #[arg(long, env = "PSYFLOW_STORE_DIR", default_value = "data")]
    pub store_dir: PathBuf,

    /// Base URL of the HTTP backend; takes precedence over --store-dir
    #[arg(long, env = "PSYFLOW_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Let a simulated participant answer
    #[arg(long)]
    pub autopilot: bool,

    /// Seed for block randomization
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, env = "PSYFLOW_REDIRECT_DELAY_MS", default_value_t = 3000)]
    pub redirect_delay_ms: u64,
}

fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let app = App::new(cli)?;
    app.run().await?;

    Ok(())
}
