use std::{io, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client::{CommandBackend, LocalBackend, RemoteBackend};
use dispatcher::SimulatorOptions;
use shared::domain::UserId;
use tokio::io::BufReader;
use tracing::info;

mod repl;

/// Practice docker commands against a simulated engine.
#[derive(Parser, Debug)]
#[command(name = "docker-sim", version)]
struct Args {
    /// Send commands to a simulator server instead of running one in-process.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, default_value = "local")]
    simulation_id: String,
    #[arg(long, default_value_t = 1)]
    user_id: i64,
    /// Delay before a pulled image shows up (local mode only).
    #[arg(long, default_value_t = 1000)]
    pull_delay_ms: u64,
    #[arg(long)]
    no_sample_images: bool,
    /// Run the commands in FILE, one per line, then exit.
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,
    /// Run COMMAND and exit. May be repeated.
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    commands: Vec<String>,
}

impl Args {
    fn backend(&self) -> Result<Box<dyn CommandBackend>> {
        let user_id = UserId(self.user_id);
        if let Some(server_url) = &self.server_url {
            let remote = RemoteBackend::new(server_url, self.simulation_id.clone(), user_id)
                .context("failed to configure remote backend")?;
            return Ok(Box::new(remote));
        }
        let options = SimulatorOptions {
            seed_sample_images: !self.no_sample_images,
            ..SimulatorOptions::default()
        };
        Ok(Box::new(LocalBackend::new(
            options,
            Duration::from_millis(self.pull_delay_ms),
            Some(user_id),
        )))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();
    let backend = args.backend()?;
    info!(backend = %backend.describe(), "terminal ready");

    let mut stdout = io::stdout();
    if let Some(path) = &args.script {
        let script = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read script {}", path.display()))?;
        repl::run_lines(backend.as_ref(), script.lines(), &mut stdout).await?;
    }
    if !args.commands.is_empty() {
        repl::run_lines(
            backend.as_ref(),
            args.commands.iter().map(String::as_str),
            &mut stdout,
        )
        .await?;
    }
    if args.script.is_some() || !args.commands.is_empty() {
        return Ok(());
    }

    println!("Connected to {}. Type `help` for commands.", backend.describe());
    let stdin = BufReader::new(tokio::io::stdin());
    repl::interactive(backend.as_ref(), stdin, &mut stdout).await
}
