mod app;

use anyhow::Result;
use clap::Parser;

use app::{Cli, run};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.trace_tokens {
        tracing::Level::DEBUG
    } else if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let start = std::time::Instant::now();
    run(&cli)?;
    tracing::info!("Done in {:.3}s", start.elapsed().as_secs_f64());

    Ok(())
}
