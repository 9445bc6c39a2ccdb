use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use seqdist_loader::config::DataloaderConfig;

#[derive(Parser, Debug)]
#[command(version, about = "Build a dataloader from its config and inspect examples")]
struct Args {
    /// Path to the dataloader JSON config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// First example to show
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Number of examples to show
    #[arg(short = 'n', long, default_value_t = 3)]
    count: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = DataloaderConfig::load(&args.config)
        .with_context(|| format!("loading config {:?}", args.config))?;
    let dataset = config.build().context("building dataset")?;

    let end = args.start.saturating_add(args.count).min(dataset.len());
    info!(
        "Showing examples {}..{} of {} ({})",
        args.start,
        end,
        dataset.len(),
        dataset.kind()
    );

    for idx in args.start..end {
        let summary = dataset
            .describe(idx)
            .with_context(|| format!("example {idx}"))?;
        println!("[{idx}] {summary}");
    }
    Ok(())
}
