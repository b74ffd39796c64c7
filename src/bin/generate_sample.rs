use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use sami_spaxels::config::PipelineConfig;
use sami_spaxels::data::sample::write_sample_galaxy;

/// Write synthetic SAMI-style FITS maps for one galaxy
#[derive(Debug, Parser)]
struct Args {
    /// Output directory
    #[arg(long, default_value = "sample_data")]
    data_dir: PathBuf,

    #[arg(long, default_value_t = 9011900128)]
    catid: i64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("creating {}", args.data_dir.display()))?;
    let config = PipelineConfig {
        data_dir: args.data_dir.clone(),
        ..Default::default()
    };
    write_sample_galaxy(&config.fits_source(), args.catid, args.seed)?;

    println!(
        "Wrote sample maps for CATID {} to {}",
        args.catid,
        args.data_dir.display()
    );
    Ok(())
}
