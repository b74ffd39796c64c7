use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use sami_spaxels::config::PipelineConfig;
use sami_spaxels::data::export::export_table;
use sami_spaxels::data::loader::load_table;
use sami_spaxels::data::table::classify_table;
use sami_spaxels::{db, pipeline};

#[derive(Debug, Parser)]
#[command(name = "sami-spaxels", version, about = "Build the SAMI per-spaxel database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database and (re)create the spaxel table
    MakeDb {
        #[arg(long)]
        database: PathBuf,
    },

    /// Append the spaxels of one or more galaxies
    Ingest {
        /// JSON pipeline configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory with the per-galaxy FITS maps
        #[arg(long)]
        data_dir: Option<PathBuf>,

        #[arg(long)]
        database: Option<PathBuf>,

        /// Touch this file once every galaxy is ingested
        #[arg(long)]
        flag_file: Option<PathBuf>,

        /// Galaxy catalogue IDs
        #[arg(required = true)]
        catids: Vec<i64>,
    },

    /// Recompute line ratios and BPT classes for every stored spaxel
    Reclassify {
        #[arg(long)]
        database: PathBuf,
    },

    /// Classify a .csv/.parquet table with log10_OIII_Hbeta and log10_SII_Halpha columns
    Classify {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },

    /// Write stored spaxels to .csv/.parquet
    Export {
        #[arg(long)]
        database: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Only this galaxy
        #[arg(long)]
        catid: Option<i64>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::MakeDb { database } => {
            pipeline::make_database(&database)?;
        }
        Command::Ingest {
            config,
            data_dir,
            database,
            flag_file,
            catids,
        } => {
            let mut cfg = match config {
                Some(path) => PipelineConfig::load(&path)?,
                None => PipelineConfig::default(),
            };
            if let Some(dir) = data_dir {
                cfg.data_dir = dir;
            }
            if let Some(path) = database {
                cfg.database = path;
            }

            let mut conn = pipeline::open_database(&cfg.database)?;
            let mut total = 0;
            for catid in catids {
                total += pipeline::ingest_galaxy(&cfg, &mut conn, catid)?;
            }
            info!("ingested {total} spaxels into {}", cfg.database.display());
            if let Some(flag) = flag_file {
                pipeline::touch(&flag)?;
            }
        }
        Command::Reclassify { database } => {
            let mut conn = pipeline::open_database(&database)?;
            let summary = db::reclassify(&mut conn)?;
            println!("{summary}");
        }
        Command::Classify { input, output } => {
            let mut table =
                load_table(&input).with_context(|| format!("loading {}", input.display()))?;
            let summary = classify_table(&mut table)?;
            export_table(&table, &output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("{summary}");
        }
        Command::Export {
            database,
            output,
            catid,
        } => {
            let conn = pipeline::open_database(&database)?;
            let table = db::read_table(&conn, catid)?;
            export_table(&table, &output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote {} spaxels to {}", table.len(), output.display());
        }
    }
    Ok(())
}
