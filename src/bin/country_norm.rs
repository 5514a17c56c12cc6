//! Command-line front end over a durable alias store.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use country_norm::{open_store, seed, Config, Resolution, Resolver};

#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
#[command(name = "country-norm")]
#[command(about = "Resolve country name variants to a canonical name")]
struct Args {
    /// Alias store directory
    #[arg(long, env = "COUNTRY_NORM_DB", default_value = "countries.db")]
    db: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip fsync after each write
    #[arg(long)]
    no_sync: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a name, printing the canonical name or `None`
    Resolve {
        name: String,
        /// Similarity cutoff, strictly between 0 and 1
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Map an alias to a canonical name
    Set {
        alias: String,
        canonical_name: String,
        /// 1 = name/translation/abbreviation, 2 = capital/region
        #[arg(short, long, default_value_t = 2)]
        priority: u8,
    },
    /// Remove an alias
    Delete { alias: String },
    /// Load aliases from a seed JSON file
    Import { file: PathBuf },
    /// Print every alias as seed JSON
    Export,
    /// Print every alias as `alias<TAB>priority<TAB>name`
    List,
    /// Fold the write-ahead log into a snapshot
    Compact,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("cannot parse config {}", path.display()))?
        }
        None => Config::default(),
    };
    if args.no_sync {
        config.store.sync_on_write = false;
    }
    Ok(config.validate()?)
}

fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "country_norm=debug"
    } else {
        "country_norm=info"
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(args.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&args)?;
    let store = Arc::new(open_store(&args.db, Some(config.store.clone()))?);
    let resolver = Resolver::with_config(store.clone(), config.resolver)?;

    match args.command {
        Command::Resolve { name, threshold } => {
            let dif_acc = threshold.unwrap_or(config.resolver.dif_acc);
            match resolver.resolve_with(&name, dif_acc)? {
                Resolution::Found(found) => {
                    info!(tier = found.tier, alias = %found.alias, ratio = found.ratio, "match");
                    println!("{}", found.canonical_name);
                }
                Resolution::NotFound => println!("None"),
            }
        }
        Command::Set {
            alias,
            canonical_name,
            priority,
        } => resolver.set_alias(&alias, &canonical_name, priority)?,
        Command::Delete { alias } => {
            if !resolver.delete_alias(&alias)? {
                info!(alias = %alias, "alias was not present");
            }
        }
        Command::Import { file } => {
            let reader = File::open(&file)
                .with_context(|| format!("cannot open seed {}", file.display()))?;
            let records = seed::read_seed(BufReader::new(reader))?;
            let count = seed::import(store.as_ref(), &records)?;
            println!("imported {count} aliases");
        }
        Command::Export => {
            let records = seed::export(store.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::List => {
            for record in seed::export(store.as_ref())? {
                println!(
                    "{}\t{}\t{}",
                    record.alias, record.priority, record.canonical_name
                );
            }
        }
        Command::Compact => {
            let result = store.compact()?;
            println!(
                "compacted {} aliases (WAL {} -> {} bytes)",
                result.entries_compacted, result.wal_size_before, result.wal_size_after
            );
        }
    }

    Ok(())
}
