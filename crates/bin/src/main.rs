//! fxo CLI binary.
//!
//! Queries the filings.xbrl.org JSON:API and saves the results.

mod commands;

use clap::{Args, Parser, Subcommand};
use fxo::{Query, ScopeFlags};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fxo")]
#[command(about = "Query XBRL filings from filings.xbrl.org", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print filings
    Get {
        #[command(flatten)]
        query: QueryArgs,

        /// Print JSON records instead of one line per filing
        #[arg(long)]
        json: bool,
    },

    /// Save filings to an SQLite database page by page
    Sqlite {
        /// Database path, defaults to filings.db in the data directory
        path: Option<PathBuf>,

        /// Update an existing database
        #[arg(long)]
        update: bool,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Save filing columns to a CSV file
    Csv {
        /// CSV file path
        path: PathBuf,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Download report files of filings
    Download {
        /// Comma-separated files: json, package, xhtml
        #[arg(long, default_value = "package")]
        files: String,

        /// Target directory, defaults to downloads in the data directory
        #[arg(long)]
        to_dir: Option<PathBuf>,

        /// File stem pattern containing /name/, e.g. /name/_2022
        #[arg(long)]
        stem_pattern: Option<String>,

        /// Largest number of simultaneous downloads
        #[arg(long, default_value_t = fxo::data::download::DEFAULT_MAX_CONCURRENT)]
        max_concurrent: usize,

        /// Skip the SHA-256 check of report packages
        #[arg(long)]
        no_check: bool,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Run a query and show how the responses were read
    Debug {
        #[command(flatten)]
        query: QueryArgs,
    },
}

/// Query flags shared by all commands.
#[derive(Args, Debug)]
struct QueryArgs {
    /// Filter as attribute=value, repeat an attribute for several values
    #[arg(short, long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    /// Sort attribute, prefix with - for descending order
    #[arg(long)]
    sort: Vec<String>,

    /// Largest number of filings, 0 for no limit
    #[arg(long, default_value_t = fxo::data::query::DEFAULT_MAX_SIZE)]
    max_size: usize,

    /// Include the entities of the filings
    #[arg(long)]
    entities: bool,

    /// Include the validation messages of the filings
    #[arg(long)]
    validation_messages: bool,
}

impl QueryArgs {
    fn to_query(&self) -> Query {
        let mut grouped: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (key, value) in &self.filters {
            grouped.entry(key.as_str()).or_default().push(value.as_str());
        }

        let mut query = Query::new().max_size(self.max_size).flags(self.flags());
        for (key, values) in grouped {
            query = match values.as_slice() {
                [value] => query.filter(key, *value),
                _ => query.filter_any(key, values),
            };
        }
        for attr in &self.sort {
            query = query.sort(attr.as_str());
        }
        query
    }

    fn flags(&self) -> ScopeFlags {
        let mut flags = ScopeFlags::empty();
        if self.entities {
            flags |= ScopeFlags::GET_ENTITY;
        }
        if self.validation_messages {
            flags |= ScopeFlags::GET_VALIDATION_MESSAGES;
        }
        if flags.is_empty() {
            ScopeFlags::GET_ONLY_FILINGS
        } else {
            flags
        }
    }
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("filter must be attribute=value, got {s:?}")),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fxo=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = fxo::FilingsClient::with_options(fxo::Options::from_env()?)?;

    match cli.command {
        Commands::Get { query, json } => {
            commands::get(&client, &query.to_query(), json).await?;
        }
        Commands::Sqlite {
            path,
            update,
            query,
        } => {
            let path = match path {
                Some(path) => path,
                None => commands::data_dir()?.join("filings.db"),
            };
            commands::sqlite(&client, &query.to_query(), &path, update).await?;
        }
        Commands::Csv { path, query } => {
            commands::csv(&client, &query.to_query(), &path).await?;
        }
        Commands::Download {
            files,
            to_dir,
            stem_pattern,
            max_concurrent,
            no_check,
            query,
        } => {
            let to_dir = match to_dir {
                Some(dir) => dir,
                None => commands::data_dir()?.join("downloads"),
            };
            let options = fxo::DownloadOptions {
                to_dir,
                stem_pattern,
                check_corruption: !no_check,
                max_concurrent,
            };
            commands::download(&client, &query.to_query(), &files.parse::<fxo::Files>()?, &options).await?;
        }
        Commands::Debug { query } => {
            commands::debug(&client, &query.to_query()).await?;
        }
    }

    Ok(())
}
