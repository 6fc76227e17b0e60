//! Subcommand implementations.

use futures::{StreamExt, TryStreamExt};
use fxo::data::{DataValue, TimeAccuracy, debug as read_stats};
use fxo::{DownloadOptions, Files, FilingSet, FilingsClient, FilingsError, NO_LIMIT, Query};
use fxo_output::{SqliteExportOptions, pages_to_sqlite, save_csv};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Directory for default databases and downloads.
pub(crate) fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    dirs::data_dir()
        .map(|dir| dir.join("fxo"))
        .ok_or_else(|| "no data directory for this platform, give a path".into())
}

fn progress_bar(len: Option<u64>, message: &'static str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = match len {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("█▓░"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {pos} {msg}")?);
            pb
        }
    };
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    Ok(pb)
}

pub(crate) async fn get(client: &FilingsClient, query: &Query, json: bool) -> CmdResult {
    let filings = client.get_filings(query).await?;
    if json {
        let accuracy = client.options().time_accuracy;
        println!("{}", serde_json::to_string_pretty(&records(&filings, accuracy)?)?);
    } else {
        for filing in &filings {
            println!("{filing}");
        }
    }
    Ok(())
}

/// Filing rows as JSON objects keyed by column name.
fn records(filings: &FilingSet, accuracy: TimeAccuracy) -> Result<Vec<Value>, FilingsError> {
    let data = filings.get_data(None)?;
    let rows = (0..filings.len())
        .map(|i| {
            let row: Map<String, Value> = data
                .iter()
                .map(|(column, values)| {
                    let value = values.get(i).cloned().flatten();
                    (column.clone(), json_value(value, accuracy))
                })
                .collect();
            Value::Object(row)
        })
        .collect();
    Ok(rows)
}

fn json_value(value: Option<DataValue>, accuracy: TimeAccuracy) -> Value {
    match value {
        None => Value::Null,
        Some(DataValue::Integer(i)) => i.into(),
        Some(DataValue::Real(r)) => r.into(),
        Some(DataValue::List(items)) => items.into(),
        Some(other) => other.to_text(accuracy).into(),
    }
}

pub(crate) async fn sqlite(client: &FilingsClient, query: &Query, path: &Path, update: bool) -> CmdResult {
    let len = (query.max_size != NO_LIMIT).then_some(query.max_size as u64);
    let pb = progress_bar(len, "Saving filings...")?;
    let pages = client
        .filing_pages(query)
        .inspect_ok(|page| pb.inc(page.len() as u64));
    let options = SqliteExportOptions::with_time_accuracy(client.options().time_accuracy);

    match pages_to_sqlite(pages, query.flags, path, update, &options).await {
        Ok(saved) => {
            pb.finish_with_message(format!("Saved {saved} filings to {}", path.display()));
            Ok(())
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            Err(e.into())
        }
    }
}

pub(crate) async fn csv(client: &FilingsClient, query: &Query, path: &Path) -> CmdResult {
    let filings = client.get_filings(query).await?;
    save_csv(path, &filings.get_data(None)?, client.options().time_accuracy)?;
    info!("Saved {} filings to {}", filings.len(), path.display());
    Ok(())
}

pub(crate) async fn download(
    client: &FilingsClient,
    query: &Query,
    files: &Files,
    options: &DownloadOptions,
) -> CmdResult {
    let mut filings = client.get_filings(query).await?;
    let expected = filings
        .iter()
        .map(|filing| files.iter().filter(|(kind, _)| kind.url(filing).is_some()).count())
        .sum::<usize>();
    let pb = progress_bar(Some(expected as u64), "Downloading...")?;

    let results: Vec<_> = filings.download_stream(client, files, options)
        .inspect(|_| pb.inc(1))
        .collect()
        .await;
    let mut saved = 0;
    let mut errors = Vec::new();
    for result in results {
        match filings.record_download(result) {
            Ok(()) => saved += 1,
            Err(e) => {
                pb.println(e.to_string());
                errors.push(e);
            }
        }
    }
    pb.finish_with_message(format!("Saved {saved} files to {}", options.to_dir.display()));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(FilingsError::Downloads(errors).into())
    }
}

pub(crate) async fn debug(client: &FilingsClient, query: &Query) -> CmdResult {
    let filings = client.get_filings(query).await?;
    println!("Retrieved {} filings\n", filings.len());

    println!("Unaccessed key paths:");
    for (class_name, key_path) in read_stats::unaccessed_key_paths() {
        println!("  {class_name}: {key_path}");
    }

    println!("\nKey path availability:");
    let mut counts = read_stats::key_path_availability_counts();
    counts.sort();
    for c in counts {
        println!(
            "  {}: {} {}/{}",
            c.class_name, c.key_path, c.success_count, c.total_count
        );
    }

    let unexpected = read_stats::unexpected_resource_types();
    if !unexpected.is_empty() {
        println!("\nUnexpected resource types:");
        for (type_name, origin) in unexpected {
            println!("  {type_name} in {origin}");
        }
    }
    Ok(())
}
