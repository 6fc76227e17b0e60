//! Query-level shortcuts.

use futures::Stream;
use fxo_data::{FilingSet, FilingsClient, FilingsPage, Query};
use fxo_output::{SqliteExportOptions, pages_to_sqlite};
use std::path::Path;

/// Retrieve the filings of a query.
///
/// # Example
/// ```no_run
/// use fxo::{FilingsClient, Query};
///
/// # async fn example() -> fxo::data::Result<()> {
/// let client = FilingsClient::new()?;
/// let filings = fxo::get_filings(&client, &Query::new().filter("country", "SE")).await?;
/// println!("{} filings", filings.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns the first error of any page.
pub async fn get_filings(client: &FilingsClient, query: &Query) -> fxo_data::Result<FilingSet> {
    client.get_filings(query).await
}

/// Pages of a query, requested as the stream is polled.
///
/// Filings returned again on a later page are left out and entities are
/// shared across pages.
pub fn filing_page_iter<'a>(
    client: &'a FilingsClient,
    query: &'a Query,
) -> impl Stream<Item = fxo_data::Result<FilingsPage>> + 'a {
    client.filing_pages(query)
}

/// Retrieve the filings of a query and save them to a database page by
/// page.
///
/// Tables follow `query.flags`. Datetimes are written with the time
/// accuracy of the client options. Returns the number of filings saved.
///
/// # Errors
/// Returns [`fxo_output::OutputError`] for path and schema problems and
/// query errors.
pub async fn to_sqlite<P: AsRef<Path>>(
    client: &FilingsClient,
    query: &Query,
    path: P,
    update: bool,
) -> fxo_output::Result<usize> {
    let options = SqliteExportOptions::with_time_accuracy(client.options().time_accuracy);
    pages_to_sqlite(client.filing_pages(query), query.flags, path, update, &options).await
}
