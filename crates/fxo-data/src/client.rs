//! HTTP client for the filings.xbrl.org JSON:API.

use crate::error::{FilingsError, Result};
use crate::filing_set::FilingSet;
use crate::options::Options;
use crate::page::{FilingsPage, QueryState};
use crate::query::{NO_LIMIT, Query};
use crate::request::ApiRequest;
use crate::resource::ApiError;
use crate::stats;
use chrono::{DateTime, FixedOffset};
use futures::{Stream, StreamExt, TryStreamExt, stream};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::vec;
use tracing::debug;
use url::Url;

/// Media type of JSON:API documents.
const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Client for querying filings.
///
/// Holds a connection pool, so create one and reuse it.
pub struct FilingsClient {
    client: reqwest::Client,
    options: Options,
    entry_point: Url,
}

impl FilingsClient {
    /// Create a client with default options.
    pub fn new() -> Result<Self> {
        Self::with_options(Options::default())
    }

    /// Create a client with custom options.
    ///
    /// # Example
    /// ```no_run
    /// use fxo_data::{FilingsClient, Options, TimeAccuracy};
    ///
    /// # fn example() -> fxo_data::Result<()> {
    /// let options = Options {
    ///     max_page_size: 50,
    ///     time_accuracy: TimeAccuracy::Sec,
    ///     ..Options::default()
    /// };
    /// let client = FilingsClient::with_options(options)?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns [`FilingsError::InvalidOption`] when the options are invalid
    /// and [`FilingsError::Network`] when the HTTP client cannot be built.
    pub fn with_options(options: Options) -> Result<Self> {
        options.validate()?;
        let entry_point = options.entry_point()?;
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .timeout(options.timeout())
            .build()
            .map_err(FilingsError::Network)?;

        Ok(Self {
            client,
            options,
            entry_point,
        })
    }

    /// Options of this client.
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Underlying HTTP client, shared with downloads.
    pub const fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Stream the pages of a query.
    ///
    /// Each parameter set of the query is paged through by following the
    /// `next` links. The stream ends when `max_size` filings have been
    /// returned or every parameter set is exhausted.
    ///
    /// # Example
    /// ```no_run
    /// use fxo_data::{FilingsClient, Query};
    /// use futures::TryStreamExt;
    ///
    /// # async fn example() -> fxo_data::Result<()> {
    /// let client = FilingsClient::new()?;
    /// let query = Query::new().filter("country", "FI").max_size(300);
    /// let mut pages = std::pin::pin!(client.filing_pages(&query));
    /// while let Some(page) = pages.try_next().await? {
    ///     println!("{} filings", page.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn filing_pages<'a>(&'a self, query: &'a Query) -> impl Stream<Item = Result<FilingsPage>> + 'a {
        match query.request_params(&self.options) {
            Ok(sets) => {
                let paging = Paging {
                    client: self,
                    query,
                    param_sets: sets.into_iter(),
                    next_url: None,
                    state: QueryState::default(),
                    query_time: self.options.now(),
                    finished: false,
                };
                stream::try_unfold(paging, Paging::next_page).left_stream()
            }
            Err(e) => stream::once(async move { Err(e) }).right_stream(),
        }
    }

    /// Fetch every filing of a query.
    ///
    /// # Example
    /// ```no_run
    /// use fxo_data::{FilingsClient, Query, ScopeFlags};
    ///
    /// # async fn example() -> fxo_data::Result<()> {
    /// let client = FilingsClient::new()?;
    /// let query = Query::new()
    ///     .filter("country", "FI")
    ///     .flags(ScopeFlags::GET_ENTITY)
    ///     .max_size(10);
    /// let filings = client.get_filings(&query).await?;
    /// for filing in filings.iter() {
    ///     println!("{filing}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_filings(&self, query: &Query) -> Result<FilingSet> {
        let mut filings = FilingSet::with_flags(query.flags);
        let mut pages = std::pin::pin!(self.filing_pages(query));
        while let Some(page) = pages.try_next().await? {
            filings.extend(page.filing_list);
        }
        Ok(filings)
    }

    /// GET a JSON:API document.
    async fn retrieve(&self, url: &str, params: Option<&[(String, String)]>) -> Result<(Value, String)> {
        let mut builder = self.client.get(url).header(ACCEPT, JSONAPI_MEDIA_TYPE);
        if let Some(params) = params {
            builder = builder.query(params);
        }
        let request = builder.build().map_err(FilingsError::Network)?;
        let request_url = request.url().to_string();
        debug!(
            "GET {}",
            urlencoding::decode(&request_url).unwrap_or_else(|_| request_url.as_str().into())
        );

        let response = self.client.execute(request).await.map_err(FilingsError::Network)?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await.map_err(FilingsError::Network)?;
        let json = serde_json::from_str::<Value>(&body);

        if let Ok(doc) = &json
            && let Some(errors) = doc.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            let errors = errors
                .iter()
                .map(|frag| ApiError::from_json(frag, &self.entry_point, status.as_u16(), &status_text))
                .collect();
            return Err(FilingsError::Api {
                status: status.as_u16(),
                status_text,
                errors,
            });
        }
        if status != StatusCode::OK {
            return Err(FilingsError::HttpStatus {
                status_code: status.as_u16(),
                status_text,
                body,
            });
        }
        Ok((json?, request_url))
    }
}

impl std::fmt::Debug for FilingsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilingsClient")
            .field("entry_point", &self.entry_point.as_str())
            .field("max_page_size", &self.options.max_page_size)
            .finish_non_exhaustive()
    }
}

/// State of a running query.
struct Paging<'a> {
    client: &'a FilingsClient,
    query: &'a Query,
    param_sets: vec::IntoIter<Vec<(String, String)>>,
    next_url: Option<String>,
    state: QueryState,
    query_time: DateTime<FixedOffset>,
    finished: bool,
}

impl Paging<'_> {
    async fn next_page(mut self) -> Result<Option<(FilingsPage, Self)>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            let (json, request_url) = match self.next_url.take() {
                Some(url) => self.client.retrieve(&url, None).await?,
                None => match self.param_sets.next() {
                    Some(params) => {
                        let entry_point = self.client.entry_point.as_str();
                        self.client.retrieve(entry_point, Some(params.as_slice())).await?
                    }
                    None => return Ok(None),
                },
            };
            stats::add_page();

            let data_count = json.get("data").and_then(Value::as_array).map_or(0, Vec::len);
            let request = ApiRequest::new(request_url, self.query_time);
            let mut page = FilingsPage::from_json(
                &json,
                &request,
                &self.client.entry_point,
                self.query.flags,
                &mut self.state,
            );
            if data_count > 0 {
                self.next_url.clone_from(&page.api_next_page_url);
            }

            if self.query.max_size != NO_LIMIT {
                let remaining = self.query.max_size.saturating_sub(self.state.filing_count);
                if page.len() >= remaining {
                    page.truncate(remaining);
                    self.finished = true;
                }
            }
            self.state.filing_count += page.len();

            if data_count > 0 {
                return Ok(Some((page, self)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_debug_hides_internals() {
        let client = FilingsClient::new().unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("https://filings.xbrl.org/api/filings"));
        assert!(debug.ends_with("..}"));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = Options {
            max_page_size: 0,
            ..Options::default()
        };
        assert!(matches!(
            FilingsClient::with_options(options),
            Err(FilingsError::InvalidOption(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_query_yields_error() {
        let client = FilingsClient::new().unwrap();
        let query = Query::new().filter("last_end_date", "someday");
        let result = client.get_filings(&query).await;
        assert!(matches!(result, Err(FilingsError::InvalidFilter(_))));
    }
}
