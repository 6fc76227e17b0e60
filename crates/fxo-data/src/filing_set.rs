//! Sets of filings returned by a query.

use crate::client::FilingsClient;
use crate::download::{DownloadInfo, DownloadOptions, Files, download_specs};
use crate::error::{FilingsError, Result};
use crate::resource::{Entity, Filing, ValidationMessage};
use crate::resource_collection::{ColumnData, ResourceCollection, column_data, select_columns};
use crate::scope::ScopeFlags;
use futures::{Stream, StreamExt};
use fxo_download::DownloadResult;
use indexmap::IndexMap;
use std::sync::Arc;

/// Filings keyed by `api_id`, in the order they were received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilingSet {
    filings: IndexMap<String, Filing>,
    flags: ScopeFlags,
}

impl FilingSet {
    /// Empty set without related resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set for filings fetched with `flags`.
    pub fn with_flags(flags: ScopeFlags) -> Self {
        Self {
            filings: IndexMap::new(),
            flags,
        }
    }

    /// Flags the filings were fetched with.
    pub const fn flags(&self) -> ScopeFlags {
        self.flags
    }

    /// Add a filing, returning the one it replaced.
    pub fn insert(&mut self, filing: Filing) -> Option<Filing> {
        self.filings.insert(filing.api_id.clone(), filing)
    }

    /// Number of filings.
    pub fn len(&self) -> usize {
        self.filings.len()
    }

    /// No filings.
    pub fn is_empty(&self) -> bool {
        self.filings.is_empty()
    }

    /// Filing by `api_id`.
    pub fn get(&self, api_id: &str) -> Option<&Filing> {
        self.filings.get(api_id)
    }

    /// Mutable filing by `api_id`.
    pub fn get_mut(&mut self, api_id: &str) -> Option<&mut Filing> {
        self.filings.get_mut(api_id)
    }

    /// Iterate the filings.
    pub fn iter(&self) -> impl Iterator<Item = &Filing> {
        self.filings.values()
    }

    /// Iterate the filings mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Filing> {
        self.filings.values_mut()
    }

    /// Keep the filings for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Filing) -> bool) {
        self.filings.retain(|_, filing| keep(filing));
    }

    /// Distinct entities of the filings.
    pub fn entities(&self) -> ResourceCollection<Entity> {
        ResourceCollection::from_items(self.iter().filter_map(|f| f.entity.clone()))
    }

    /// Distinct validation messages of the filings.
    pub fn validation_messages(&self) -> ResourceCollection<ValidationMessage> {
        ResourceCollection::from_items(
            self.iter()
                .filter_map(|f| f.validation_messages.as_ref())
                .flatten()
                .map(Arc::clone),
        )
    }

    /// Filings of one entity.
    pub fn entity_filings<'a>(&'a self, entity_api_id: &'a str) -> impl Iterator<Item = &'a Filing> + 'a {
        self.iter()
            .filter(move |f| f.entity_api_id.as_deref() == Some(entity_api_id))
    }

    /// Data columns of the filings.
    ///
    /// Download path columns appear only after a download and
    /// `entity_api_id` only when entities were requested.
    pub fn columns(&self) -> Vec<String> {
        Filing::columns_for(self.flags, self.iter())
    }

    /// Column-major filing data, all columns when `attr_names` is `None`.
    ///
    /// # Errors
    /// Returns [`FilingsError::UnknownAttribute`] for a name that is not
    /// a filing data column.
    pub fn get_data(&self, attr_names: Option<&[&str]>) -> Result<ColumnData> {
        let columns = select_columns::<Filing>(self.columns(), attr_names)?;
        Ok(column_data(self.iter(), &columns))
    }

    /// Download files of every filing.
    ///
    /// All downloads are attempted. Paths of saved files are recorded on
    /// the filings.
    ///
    /// # Errors
    /// Returns [`FilingsError::Downloads`] with every failed download.
    pub async fn download(
        &mut self,
        client: &FilingsClient,
        files: &Files,
        options: &DownloadOptions,
    ) -> Result<()> {
        let results: Vec<_> = self.download_stream(client, files, options).collect().await;
        let mut errors = Vec::new();
        for result in results {
            if let Err(e) = self.record_download(result) {
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(FilingsError::Downloads(errors))
        }
    }

    /// Download files of every filing, yielding results as they finish.
    ///
    /// Pass each result to [`FilingSet::record_download`] to store the
    /// saved path on its filing.
    pub fn download_stream<'a>(
        &self,
        client: &'a FilingsClient,
        files: &Files,
        options: &DownloadOptions,
    ) -> impl Stream<Item = DownloadResult<DownloadInfo>> + use<'a> {
        let specs = self
            .iter()
            .flat_map(|filing| download_specs(filing, files, options))
            .collect();
        fxo_download::download_parallel_stream(client.http(), specs, options.max_concurrent)
    }

    /// Store the path of a finished download on its filing.
    ///
    /// # Errors
    /// Returns the download error of a failed result.
    pub fn record_download(
        &mut self,
        result: DownloadResult<DownloadInfo>,
    ) -> std::result::Result<(), fxo_download::DownloadError> {
        let (api_id, kind) = result.info;
        let path = result.result?;
        if let Some(filing) = self.filings.get_mut(&api_id) {
            kind.set_download_path(filing, path);
        }
        Ok(())
    }
}

impl Extend<Filing> for FilingSet {
    fn extend<I: IntoIterator<Item = Filing>>(&mut self, iter: I) {
        for filing in iter {
            self.insert(filing);
        }
    }
}

impl FromIterator<Filing> for FilingSet {
    fn from_iter<I: IntoIterator<Item = Filing>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a FilingSet {
    type Item = &'a Filing;
    type IntoIter = indexmap::map::Values<'a, String, Filing>;

    fn into_iter(self) -> Self::IntoIter {
        self.filings.values()
    }
}

impl IntoIterator for FilingSet {
    type Item = Filing;
    type IntoIter = indexmap::map::IntoValues<String, Filing>;

    fn into_iter(self) -> Self::IntoIter {
        self.filings.into_values()
    }
}
