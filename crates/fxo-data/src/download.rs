//! Downloading the files of filings.
//!
//! A filing can have an xBRL-JSON file, a report package and an inline
//! XBRL report. [`Files`] selects which of them to download and can
//! override the target directory, file name and stem pattern per kind.

use crate::client::FilingsClient;
use crate::error::{FilingsError, Result};
use crate::resource::Filing;
use fxo_download::{DownloadResult, DownloadSpecs};
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Default number of concurrent downloads.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Identifies a download within a filing set.
pub type DownloadInfo = (String, FileKind);

/// A downloadable file of a filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    /// xBRL-JSON file
    Json,
    /// Report package
    Package,
    /// Inline XBRL report
    Xhtml,
}

impl FileKind {
    /// Every file kind.
    pub const ALL: [Self; 3] = [Self::Json, Self::Package, Self::Xhtml];

    /// Lowercase name, e.g. `package`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Package => "package",
            Self::Xhtml => "xhtml",
        }
    }

    /// URL of this file for `filing`.
    pub fn url<'a>(&self, filing: &'a Filing) -> Option<&'a str> {
        match self {
            Self::Json => filing.json_url.as_deref(),
            Self::Package => filing.package_url.as_deref(),
            Self::Xhtml => filing.xhtml_url.as_deref(),
        }
    }

    /// Record the local path of this file on `filing`.
    pub fn set_download_path(&self, filing: &mut Filing, path: PathBuf) {
        let slot = match self {
            Self::Json => &mut filing.json_download_path,
            Self::Package => &mut filing.package_download_path,
            Self::Xhtml => &mut filing.xhtml_download_path,
        };
        *slot = Some(path);
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = FilingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "package" => Ok(Self::Package),
            "xhtml" => Ok(Self::Xhtml),
            other => Err(FilingsError::InvalidOption(format!(
                "file must be one of json, package, xhtml, got {other:?}"
            ))),
        }
    }
}

/// Per-file overrides of the download parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadItem {
    /// File name replacing the one in the URL
    pub filename: Option<String>,
    /// Directory replacing the call's `to_dir`
    pub to_dir: Option<PathBuf>,
    /// Stem pattern replacing the call's pattern
    pub stem_pattern: Option<String>,
}

/// Files to download, each with optional overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Files(IndexMap<FileKind, DownloadItem>);

impl Files {
    /// Selected kinds and their overrides.
    pub fn iter(&self) -> impl Iterator<Item = (&FileKind, &DownloadItem)> {
        self.0.iter()
    }

    /// No file selected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add a file kind with overrides.
    pub fn with(mut self, kind: FileKind, item: DownloadItem) -> Self {
        self.0.insert(kind, item);
        self
    }
}

impl From<FileKind> for Files {
    fn from(kind: FileKind) -> Self {
        Self::from_iter([kind])
    }
}

impl<const N: usize> From<[FileKind; N]> for Files {
    fn from(kinds: [FileKind; N]) -> Self {
        Self::from_iter(kinds)
    }
}

impl From<Vec<FileKind>> for Files {
    fn from(kinds: Vec<FileKind>) -> Self {
        Self::from_iter(kinds)
    }
}

impl From<IndexMap<FileKind, DownloadItem>> for Files {
    fn from(items: IndexMap<FileKind, DownloadItem>) -> Self {
        Self(items)
    }
}

impl FromIterator<FileKind> for Files {
    fn from_iter<I: IntoIterator<Item = FileKind>>(kinds: I) -> Self {
        Self(kinds.into_iter().map(|k| (k, DownloadItem::default())).collect())
    }
}

impl FromStr for Files {
    type Err = FilingsError;

    /// Comma-separated kinds, e.g. `json,package`.
    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(FileKind::from_str)
            .collect()
    }
}

/// Parameters shared by every file of a download call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Target directory
    pub to_dir: PathBuf,
    /// Stem pattern containing `/name/`
    pub stem_pattern: Option<String>,
    /// Check the package against its SHA-256 hash
    pub check_corruption: bool,
    /// Largest number of simultaneous downloads
    pub max_concurrent: usize,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            to_dir: PathBuf::from("."),
            stem_pattern: None,
            check_corruption: true,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl DownloadOptions {
    /// Options saving into `to_dir`.
    pub fn new(to_dir: impl AsRef<Path>) -> Self {
        Self {
            to_dir: to_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

/// Download instructions for the selected files of `filing`.
///
/// Files without a URL are skipped with a warning.
pub(crate) fn download_specs(
    filing: &Filing,
    files: &Files,
    options: &DownloadOptions,
) -> Vec<DownloadSpecs<DownloadInfo>> {
    let mut specs = Vec::new();
    for (kind, item) in files.iter() {
        let Some(url) = kind.url(filing) else {
            warn!("{kind} not available for {}", filing.repr());
            continue;
        };
        let to_dir = item.to_dir.as_deref().unwrap_or(&options.to_dir);
        let mut spec = DownloadSpecs::new(url, to_dir).with_info((filing.api_id.clone(), *kind));
        spec.filename.clone_from(&item.filename);
        spec.stem_pattern = item
            .stem_pattern
            .clone()
            .or_else(|| options.stem_pattern.clone());
        if *kind == FileKind::Package && options.check_corruption {
            spec.sha256.clone_from(&filing.package_sha256);
        }
        specs.push(spec);
    }
    specs
}

impl Filing {
    /// Download files of this filing.
    ///
    /// Local paths of the saved files are recorded in the
    /// `*_download_path` fields.
    ///
    /// # Example
    /// ```no_run
    /// use fxo_data::{DownloadOptions, FileKind, FilingsClient, Query};
    ///
    /// # async fn example() -> fxo_data::Result<()> {
    /// let client = FilingsClient::new()?;
    /// let mut filings = client.get_filings(&Query::new().max_size(1)).await?;
    /// if let Some(filing) = filings.iter_mut().next() {
    ///     filing
    ///         .download(&client, &FileKind::Package.into(), &DownloadOptions::new("reports"))
    ///         .await?;
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns [`FilingsError::Download`] with the first failed download.
    pub async fn download(
        &mut self,
        client: &FilingsClient,
        files: &Files,
        options: &DownloadOptions,
    ) -> Result<()> {
        let specs = download_specs(self, files, options);
        let results =
            fxo_download::download_parallel(client.http(), specs, options.max_concurrent).await;
        let mut first_error = None;
        for DownloadResult { result, info, .. } in results {
            match result {
                Ok(path) => info.1.set_download_path(self, path),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(_) => {}
            }
        }
        match first_error {
            Some(e) => Err(FilingsError::Download(e)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ApiRequest;
    use chrono::Utc;
    use serde_json::json;
    use url::Url;

    fn filing() -> Filing {
        let entry = Url::parse("https://filings.xbrl.org/api/filings").unwrap();
        let request = ApiRequest::new("https://filings.xbrl.org/api/filings", Utc::now().fixed_offset());
        let frag = json!({
            "type": "filing",
            "id": "7",
            "attributes": {
                "fxo_id": "fxo-7",
                "package_url": "/x/report-2022-12-31-en.zip",
                "report_url": "/x/report/reports/report-2022-12-31-en.xhtml",
                "sha256": "ABC"
            }
        });
        Filing::from_json(&frag, &request, &entry).unwrap()
    }

    #[test]
    fn test_parse_files() {
        let files: Files = "json, package".parse().unwrap();
        assert_eq!(files.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [FileKind::Json, FileKind::Package]);
        assert!("json,pdf".parse::<Files>().is_err());
        assert!("".parse::<Files>().unwrap().is_empty());
    }

    #[test]
    fn test_specs_skip_missing_urls_and_apply_overrides() {
        let files = Files::from([FileKind::Json, FileKind::Package]).with(
            FileKind::Xhtml,
            DownloadItem {
                filename: Some("report.xhtml".to_string()),
                to_dir: Some(PathBuf::from("xhtml")),
                stem_pattern: None,
            },
        );
        let options = DownloadOptions {
            stem_pattern: Some("/name/_fi".to_string()),
            ..DownloadOptions::new("out")
        };
        let specs = download_specs(&filing(), &files, &options);
        assert_eq!(specs.len(), 2);

        let package = &specs[0];
        assert_eq!(package.info, ("7".to_string(), FileKind::Package));
        assert_eq!(package.to_dir, PathBuf::from("out"));
        assert_eq!(package.sha256.as_deref(), Some("ABC"));
        assert_eq!(package.stem_pattern.as_deref(), Some("/name/_fi"));

        let xhtml = &specs[1];
        assert_eq!(xhtml.to_dir, PathBuf::from("xhtml"));
        assert_eq!(xhtml.filename.as_deref(), Some("report.xhtml"));
        assert_eq!(xhtml.sha256, None);
    }

    #[test]
    fn test_corruption_check_can_be_disabled() {
        let options = DownloadOptions {
            check_corruption: false,
            ..DownloadOptions::default()
        };
        let specs = download_specs(&filing(), &FileKind::Package.into(), &options);
        assert_eq!(specs[0].sha256, None);
        assert_eq!(specs[0].to_dir, PathBuf::from("."));
    }

    #[test]
    fn test_set_download_path() {
        let mut filing = filing();
        FileKind::Xhtml.set_download_path(&mut filing, PathBuf::from("a.xhtml"));
        assert_eq!(filing.xhtml_download_path, Some(PathBuf::from("a.xhtml")));
        assert_eq!(FileKind::Xhtml.url(&filing), filing.xhtml_url.as_deref());
    }
}
