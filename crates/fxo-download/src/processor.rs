//! Download functions.

use crate::error::{DownloadError, Result};
use crate::specs::{DownloadResult, DownloadSpecs};
use crate::stats;
use futures::stream::{self, Stream, StreamExt};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Placeholder replaced by the original file stem in stem patterns.
pub const NAME_PLACEHOLDER: &str = "/name/";

/// Check that a stem pattern contains the `/name/` placeholder.
///
/// # Errors
/// Returns [`DownloadError::InvalidStemPattern`] when the placeholder is
/// missing.
pub fn validate_stem_pattern(stem_pattern: Option<&str>) -> Result<()> {
    match stem_pattern {
        Some(pattern) if !pattern.contains(NAME_PLACEHOLDER) => {
            Err(DownloadError::InvalidStemPattern(pattern.to_string()))
        }
        _ => Ok(()),
    }
}

/// Download a file and optionally check it against a SHA-256 hash.
///
/// `to_dir` is created if missing. Without an explicit file name the
/// last segment of the URL path is used, and if that is empty the first
/// free name of `file0001`, `file0002`, ... is chosen. An existing file
/// at the target path is replaced.
///
/// The body is written to `<name>.unfinished` while transferring. When
/// the hash does not match the file is renamed to `<name>.corrupt` and
/// [`DownloadError::CorruptDownload`] is returned.
///
/// # Example
/// ```no_run
/// use fxo_download::{DownloadSpecs, download};
///
/// # async fn example() -> fxo_download::Result<()> {
/// let client = reqwest::Client::new();
/// let spec = DownloadSpecs::new("https://filings.xbrl.org/a/b/package.zip", "out")
///     .with_sha256("9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08");
/// let path = download(&client, &spec).await?;
/// # Ok(())
/// # }
/// ```
pub async fn download<T>(client: &reqwest::Client, spec: &DownloadSpecs<T>) -> Result<PathBuf> {
    validate_stem_pattern(spec.stem_pattern.as_deref())?;
    fs::create_dir_all(&spec.to_dir).await?;

    let mut filename = match spec.filename.as_deref() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => filename_from_url(&spec.url)?.unwrap_or_else(|| next_free_name(&spec.to_dir)),
    };

    debug!(url = %spec.url, "GET");
    let response = client.get(&spec.url).send().await?;
    stats::add_item();
    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus {
            url: spec.url.clone(),
            status: response.status().as_u16(),
        });
    }

    if let Some(pattern) = spec.stem_pattern.as_deref() {
        filename = apply_stem_pattern(&filename, pattern);
    }

    let save_path = spec.to_dir.join(&filename);
    let temp_path = with_appended_suffix(&save_path, "unfinished");

    let mut hasher = spec.sha256.as_ref().map(|_| Sha256::new());
    let mut file = fs::File::create(&temp_path).await?;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        if let Some(hasher) = hasher.as_mut() {
            hasher.update(&chunk);
        }
        stats::add_bytes(chunk.len());
    }
    file.flush().await?;
    drop(file);

    if let (Some(expected), Some(hasher)) = (spec.sha256.as_deref(), hasher) {
        let calculated = hex::encode(hasher.finalize());
        let expected = expected.to_lowercase();
        if calculated != expected {
            let corrupt_path = with_appended_suffix(&save_path, "corrupt");
            remove_if_exists(&corrupt_path).await?;
            fs::rename(&temp_path, &corrupt_path).await?;
            warn!(url = %spec.url, path = %corrupt_path.display(), "corrupt download");
            return Err(DownloadError::CorruptDownload {
                path: corrupt_path,
                url: spec.url.clone(),
                calculated_hash: calculated,
                expected_hash: expected,
            });
        }
    }

    remove_if_exists(&save_path).await?;
    fs::rename(&temp_path, &save_path).await?;
    Ok(save_path)
}

/// Download many files concurrently, yielding results as they finish.
///
/// At most `max_concurrent` downloads are in flight at any time. A value
/// of zero is treated as one.
pub fn download_parallel_stream<'a, T>(
    client: &'a reqwest::Client,
    items: Vec<DownloadSpecs<T>>,
    max_concurrent: usize,
) -> impl Stream<Item = DownloadResult<T>> + 'a
where
    T: 'a,
{
    stream::iter(items)
        .map(move |spec| async move {
            let result = download(client, &spec).await;
            DownloadResult {
                url: spec.url,
                result,
                info: spec.info,
            }
        })
        .buffer_unordered(max_concurrent.max(1))
}

/// Download many files concurrently and collect the results in
/// completion order.
pub async fn download_parallel<T>(
    client: &reqwest::Client,
    items: Vec<DownloadSpecs<T>>,
    max_concurrent: usize,
) -> Vec<DownloadResult<T>> {
    download_parallel_stream(client, items, max_concurrent)
        .collect()
        .await
}

/// Last percent-decoded path segment of `url`, `None` when empty.
fn filename_from_url(url: &str) -> Result<Option<String>> {
    let parsed = url::Url::parse(url).map_err(|e| DownloadError::InvalidUrl(format!("{url}: {e}")))?;
    let last = parsed.path().rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(last)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string());
    if decoded.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(decoded))
    }
}

fn next_free_name(dir: &Path) -> String {
    let mut num = 1;
    loop {
        let name = format!("file{num:04}");
        if !dir.join(&name).is_file() {
            return name;
        }
        num += 1;
    }
}

/// Replace `/name/` in `pattern` with the stem of `filename` and keep
/// its extension.
fn apply_stem_pattern(filename: &str, pattern: &str) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut out = pattern.replace(NAME_PLACEHOLDER, &stem);
    if let Some(ext) = path.extension() {
        out.push('.');
        out.push_str(&ext.to_string_lossy());
    }
    out
}

fn with_appended_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(suffix);
    PathBuf::from(os)
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
