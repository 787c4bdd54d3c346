//! Image localizer: download `![Image of …](http…)` references and point
//! them at local copies.
//!
//! Chat exports reference generated images by remote URL, and those URLs
//! expire. This stage fetches each one, stores the bytes under
//! `<target>/images/`, and rewrites the tag to the relative path.
//!
//! Failures are per reference: a fetch or write error leaves that tag's
//! original URL in place and processing moves on. The only fatal error is
//! being unable to create the `images/` directory at all.
//!
//! Fetching goes through the [`ImageFetcher`] trait so the rewrite loop can
//! be exercised without a network; [`HttpFetcher`] is the real one.

use crate::config::TransformConfig;
use crate::error::{ImageError, TransformMdError};
use crate::output::ImageStats;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Name of the directory images are stored in, relative to the target.
pub const IMAGES_DIR: &str = "images";

/// Extension used when neither the URL nor the content type gives one.
const FALLBACK_EXT: &str = ".img";

/// Alt text written into every rewritten tag.
const REWRITTEN_ALT: &str = "Image of";

static RE_IMAGE_OF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)!\[Image of[^\]]*\]\((?P<url>https?://[^)\s]+)\)").unwrap()
});

// ── Fetching ─────────────────────────────────────────────────────────────────

/// Bytes and content type of one downloaded image.
#[derive(Debug, Clone, Default)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Something that can download an image URL.
///
/// Implementations are called once per reference, sequentially.
#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageError>;
}

/// HTTP(S) fetcher backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Build a client with the configured timeout and user agent.
    pub fn new(config: &TransformConfig) -> Result<Self, TransformMdError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransformMdError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs: config.download_timeout_secs,
        })
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> ImageError {
        if e.is_timeout() {
            ImageError::Timeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            ImageError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        if !response.status().is_success() {
            return Err(ImageError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.classify(url, e))?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

// ── Rewriting ────────────────────────────────────────────────────────────────

/// Download every `Image of` reference in `text` into `<target_dir>/images/`
/// over HTTP and rewrite the tags.
pub async fn localize_images(
    text: &str,
    target_dir: &Path,
    config: &TransformConfig,
) -> Result<(String, ImageStats), TransformMdError> {
    let fetcher = HttpFetcher::new(config)?;
    localize_images_with(text, target_dir, &fetcher).await
}

/// [`localize_images`] with a caller-supplied fetcher.
///
/// Creates `<target_dir>/images/` even when `text` has no references.
pub async fn localize_images_with<F: ImageFetcher>(
    text: &str,
    target_dir: &Path,
    fetcher: &F,
) -> Result<(String, ImageStats), TransformMdError> {
    let images_dir = target_dir.join(IMAGES_DIR);
    tokio::fs::create_dir_all(&images_dir)
        .await
        .map_err(|e| TransformMdError::OutputWriteFailed {
            path: images_dir.clone(),
            source: e,
        })?;

    let mut names = NameRegistry::default();
    let mut stats = ImageStats::default();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in RE_IMAGE_OF.captures_iter(text) {
        let (Some(whole), Some(url)) = (caps.get(0), caps.name("url")) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();
        stats.found += 1;

        match localize_one(url.as_str(), &images_dir, fetcher, &mut names).await {
            Ok(file_name) => {
                debug!("Localised {} -> {}/{}", url.as_str(), IMAGES_DIR, file_name);
                stats.downloaded += 1;
                out.push_str(&format!("![{REWRITTEN_ALT}]({IMAGES_DIR}/{file_name})"));
            }
            Err(e) => {
                debug!("Keeping remote image: {}", e);
                stats.failed += 1;
                out.push_str(whole.as_str());
            }
        }
    }

    out.push_str(&text[last..]);
    Ok((out, stats))
}

/// Fetch one URL and store it; returns the file name written.
async fn localize_one<F: ImageFetcher>(
    url: &str,
    images_dir: &Path,
    fetcher: &F,
    names: &mut NameRegistry,
) -> Result<String, ImageError> {
    let image = fetcher.fetch(url).await?;

    let ext = extension_for(url, image.content_type.as_deref());
    let stem = names.claim(&stem_for(url));
    let file_name = format!("{stem}{ext}");

    let path = images_dir.join(&file_name);
    if let Err(source) = tokio::fs::write(&path, &image.bytes).await {
        return Err(ImageError::Write { path, source });
    }

    Ok(file_name)
}

// ── File naming ──────────────────────────────────────────────────────────────

/// Hands out unique stems within one localizer run: `cat`, `cat-1`, `cat-2`.
#[derive(Debug, Default)]
struct NameRegistry {
    seen: HashMap<String, usize>,
}

impl NameRegistry {
    fn claim(&mut self, stem: &str) -> String {
        let count = self.seen.entry(stem.to_string()).or_insert(0);
        let claimed = if *count == 0 {
            stem.to_string()
        } else {
            format!("{stem}-{count}")
        };
        *count += 1;
        claimed
    }
}

/// Last segment of the URL's percent-decoded path, if any.
fn last_segment(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let decoded = percent_decode_str(parsed.path()).decode_utf8_lossy();
    Path::new(decoded.as_ref())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

/// Split a file name at its last dot, treating leading and trailing dots as
/// part of the stem (`.hidden`, `name.`).
fn split_suffix(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(i) if i > 0 && i + 1 < name.len() => (&name[..i], Some(&name[i..])),
        _ => (name, None),
    }
}

/// File stem for `url`, or a short hash of the URL when the path has none.
fn stem_for(url: &str) -> String {
    last_segment(url)
        .map(|name| split_suffix(&name).0.to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| short_hash(url))
}

/// Extension (with dot) from the URL path, else the content type, else `.img`.
fn extension_for(url: &str, content_type: Option<&str>) -> String {
    if let Some(ext) = last_segment(url)
        .as_deref()
        .and_then(|name| split_suffix(name).1)
    {
        return ext.to_string();
    }
    content_type
        .and_then(extension_for_mime)
        .unwrap_or(FALLBACK_EXT)
        .to_string()
}

/// Extension for a `Content-Type` header value, ignoring parameters.
fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match mime.as_str() {
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/bmp" | "image/x-ms-bmp" => ".bmp",
        "image/tiff" => ".tiff",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        "image/avif" => ".avif",
        "image/heic" => ".heic",
        "application/pdf" => ".pdf",
        "text/plain" => ".txt",
        "text/html" => ".html",
        "application/json" => ".json",
        _ => return None,
    };
    Some(ext)
}

/// First 10 hex chars of the URL's SHA-256.
///
/// Intentionally not SHA-1: hash-named files differ from the ones the
/// earlier SHA-1 based exporter wrote, and nothing depends on matching them.
fn short_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut output = String::with_capacity(10);
    for byte in digest.iter().take(5) {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

// ── Tests ────────────────────────────────────────────────────────────────────
