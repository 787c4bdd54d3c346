//! File and directory conversion entry points.
//!
//! These wrap the [`crate::pipeline`] stages with whole-file I/O: read the
//! document, run the text transformer, optionally localise images next to
//! the output, then write the result atomically.

use crate::config::TransformConfig;
use crate::error::TransformMdError;
use crate::output::{FileReport, RunReport};
use crate::pipeline::{images, text};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Transform one Markdown file.
///
/// # Arguments
/// * `input`  — Markdown file to read
/// * `output` — Where to write; `None` overwrites `input`
/// * `config` — Transforms to apply and whether to download images
///
/// When image download is enabled the `images/` directory is created next
/// to the output file.
///
/// # Errors
/// Only fatal errors: unreadable input, unwritable output, or an `images/`
/// directory that cannot be created. Individual image failures are reported
/// in [`FileReport::images`] instead.
pub async fn transform_file(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    config: &TransformConfig,
) -> Result<FileReport, TransformMdError> {
    let input = input.as_ref();
    let output = output.unwrap_or(input);
    debug!("Transforming {} -> {}", input.display(), output.display());

    let source = read_document(input).await?;
    let mut markdown = text::transform_text(&source, &config.transforms);

    let image_stats = if config.download_images {
        let target_dir = output.parent().unwrap_or_else(|| Path::new(""));
        let (localised, stats) = images::localize_images(&markdown, target_dir, config).await?;
        markdown = localised;
        info!(
            "{}: {}/{} images downloaded",
            output.display(),
            stats.downloaded,
            stats.found
        );
        Some(stats)
    } else {
        None
    };

    write_atomic(output, &markdown).await?;
    info!("Wrote {}", output.display());

    Ok(FileReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        images: image_stats,
    })
}

/// Transform every `*.md` file directly inside `indir` into `outdir`.
///
/// Files are processed one at a time in lexicographic order and keep their
/// names. `outdir` is created if missing.
pub async fn transform_dir(
    indir: impl AsRef<Path>,
    outdir: impl AsRef<Path>,
    config: &TransformConfig,
) -> Result<RunReport, TransformMdError> {
    let indir = indir.as_ref();
    let outdir = outdir.as_ref();

    let inputs = list_markdown_files(indir).await?;
    info!("Found {} Markdown files in {}", inputs.len(), indir.display());

    tokio::fs::create_dir_all(outdir)
        .await
        .map_err(|e| TransformMdError::OutputWriteFailed {
            path: outdir.to_path_buf(),
            source: e,
        })?;

    let mut report = RunReport::default();
    for input in inputs {
        let Some(name) = input.file_name() else {
            continue;
        };
        let target = outdir.join(name);
        report
            .files
            .push(transform_file(&input, Some(target.as_path()), config).await?);
    }
    Ok(report)
}

/// Blocking wrapper around [`transform_file`].
///
/// Runs on a fresh single-threaded runtime; do not call from inside an
/// async context.
pub fn transform_file_sync(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    config: &TransformConfig,
) -> Result<FileReport, TransformMdError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TransformMdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(transform_file(input, output, config))
}

/// Regular `*.md` files directly inside `dir`, sorted.
pub async fn list_markdown_files(dir: &Path) -> Result<Vec<PathBuf>, TransformMdError> {
    let not_a_dir = |_: std::io::Error| TransformMdError::NotADirectory {
        path: dir.to_path_buf(),
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(not_a_dir)?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(not_a_dir)? {
        let path = entry.path();
        let is_md = path.extension().is_some_and(|ext| ext == "md");
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if is_md && is_file {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn read_document(path: &Path) -> Result<String, TransformMdError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => TransformMdError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => TransformMdError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    String::from_utf8(bytes).map_err(|_| TransformMdError::InvalidUtf8 {
        path: path.to_path_buf(),
    })
}

/// Write to a sibling temp file, then rename over `path`.
async fn write_atomic(path: &Path, contents: &str) -> Result<(), TransformMdError> {
    let write_failed = |e: std::io::Error| TransformMdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overwrites_input_when_no_output_given() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.md");
        std::fs::write(&path, "Line1\nCode snippet\nLine3\n").unwrap();

        let report = transform_file(&path, None, &TransformConfig::default())
            .await
            .unwrap();

        assert_eq!(report.output, path);
        assert!(report.images.is_none());
        let got = std::fs::read_to_string(&path).unwrap();
        assert!(got.contains("```mermaid"), "got: {got}");
        assert!(!dir.path().join("in.md.tmp").exists());
    }

    #[tokio::test]
    async fn missing_input_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = transform_file(dir.path().join("nope.md"), None, &TransformConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransformMdError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn non_utf8_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.md");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = transform_file(&path, None, &TransformConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransformMdError::InvalidUtf8 { .. }));
    }

    #[tokio::test]
    async fn lists_only_md_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.md", "a.md", "notes.txt", "c.markdown"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.md")).unwrap();

        let files = list_markdown_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }

    #[tokio::test]
    async fn missing_indir_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_markdown_files(&dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransformMdError::NotADirectory { .. }));
    }

    #[test]
    fn sync_wrapper_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.md");
        let output = dir.path().join("out.md");
        std::fs::write(&input, "a\n\n\n\n\nb\n").unwrap();

        transform_file_sync(&input, Some(output.as_path()), &TransformConfig::default()).unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "a\n\n\nb\n");
        assert_eq!(std::fs::read_to_string(&input).unwrap(), "a\n\n\n\n\nb\n");
    }
}
