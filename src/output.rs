//! Result types reported by the conversion entry points.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of the image localizer for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStats {
    /// `Image of` references found.
    pub found: usize,
    /// References rewritten to a local file.
    pub downloaded: usize,
    /// References left pointing at their original URL.
    pub failed: usize,
}

/// One transformed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// `None` when image download was not requested.
    pub images: Option<ImageStats>,
}

/// Every document written by one invocation, in processing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
}

impl RunReport {
    /// Paths written, in order.
    pub fn written(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter().map(|f| &f.output)
    }

    /// Image totals across all files.
    pub fn image_totals(&self) -> ImageStats {
        self.files
            .iter()
            .filter_map(|f| f.images)
            .fold(ImageStats::default(), |acc, s| ImageStats {
                found: acc.found + s.found,
                downloaded: acc.downloaded + s.downloaded,
                failed: acc.failed + s.failed,
            })
    }
}
