//! Error types for the transform-md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TransformMdError`] — **Fatal**: the document cannot be processed at
//!   all (input missing, output not writable, bad transform name). Returned
//!   as `Err(TransformMdError)` from the top-level `transform_*` functions.
//!
//! * [`ImageError`] — **Non-fatal**: a single image reference could not be
//!   downloaded or stored. The reference keeps its original URL and the
//!   localizer moves on to the next one; the error never leaves
//!   [`crate::pipeline::images`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the transform-md library.
#[derive(Debug, Error)]
pub enum TransformMdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Markdown file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The input exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input was read but is not valid UTF-8.
    #[error("'{path}' is not valid UTF-8 text")]
    InvalidUtf8 { path: PathBuf },

    /// `--indir` points at something that is not a directory.
    #[error("Input directory not found or not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A transform identifier that does not exist.
    #[error("Unknown transform '{name}'\nAvailable: code_snippet, close_fences, collapse_blanks")]
    UnknownTransform { name: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image reference.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The request could not be sent or the body could not be read.
    #[error("Failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("Fetching '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The server answered with a non-success status.
    #[error("Fetching '{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The bytes were fetched but could not be stored.
    #[error("Failed to write image '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
