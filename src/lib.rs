//! # transform-md
//!
//! Clean up Markdown exported from chat assistants.
//!
//! Chat exports mark diagrams and code with a bare `Code snippet` line
//! instead of a fence, leave fences unterminated, pad sections with long
//! runs of blank lines, and reference generated images by URLs that expire.
//! This crate fixes the text in one line-oriented pass and can optionally
//! download those images next to the output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .md file
//!  │
//!  ├─ 1. Read    whole file, UTF-8
//!  ├─ 2. Text    sentinel → fence, close fences, collapse blank runs
//!  ├─ 3. Images  optional: fetch `![Image of …](http…)` into images/
//!  └─ 4. Write   atomic rename over the output path
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use transform_md::{transform_text, TransformSet};
//!
//! let out = transform_text("Code snippet\ngraph TD\n\nDone\n", &TransformSet::default());
//! assert_eq!(out, "```mermaid\ngraph TD\n\n```\n\nDone\n");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `transform-md` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Transform, TransformConfig, TransformConfigBuilder, TransformSet};
pub use convert::{list_markdown_files, transform_dir, transform_file, transform_file_sync};
pub use error::{ImageError, TransformMdError};
pub use output::{FileReport, ImageStats, RunReport};
pub use pipeline::images::{localize_images, localize_images_with, FetchedImage, HttpFetcher, ImageFetcher};
pub use pipeline::text::transform_text;
