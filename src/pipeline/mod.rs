//! Pipeline stages for chat-export cleanup.
//!
//! ## Data Flow
//!
//! ```text
//! markdown ──▶ text ──▶ images ──▶ markdown
//!             (fences,   (optional,
//!              blanks)    network)
//! ```
//!
//! 1. [`text`]   — line-oriented rewrite: sentinel lines become fences,
//!    unterminated fences are closed, blank runs collapse
//! 2. [`images`] — download `Image of` references and rewrite them to local
//!    paths; the only stage with network I/O

pub mod images;
pub mod text;
