//! Configuration types for Markdown transformation.
//!
//! All behaviour is controlled through [`TransformConfig`], built via its
//! [`TransformConfigBuilder`]. The transforms themselves are named by
//! [`Transform`] and grouped into a [`TransformSet`].

use crate::error::TransformMdError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Default per-image download timeout in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every image request.
pub const DEFAULT_USER_AGENT: &str = concat!("transform-md/", env!("CARGO_PKG_VERSION"));

/// One named text transform.
///
/// Variant order is the logical order of effect and the order used when
/// listing or serialising a [`TransformSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Turn `Code snippet` sentinel lines into opening fences.
    CodeSnippet,
    /// Close sentinel-opened mermaid blocks and unterminated fences.
    CloseFences,
    /// Collapse runs of three or more blank lines down to two.
    CollapseBlanks,
}

impl Transform {
    /// Every transform, in logical order.
    pub const ALL: [Transform; 3] = [
        Transform::CodeSnippet,
        Transform::CloseFences,
        Transform::CollapseBlanks,
    ];

    /// The identifier used on the command line.
    pub fn id(self) -> &'static str {
        match self {
            Transform::CodeSnippet => "code_snippet",
            Transform::CloseFences => "close_fences",
            Transform::CollapseBlanks => "collapse_blanks",
        }
    }

    /// One-line description shown by `--list-transforms`.
    pub fn description(self) -> &'static str {
        match self {
            Transform::CodeSnippet => "Convert 'Code snippet' lines into fences (default on)",
            Transform::CloseFences => {
                "Auto-close fences started by transforms and unclosed triple-backticks (default on)"
            }
            Transform::CollapseBlanks => "Collapse long blank runs to two blank lines (default on)",
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Transform {
    type Err = TransformMdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Transform::ALL
            .into_iter()
            .find(|t| t.id() == name)
            .ok_or_else(|| TransformMdError::UnknownTransform {
                name: name.to_string(),
            })
    }
}

/// The set of enabled transforms. Default: all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformSet(BTreeSet<Transform>);

impl Default for TransformSet {
    fn default() -> Self {
        Self(Transform::ALL.into_iter().collect())
    }
}

impl TransformSet {
    /// A set with nothing enabled.
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Exactly the given transforms.
    pub fn only(transforms: impl IntoIterator<Item = Transform>) -> Self {
        Self(transforms.into_iter().collect())
    }

    /// The defaults minus `skip`.
    pub fn without(skip: impl IntoIterator<Item = Transform>) -> Self {
        let mut set = Self::default();
        for t in skip {
            set.0.remove(&t);
        }
        set
    }

    pub fn contains(&self, t: Transform) -> bool {
        self.0.contains(&t)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Transform> + '_ {
        self.0.iter().copied()
    }
}

/// Configuration for one transform run.
///
/// Built via [`TransformConfig::builder()`] or using
/// [`TransformConfig::default()`].
///
/// # Example
/// ```rust
/// use transform_md::{Transform, TransformConfig, TransformSet};
///
/// let config = TransformConfig::builder()
///     .transforms(TransformSet::without([Transform::CollapseBlanks]))
///     .download_images(true)
///     .build()
///     .unwrap();
/// assert!(!config.transforms.contains(Transform::CollapseBlanks));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Enabled text transforms. Default: all.
    pub transforms: TransformSet,

    /// Download `![Image of …](http…)` references into `images/`. Default: false.
    pub download_images: bool,

    /// Per-image download timeout in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// User agent sent with image requests.
    pub user_agent: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            transforms: TransformSet::default(),
            download_images: false,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TransformConfig {
    /// Create a new builder for `TransformConfig`.
    pub fn builder() -> TransformConfigBuilder {
        TransformConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TransformConfig`].
#[derive(Debug)]
pub struct TransformConfigBuilder {
    config: TransformConfig,
}

impl TransformConfigBuilder {
    pub fn transforms(mut self, set: TransformSet) -> Self {
        self.config.transforms = set;
        self
    }

    pub fn download_images(mut self, v: bool) -> Self {
        self.config.download_images = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TransformConfig, TransformMdError> {
        let c = &self.config;
        if c.download_timeout_secs == 0 {
            return Err(TransformMdError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.user_agent.trim().is_empty() {
            return Err(TransformMdError::InvalidConfig(
                "User agent must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
