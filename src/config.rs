//! Configuration types for rendering a content tree.
//!
//! All behaviour is controlled through [`PublishConfig`], built via its
//! [`PublishConfigBuilder`]. The content root is part of the configuration
//! rather than read from the process environment, so two builds over
//! different trees can run side by side in one process. Only the CLI maps
//! `GITOPEDIA_DIR` into the builder.

use crate::error::PublishError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for rendering documents below a content root.
///
/// Built via [`PublishConfig::builder()`] or using
/// [`PublishConfig::default()`].
///
/// # Example
/// ```rust
/// use gitopedia_render::PublishConfig;
///
/// let config = PublishConfig::builder()
///     .content_root("Compendium")
///     .concurrency(16)
///     .build()
///     .unwrap();
/// assert_eq!(config.document_suffix, "md");
/// ```
#[derive(Clone)]
pub struct PublishConfig {
    /// Directory holding the source tree. Default: `Compendium`.
    pub content_root: PathBuf,

    /// Authoring file suffix, without the dot. Default: `md`.
    ///
    /// Used both to resolve slugs to files and to strip the suffix from
    /// internal hyperlinks in rendered HTML.
    pub document_suffix: String,

    /// File stem that marks a section index page. Default: `index`.
    pub index_name: String,

    /// Entry names skipped while walking the content root, at any depth.
    /// Default: `_incoming` (drafts awaiting review) and `_debug`.
    ///
    /// Hidden entries (leading `.`) are always skipped.
    pub ignored_names: Vec<String>,

    /// Number of documents rendered concurrently in a site build. Default: 8.
    pub concurrency: usize,

    /// Markdown engine extensions.
    pub markdown: MarkdownOptions,

    /// Optional progress callback for site builds.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("Compendium"),
            document_suffix: "md".to_string(),
            index_name: "index".to_string(),
            ignored_names: vec!["_incoming".to_string(), "_debug".to_string()],
            concurrency: 8,
            markdown: MarkdownOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("content_root", &self.content_root)
            .field("document_suffix", &self.document_suffix)
            .field("index_name", &self.index_name)
            .field("ignored_names", &self.ignored_names)
            .field("concurrency", &self.concurrency)
            .field("markdown", &self.markdown)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BuildProgressCallback>"),
            )
            .finish()
    }
}

impl PublishConfig {
    /// Create a new builder for `PublishConfig`.
    pub fn builder() -> PublishConfigBuilder {
        PublishConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PublishConfig`].
#[derive(Debug)]
pub struct PublishConfigBuilder {
    config: PublishConfig,
}

impl PublishConfigBuilder {
    pub fn content_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.content_root = root.into();
        self
    }

    /// Accepts `md` or `.md`.
    pub fn document_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix: String = suffix.into();
        self.config.document_suffix = suffix.trim_start_matches('.').to_string();
        self
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.config.index_name = name.into();
        self
    }

    /// Replace the ignored-name list.
    pub fn ignored_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ignored_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Add one name to the ignored-name list.
    pub fn ignore_name(mut self, name: impl Into<String>) -> Self {
        self.config.ignored_names.push(name.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn markdown(mut self, options: MarkdownOptions) -> Self {
        self.config.markdown = options;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PublishConfig, PublishError> {
        let c = &self.config;
        if c.content_root.as_os_str().is_empty() {
            return Err(PublishError::InvalidConfig(
                "content root must not be empty".into(),
            ));
        }
        if c.document_suffix.is_empty() || c.document_suffix.contains(['.', '/', '\\']) {
            return Err(PublishError::InvalidConfig(format!(
                "document suffix must be a bare extension like 'md', got '{}'",
                c.document_suffix
            )));
        }
        if c.index_name.is_empty() {
            return Err(PublishError::InvalidConfig(
                "index name must not be empty".into(),
            ));
        }
        if let Some(bad) = c
            .ignored_names
            .iter()
            .find(|n| n.is_empty() || n.contains(['/', '\\']))
        {
            return Err(PublishError::InvalidConfig(format!(
                "ignored names must be single path components, got '{}'",
                bad
            )));
        }
        if c.concurrency == 0 {
            return Err(PublishError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Extensions enabled on the default Markdown engine.
///
/// Math is always on: the normaliser's whole output contract is the `$…$` /
/// `$$…$$` dialect. Footnotes are always off: the engine must leave `[^id]`
/// markers alone so [`crate::pipeline::footnotes`] can restructure them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownOptions {
    /// GFM tables. Default: true.
    pub tables: bool,
    /// `~~strikethrough~~`. Default: true.
    pub strikethrough: bool,
    /// Typographic quotes and dashes. Default: false.
    pub smart_punctuation: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            smart_punctuation: false,
        }
    }
}
