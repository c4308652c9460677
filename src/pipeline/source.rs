//! Source resolution: slugs to files below the content root, and back.
//!
//! ## Layout
//!
//! ```text
//! Compendium/
//! ├── science/
//! │   ├── index.md            → ["science"]                 (section)
//! │   └── physics/
//! │       ├── index.md        → ["science", "physics"]      (subsection)
//! │       └── quantum.md      → ["science", "physics", "quantum"]
//! │       └── img/figure.png  published beside the pages of physics/
//! ├── _incoming/…             skipped: drafts awaiting review
//! ├── _debug/…                skipped
//! └── .git/…                  skipped: hidden
//! ```
//!
//! A slug resolves to `<root>/<segments>.md` first and falls back to
//! `<root>/<segments>/index.md`, so a section can be either a file or a
//! directory with an index page.

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::slug::Slug;
use jwalk::WalkDir;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reads documents from one content root.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    root: PathBuf,
    suffix: String,
    index_name: String,
    ignored_names: Vec<String>,
}

impl DocumentSource {
    pub fn new(config: &PublishConfig) -> Self {
        Self {
            root: config.content_root.clone(),
            suffix: config.document_suffix.clone(),
            index_name: config.index_name.clone(),
            ignored_names: config.ignored_names.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate files for `slug`, in resolution order.
    pub fn candidates(&self, slug: &Slug) -> [PathBuf; 2] {
        let segments = slug.segments();
        let mut dir = self.root.clone();
        for seg in &segments[..segments.len().saturating_sub(1)] {
            dir.push(seg);
        }
        let last = segments.last().map(String::as_str).unwrap_or_default();

        let file = dir.join(format!("{last}.{}", self.suffix));
        let index = dir.join(last).join(format!("{}.{}", self.index_name, self.suffix));
        [file, index]
    }

    /// Locate the file for `slug`.
    pub async fn resolve(&self, slug: &Slug) -> Result<PathBuf, PublishError> {
        let [file, index] = self.candidates(slug);
        for candidate in [&file, &index] {
            match tokio::fs::metadata(candidate).await {
                Ok(meta) if meta.is_file() => return Ok(candidate.clone()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    return Err(PublishError::PermissionDenied {
                        path: candidate.clone(),
                    });
                }
                Err(_) => {}
            }
        }
        Err(PublishError::SourceNotFound { path: file })
    }

    /// Resolve and read `slug`. Returns the path that was read and its text.
    pub async fn read(&self, slug: &Slug) -> Result<(PathBuf, String), PublishError> {
        let path = self.resolve(slug).await?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| read_error(&path, e))?;
        debug!("Read {} ({} bytes)", path.display(), text.len());
        Ok((path, text))
    }

    /// Every publishable slug below the root, sorted and deduplicated.
    ///
    /// Hidden entries and ignored names are skipped. `index.md`
    /// stands for its directory; the root's own index is not a document.
    pub async fn enumerate(&self) -> Result<Vec<Slug>, PublishError> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.enumerate_blocking())
            .await
            .map_err(|e| PublishError::Internal(format!("Enumeration task panicked: {}", e)))?
    }

    fn enumerate_blocking(&self) -> Result<Vec<Slug>, PublishError> {
        if !self.root.is_dir() {
            return Err(PublishError::ContentRootMissing {
                path: self.root.clone(),
            });
        }
        // An unreadable root is an error, not an empty site.
        std::fs::read_dir(&self.root).map_err(|e| read_error(&self.root, e))?;

        let ignored = self.ignored_names.clone();
        let walker = WalkDir::new(&self.root)
            .skip_hidden(true)
            .process_read_dir(move |_, _, _, children| {
                children.retain(|child| match child {
                    Ok(entry) => !entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| ignored.iter().any(|i| i == name)),
                    Err(_) => true,
                });
            });

        let mut slugs = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(slug) = self.slug_for(&entry.path()) {
                slugs.push(slug);
            }
        }

        slugs.sort();
        slugs.dedup();
        info!(
            "Found {} document(s) under {}",
            slugs.len(),
            self.root.display()
        );
        Ok(slugs)
    }

    /// Slug for a file below the root, or `None` when it is not a document.
    fn slug_for(&self, path: &Path) -> Option<Slug> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            let Some(part) = component.as_os_str().to_str() else {
                debug!("Skipping non-UTF-8 name {}", path.display());
                return None;
            };
            segments.push(part.to_owned());
        }

        let name = segments.pop()?;
        let stem = self.document_stem(&name)?;
        if stem != self.index_name {
            segments.push(stem.to_owned());
        } else if segments.is_empty() {
            // The root's own index is the site home, not a document.
            return None;
        }
        match Slug::new(segments) {
            Ok(slug) => Some(slug),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Image files published next to the document at `path`.
    ///
    /// Images live in an `img/` directory beside the source file. Only
    /// regular files with a known image extension are listed, sorted by name.
    pub async fn images(&self, path: &Path) -> Vec<PathBuf> {
        let Some(dir) = path.parent().map(|p| p.join(IMAGE_DIR)) else {
            return Vec::new();
        };
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut images = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Stopped listing {}: {}", dir.display(), e);
                    break;
                }
            };
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !hidden && is_file && is_image(&path) {
                images.push(path);
            }
        }
        images.sort();
        images
    }

    /// File stem when `name` carries the document suffix (any case).
    fn document_stem<'a>(&self, name: &'a str) -> Option<&'a str> {
        let (stem, ext) = name.rsplit_once('.')?;
        (!stem.is_empty() && ext.eq_ignore_ascii_case(&self.suffix)).then_some(stem)
    }
}

/// Directory beside a document that holds its images.
pub const IMAGE_DIR: &str = "img";

const IMAGE_EXTENSIONS: &[&str] = &["avif", "png", "jpg", "jpeg", "gif", "webp"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|i| ext.eq_ignore_ascii_case(i)))
}

fn read_error(path: &Path, e: io::Error) -> PublishError {
    let path = path.to_path_buf();
    match e.kind() {
        io::ErrorKind::NotFound => PublishError::SourceNotFound { path },
        io::ErrorKind::PermissionDenied => PublishError::PermissionDenied { path },
        io::ErrorKind::InvalidData => PublishError::NotUtf8 { path },
        _ => PublishError::SourceRead { path, source: e },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> (TempDir, DocumentSource) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("science/physics")).unwrap();
        fs::create_dir_all(root.join("_incoming")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("science/_debug")).unwrap();
        fs::create_dir_all(root.join("science/physics/img")).unwrap();
        fs::write(root.join("index.md"), "# Home").unwrap();
        fs::write(root.join("science/index.md"), "# Science").unwrap();
        fs::write(root.join("science/physics/index.md"), "# Physics").unwrap();
        fs::write(root.join("science/physics/quantum.md"), "# Quantum").unwrap();
        fs::write(root.join("science/physics/Notes.MD"), "# Notes").unwrap();
        fs::write(root.join("science/physics/figure.png"), [0u8; 4]).unwrap();
        fs::write(root.join("_incoming/draft.md"), "# Draft").unwrap();
        fs::write(root.join(".git/HEAD.md"), "x").unwrap();
        fs::write(root.join(".hidden.md"), "x").unwrap();
        fs::write(root.join("science/_debug/trace.md"), "x").unwrap();
        fs::write(root.join("science/physics/img/wave.png"), [0u8; 4]).unwrap();
        fs::write(root.join("science/physics/img/Plot.JPG"), [0u8; 4]).unwrap();
        fs::write(root.join("science/physics/img/notes.txt"), "x").unwrap();
        fs::write(root.join("science/physics/img/.thumb.png"), [0u8; 4]).unwrap();

        let config = PublishConfig::builder().content_root(root).build().unwrap();
        let source = DocumentSource::new(&config);
        (dir, source)
    }

    #[tokio::test]
    async fn enumerates_articles_and_sections() {
        let (_dir, source) = tree();
        let slugs: Vec<String> = source
            .enumerate()
            .await
            .unwrap()
            .iter()
            .map(Slug::join)
            .collect();
        assert_eq!(
            slugs,
            vec![
                "science",
                "science/physics",
                "science/physics/Notes",
                "science/physics/quantum",
            ]
        );
    }

    #[tokio::test]
    async fn custom_ignored_names_replace_defaults() {
        let (dir, _) = tree();
        let config = PublishConfig::builder()
            .content_root(dir.path())
            .ignored_names(["physics"])
            .build()
            .unwrap();
        let slugs: Vec<String> = DocumentSource::new(&config)
            .enumerate()
            .await
            .unwrap()
            .iter()
            .map(Slug::join)
            .collect();
        assert_eq!(slugs, vec!["_incoming/draft", "science", "science/_debug/trace"]);
    }

    #[tokio::test]
    async fn lists_images_beside_a_document() {
        let (dir, source) = tree();
        let images = source
            .images(&dir.path().join("science/physics/quantum.md"))
            .await;
        let img = dir.path().join("science/physics/img");
        assert_eq!(images, vec![img.join("Plot.JPG"), img.join("wave.png")]);

        let none = source.images(&dir.path().join("science/index.md")).await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn missing_root_is_reported() {
        let config = PublishConfig::builder()
            .content_root("/definitely/not/here")
            .build()
            .unwrap();
        let err = DocumentSource::new(&config).enumerate().await.unwrap_err();
        assert!(matches!(err, PublishError::ContentRootMissing { .. }));
    }

    #[tokio::test]
    async fn resolves_file_then_index() {
        let (dir, source) = tree();
        let quantum = source
            .resolve(&Slug::parse("science/physics/quantum").unwrap())
            .await
            .unwrap();
        assert_eq!(quantum, dir.path().join("science/physics/quantum.md"));

        let physics = source
            .resolve(&Slug::parse("science/physics").unwrap())
            .await
            .unwrap();
        assert_eq!(physics, dir.path().join("science/physics/index.md"));
    }

    #[tokio::test]
    async fn missing_document_names_primary_candidate() {
        let (dir, source) = tree();
        let err = source
            .read(&Slug::parse("science/chemistry").unwrap())
            .await
            .unwrap_err();
        match err {
            PublishError::SourceNotFound { path } => {
                assert_eq!(path, dir.path().join("science/chemistry.md"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_utf8_is_reported() {
        let (dir, source) = tree();
        fs::write(dir.path().join("science/bad.md"), [0xff, 0xfe, 0x00]).unwrap();
        let err = source
            .read(&Slug::parse("science/bad").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::NotUtf8 { .. }), "{err}");
    }
}
