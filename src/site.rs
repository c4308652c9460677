//! Whole-tree builds: enumerate every slug, assemble concurrently, collect.
//!
//! ## Failure policy
//!
//! Enumeration failure (missing root) aborts the build with a
//! [`PublishError`]. A document that cannot be read becomes a
//! [`DocumentFailure`] and the build carries on; a document the Markdown
//! engine chokes on still counts as rendered, with `render_fallback` set.

use crate::assemble::Assembler;
use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::output::{AssembledDocument, BuildStats, DocumentFailure, SiteOutput};
use crate::pipeline::source::IMAGE_DIR;
use crate::slug::Slug;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Render every document below `config.content_root`.
///
/// Documents are assembled up to `config.concurrency` at a time; results are
/// sorted by slug so the output does not depend on completion order.
///
/// # Errors
/// Only [`PublishError::ContentRootMissing`] and other enumeration failures.
pub async fn build_site(config: &PublishConfig) -> Result<SiteOutput, PublishError> {
    build_site_with(&Assembler::new(config.clone())).await
}

/// [`build_site`] with a caller-configured [`Assembler`] (custom renderer).
pub async fn build_site_with(assembler: &Assembler) -> Result<SiteOutput, PublishError> {
    let start = Instant::now();
    let config = assembler.config();

    // ── Step 1: Enumerate ────────────────────────────────────────────────
    let slugs = assembler.source().enumerate().await?;
    let total = slugs.len();
    info!(
        "Building {} document(s) from {} (concurrency {})",
        total,
        config.content_root.display(),
        config.concurrency
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_build_start(total);
    }

    // ── Step 2: Assemble concurrently ────────────────────────────────────
    let results: Vec<Result<AssembledDocument, DocumentFailure>> =
        stream::iter(slugs.into_iter().map(|slug| async move {
            assemble_tracked(assembler, slug).await
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    // ── Step 3: Partition and sort ───────────────────────────────────────
    let mut documents = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(doc) => documents.push(doc),
            Err(failure) => failures.push(failure),
        }
    }
    documents.sort_by(|a, b| a.slug.cmp(&b.slug));
    failures.sort_by(|a, b| a.slug.cmp(&b.slug));

    // ── Step 4: Stats ────────────────────────────────────────────────────
    let stats = BuildStats {
        total_documents: total,
        rendered: documents.len(),
        fallbacks: documents.iter().filter(|d| d.render_fallback).count(),
        failed: failures.len(),
        images_copied: 0,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_build_complete(total, stats.rendered);
    }
    info!(
        "Build complete: {}/{} rendered, {} fallback(s), {} failed, {}ms",
        stats.rendered, total, stats.fallbacks, stats.failed, stats.total_duration_ms
    );

    Ok(SiteOutput {
        documents,
        failures,
        stats,
    })
}

/// Assemble one slug, firing progress events and downgrading a read error
/// to a [`DocumentFailure`].
pub(crate) async fn assemble_tracked(
    assembler: &Assembler,
    slug: Slug,
) -> Result<AssembledDocument, DocumentFailure> {
    let name = slug.join();
    let cb = assembler.config().progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_document_start(&name);
    }

    match assembler.assemble(&slug).await {
        Ok(doc) => {
            if let Some(cb) = cb {
                cb.on_document_complete(&name, doc.html.len(), doc.render_fallback);
            }
            Ok(doc)
        }
        Err(e) => {
            warn!("Skipping '{}': {}", name, e);
            let error = e.to_string();
            if let Some(cb) = cb {
                cb.on_document_error(&name, &error);
            }
            Err(DocumentFailure { slug: name, error })
        }
    }
}

/// Build the site and write the result to `output_path` as pretty JSON.
///
/// Each document's images are copied to `<dir>/<slug>/img/`, where `<dir>`
/// is the directory holding `output_path`. The JSON itself uses atomic
/// write (temp file + rename) to prevent partial files.
pub async fn build_site_to_file(
    config: &PublishConfig,
    output_path: impl AsRef<Path>,
) -> Result<BuildStats, PublishError> {
    let mut output = build_site(config).await?;
    let path = output_path.as_ref();

    let out_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    output.stats.images_copied = publish_images(&output, out_dir).await?;

    let json = serde_json::to_vec_pretty(&output)
        .map_err(|e| PublishError::Internal(format!("Failed to serialise site: {}", e)))?;

    let write_failed = |source| PublishError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;

    Ok(output.stats)
}

/// Copy every document's images to `<out_dir>/<slug>/img/<file>`.
///
/// Returns the number of files copied.
pub async fn publish_images(
    site: &SiteOutput,
    out_dir: impl AsRef<Path>,
) -> Result<usize, PublishError> {
    let out_dir = out_dir.as_ref();
    let mut copied = 0;
    for doc in site.documents.iter().filter(|d| !d.images.is_empty()) {
        let mut target_dir = out_dir.to_path_buf();
        target_dir.extend(doc.slug.segments());
        target_dir.push(IMAGE_DIR);

        let write_failed = |path: &Path, source| PublishError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| write_failed(&target_dir, e))?;

        for image in &doc.images {
            let Some(name) = image.file_name() else {
                continue;
            };
            let target = target_dir.join(name);
            tokio::fs::copy(image, &target)
                .await
                .map_err(|e| write_failed(&target, e))?;
            copied += 1;
        }
        debug!("Copied {} image(s) for '{}'", doc.images.len(), doc.slug);
    }
    if copied > 0 {
        info!("Published {} image(s) under {}", copied, out_dir.display());
    }
    Ok(copied)
}

/// Synchronous wrapper around [`build_site`].
///
/// Creates a temporary tokio runtime internally.
pub fn build_site_sync(config: &PublishConfig) -> Result<SiteOutput, PublishError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PublishError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build_site(config))
}
