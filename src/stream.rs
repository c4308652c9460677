//! Streaming site build: emit documents as they complete.
//!
//! [`crate::site::build_site`] returns only after every document is done.
//! [`build_stream`] yields each `Result<AssembledDocument, DocumentFailure>`
//! as soon as it is ready, so a publisher can start writing pages to disk
//! while the rest of the tree is still rendering. Items arrive in completion
//! order; sort by slug if order matters.

use crate::assemble::Assembler;
use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::output::{AssembledDocument, DocumentFailure};
use crate::site::assemble_tracked;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-document results.
pub type DocumentStream =
    Pin<Box<dyn Stream<Item = Result<AssembledDocument, DocumentFailure>> + Send>>;

/// Enumerate the content root and stream assembled documents.
///
/// # Returns
/// - `Ok(DocumentStream)` — one item per enumerated slug
/// - `Err(PublishError)` — enumeration failed (missing root, etc.)
///
/// # Example
/// ```rust,no_run
/// use gitopedia_render::{build_stream, PublishConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PublishConfig::builder().content_root("Compendium").build()?;
/// let mut docs = build_stream(&config).await?;
/// while let Some(doc) = docs.next().await {
///     match doc {
///         Ok(d) => println!("{}: {} bytes", d.slug, d.html.len()),
///         Err(f) => eprintln!("{}: {}", f.slug, f.error),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn build_stream(config: &PublishConfig) -> Result<DocumentStream, PublishError> {
    build_stream_with(Assembler::new(config.clone())).await
}

/// [`build_stream`] with a caller-configured [`Assembler`].
pub async fn build_stream_with(assembler: Assembler) -> Result<DocumentStream, PublishError> {
    let slugs = assembler.source().enumerate().await?;
    let concurrency = assembler.config().concurrency;
    info!("Streaming {} document(s)", slugs.len());

    if let Some(ref cb) = assembler.config().progress_callback {
        cb.on_build_start(slugs.len());
    }

    let assembler = Arc::new(assembler);
    let s = stream::iter(slugs.into_iter().map(move |slug| {
        let assembler = Arc::clone(&assembler);
        async move { assemble_tracked(&assembler, slug).await }
    }))
    .buffer_unordered(concurrency);

    Ok(Box::pin(s))
}
