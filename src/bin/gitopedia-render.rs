//! CLI binary for gitopedia-render.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PublishConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use gitopedia_render::{
    build_site, build_site_to_file, Assembler, BuildProgressCallback, ProgressCallback,
    PublishConfig, Slug,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per document.
/// Documents complete out of order, so start times are keyed by slug.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_build_start` reports the document count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning content root…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn elapsed_ms(&self, slug: &str) -> u128 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(slug))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }
}

impl BuildProgressCallback for CliProgressCallback {
    fn on_build_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, slug: &str) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(slug.to_string(), Instant::now());
        }
        self.bar.set_message(slug.to_string());
    }

    fn on_document_complete(&self, slug: &str, html_len: usize, fallback: bool) {
        let elapsed_ms = self.elapsed_ms(slug);
        let mark = if fallback { yellow("⚠") } else { green("✓") };
        let note = if fallback {
            yellow("  fallback: escaped source")
        } else {
            String::new()
        };
        self.bar.println(format!(
            "  {} {:<48}  {}  {}{}",
            mark,
            slug,
            dim(&format!("{html_len:>7} bytes")),
            dim(&format!("{elapsed_ms}ms")),
            note,
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, slug: &str, error: &str) {
        let elapsed_ms = self.elapsed_ms(slug);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let mut s: String = error.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:<48}  {}  {}",
            red("✗"),
            slug,
            red(&msg),
            dim(&format!("{elapsed_ms}ms")),
        ));
        self.bar.inc(1);
    }

    fn on_build_complete(&self, total_documents: usize, success_count: usize) {
        let failed = self
            .errors
            .load(Ordering::SeqCst)
            .max(total_documents.saturating_sub(success_count));
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents rendered",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents rendered  ({} failed)",
                if failed == total_documents {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render the whole Compendium to JSON on stdout
  gitopedia-render

  # Render the whole site into a file
  gitopedia-render -o public/site.json

  # One article as JSON (slug, metadata, html, pageKind, renderFallback)
  gitopedia-render science/physics/quantum

  # Just the HTML fragment of a section page
  gitopedia-render --html science

  # List every publishable slug
  gitopedia-render --list

  # A different content tree
  GITOPEDIA_DIR=/srv/wiki gitopedia-render --list

CONTENT LAYOUT:
  <root>/science/index.md              → science                  (section)
  <root>/science/physics/index.md      → science/physics          (subsection)
  <root>/science/physics/quantum.md    → science/physics/quantum  (article)
  <root>/…/_incoming/, <root>/…/_debug/  never published (add more with --ignore)
  <root>/science/physics/img/*.png     copied to <out>/science/physics/…/img/ with -o
  hidden files and directories         never published

ENVIRONMENT VARIABLES:
  GITOPEDIA_DIR   Content root (default: Compendium)
  RUST_LOG        Override log filtering (e.g. gitopedia_render=debug)
"#;

/// Render Gitopedia Markdown articles to HTML fragments.
#[derive(Parser, Debug)]
#[command(
    name = "gitopedia-render",
    version,
    about = "Render Gitopedia Markdown articles to publish-ready HTML fragments",
    long_about = "Render Gitopedia Markdown articles (YAML front matter + Markdown) into \
HTML fragments with canonical math, superscript footnotes with a reference list, and \
site-absolute links. Without slugs, renders every document under the content root.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Slugs to render, e.g. `science/physics/quantum`. Default: the whole site.
    slugs: Vec<String>,

    /// Content root holding the Markdown tree.
    #[arg(long, env = "GITOPEDIA_DIR", default_value = "Compendium")]
    root: PathBuf,

    /// Print every publishable slug and exit.
    #[arg(long, conflicts_with_all = ["slugs", "html", "output"])]
    list: bool,

    /// Print only the HTML fragment(s) instead of JSON.
    #[arg(long)]
    html: bool,

    /// Write output to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra directory or file name to skip while walking the tree
    /// (repeatable; `_incoming` and `_debug` are always skipped).
    #[arg(long = "ignore", value_name = "NAME")]
    ignore: Vec<String>,

    /// Number of documents rendered concurrently.
    #[arg(short, long, env = "GITOPEDIA_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar only runs for whole-site builds; while it is active
    // INFO logs would tear through it.
    let site_build = cli.slugs.is_empty() && !cli.list;
    let show_progress = site_build && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn BuildProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── List mode ────────────────────────────────────────────────────────
    if cli.list {
        let assembler = Assembler::new(config);
        let slugs = assembler
            .source()
            .enumerate()
            .await
            .context("Failed to enumerate documents")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for slug in &slugs {
            writeln!(handle, "{slug}").context("Failed to write to stdout")?;
        }
        return Ok(());
    }

    // ── Selected slugs ───────────────────────────────────────────────────
    if !site_build {
        return render_slugs(&cli, config).await;
    }

    // ── Whole site ───────────────────────────────────────────────────────
    if let (Some(output_path), false) = (&cli.output, cli.html) {
        let stats = build_site_to_file(&config, output_path)
            .await
            .context("Site build failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}/{} documents  {} fallback(s)  {} image(s)  {}ms  →  {}",
                if stats.failed == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                stats.rendered,
                stats.total_documents,
                stats.fallbacks,
                stats.images_copied,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
        return Ok(());
    }

    let site = build_site(&config).await.context("Site build failed")?;
    let text = if cli.html {
        site.documents
            .iter()
            .map(|d| format!("<!-- {} -->\n{}", d.slug, d.html))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        serde_json::to_string_pretty(&site).context("Failed to serialise output")?
    };
    emit(&cli, &text)?;

    if !cli.quiet && !show_progress {
        eprintln!(
            "Rendered {}/{} documents in {}ms",
            site.stats.rendered, site.stats.total_documents, site.stats.total_duration_ms
        );
        if site.stats.failed > 0 {
            eprintln!("  {} documents failed", site.stats.failed);
        }
    }
    Ok(())
}

/// Render explicitly named slugs. Any failure aborts with a non-zero exit.
async fn render_slugs(cli: &Cli, config: PublishConfig) -> Result<()> {
    let assembler = Assembler::new(config);
    let mut documents = Vec::with_capacity(cli.slugs.len());
    for raw in &cli.slugs {
        let slug = Slug::parse(raw).with_context(|| format!("Invalid slug '{raw}'"))?;
        let doc = assembler
            .assemble(&slug)
            .await
            .with_context(|| format!("Failed to render '{slug}'"))?;
        if doc.render_fallback && !cli.quiet {
            eprintln!(
                "{} {}: markup engine failed, published escaped source",
                yellow("⚠"),
                slug
            );
        }
        documents.push(doc);
    }

    let text = if cli.html {
        documents
            .iter()
            .map(|d| d.html.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    } else if let [single] = documents.as_slice() {
        serde_json::to_string_pretty(single).context("Failed to serialise output")?
    } else {
        serde_json::to_string_pretty(&documents).context("Failed to serialise output")?
    };
    emit(cli, &text)
}

/// Write `text` to `--output` or stdout, ensuring a trailing newline.
fn emit(cli: &Cli, text: &str) -> Result<()> {
    let mut text = text.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    match cli.output {
        Some(ref path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!("{} wrote {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

/// Map CLI args to `PublishConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PublishConfig> {
    let mut builder = PublishConfig::builder()
        .content_root(&cli.root)
        .concurrency(cli.concurrency);
    for name in &cli.ignore {
        builder = builder.ignore_name(name);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
