//! linkpeek CLI
//!
//! Fetch link metadata, render preview cards, and replay hovers over the
//! links of an HTML document.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use linkpeek_cache::{CacheConfig, FileStore, MemoryStore, MetaCache};
use linkpeek_core::{AnchorId, CacheStore, Geometry, MetadataRecord, PreviewConfig};
use linkpeek_fetch::{HttpTransportConfig, MetaFetcher};
use linkpeek_preview::{
    discover_links, render_card, resolve_href, MemorySurface, PreviewController, PreviewState,
    SurfaceEvent,
};

/// linkpeek - hover previews for links
#[derive(Parser)]
#[command(name = "linkpeek")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Preview configuration file (JSON); defaults to LINKPEEK_* variables
    #[arg(short, long, global = true, env = "LINKPEEK_CONFIG")]
    config: Option<PathBuf>,

    /// Cache file
    #[arg(long, global = true, env = "LINKPEEK_CACHE_FILE", default_value = ".linkpeek-cache.json")]
    cache_file: PathBuf,

    /// Keep the cache in memory only
    #[arg(long, global = true)]
    no_cache: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "10")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch metadata for a URL
    Fetch {
        /// URL to fetch
        url: String,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the preview card for a URL
    Card {
        /// URL to preview
        url: String,
        /// Anchor height in pixels
        #[arg(long, default_value = "18")]
        height: f64,
    },

    /// List the links of an HTML document
    Scan {
        /// HTML file
        file: PathBuf,
        /// Base URL for relative links
        #[arg(short, long)]
        base_url: Option<Url>,
    },

    /// Hover a link of an HTML document and report what the preview does
    Hover {
        /// HTML file
        file: PathBuf,
        /// Index of the link in document order
        #[arg(short, long)]
        link: usize,
        /// How long the pointer stays on the link, in milliseconds
        #[arg(long, default_value = "1000")]
        dwell_ms: u64,
        /// Base URL for relative links
        #[arg(short, long)]
        base_url: Option<Url>,
    },

    /// Prefetch metadata for every previewable link of an HTML document
    Warm {
        /// HTML file
        file: PathBuf,
        /// Base URL for relative links
        #[arg(short, long)]
        base_url: Option<Url>,
        /// Concurrent requests
        #[arg(short = 'j', long, default_value = "4")]
        concurrency: usize,
    },

    /// Inspect or clear the cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry counts
    Stats,
    /// Remove every cached record
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "linkpeek=debug,info"
    } else {
        "linkpeek=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_deref())?;
    let fetcher = build_fetcher(&cli, &config)?;

    match cli.command {
        Commands::Fetch { url, json } => cmd_fetch(&fetcher, &url, json).await,
        Commands::Card { url, height } => cmd_card(&fetcher, &config, &url, height).await,
        Commands::Scan { file, base_url } => cmd_scan(&config, &file, base_url.as_ref()),
        Commands::Hover {
            file,
            link,
            dwell_ms,
            base_url,
        } => cmd_hover(fetcher, config, &file, link, dwell_ms, base_url.as_ref()).await,
        Commands::Warm {
            file,
            base_url,
            concurrency,
        } => cmd_warm(&fetcher, &config, &file, base_url.as_ref(), concurrency).await,
        Commands::Cache { action } => cmd_cache(&fetcher, action),
    }
}

fn load_config(path: Option<&Path>) -> Result<PreviewConfig> {
    let config = match path {
        Some(path) => PreviewConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PreviewConfig::from_env().context("Invalid LINKPEEK_* environment")?,
    };
    config.validate().context("Invalid preview configuration")?;
    debug!(?config, "Loaded configuration");
    Ok(config)
}

fn build_fetcher(cli: &Cli, config: &PreviewConfig) -> Result<Arc<MetaFetcher>> {
    let store: Arc<dyn CacheStore> = if cli.no_cache {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            FileStore::open(&cli.cache_file)
                .with_context(|| format!("Failed to open cache {}", cli.cache_file.display()))?,
        )
    };

    let cache = MetaCache::with_store(store, CacheConfig::with_ttl_seconds(config.cache_ttl_seconds));
    let transport = HttpTransportConfig {
        timeout_seconds: cli.timeout,
        ..Default::default()
    };
    let fetcher = MetaFetcher::http(Arc::new(cache), transport).context("Failed to create fetcher")?;
    Ok(Arc::new(fetcher))
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_record(record: &MetadataRecord) {
    let or_none = |value: &str| {
        if value.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            value.to_string()
        }
    };
    println!("   {} {}", "Title:".yellow(), or_none(&record.title));
    println!("   {} {}", "Description:".yellow(), or_none(&record.description));
    println!("   {} {}", "Image:".yellow(), or_none(&record.image));
    println!("   {} {}", "Expires:".dimmed(), record.expires_at.to_rfc3339());
}

/// Fetch metadata for one URL
async fn cmd_fetch(fetcher: &MetaFetcher, url: &str, json: bool) -> Result<()> {
    let result = fetcher
        .fetch_detailed(url)
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.record)?);
        return Ok(());
    }

    let source = if result.from_cache { "cache" } else { "network" };
    println!("{} {} {}", "🔗".cyan(), url.bold(), format!("({})", source).dimmed());
    print_record(&result.record);
    Ok(())
}

/// Render the card markup for one URL
async fn cmd_card(fetcher: &MetaFetcher, config: &PreviewConfig, url: &str, height: f64) -> Result<()> {
    let record = fetcher
        .fetch(url)
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    println!("{}", render_card(config, &Geometry::new(0.0, 0.0, 0.0, height), &record));
    Ok(())
}

/// List links and whether they get previews
fn cmd_scan(config: &PreviewConfig, file: &Path, base_url: Option<&Url>) -> Result<()> {
    let html = read_document(file)?;
    let links = discover_links(&html, &config.selector);

    println!("{} {} link(s) in {}", "🔎".cyan(), links.len(), file.display());
    for link in &links {
        let href = link.href.as_deref().unwrap_or("");
        let status = match (link.has_selector, resolve_href(link.href.as_deref(), base_url)) {
            (false, _) => "unmarked".dimmed(),
            (true, Some(_)) => "preview".green(),
            (true, None) => "skipped".red(),
        };
        println!("   [{}] {:<9} {}", link.id.0, status, href);
    }
    Ok(())
}

/// Replay a hover and report the surface
async fn cmd_hover(
    fetcher: Arc<MetaFetcher>,
    config: PreviewConfig,
    file: &Path,
    link: usize,
    dwell_ms: u64,
    base_url: Option<&Url>,
) -> Result<()> {
    let html = read_document(file)?;
    let links = discover_links(&html, &config.selector);
    let transition_in = config.transition_in();
    let transition_out = config.transition_out();

    let surface = Arc::new(MemorySurface::new());
    surface.set_geometry(AnchorId(link), Geometry::new(0.0, 0.0, 0.0, 18.0));

    let controller = PreviewController::initialize(config, fetcher, surface.clone(), links, base_url)
        .context("Failed to bind links")?;
    let binding = controller
        .binding(AnchorId(link))
        .with_context(|| format!("Link {} has no preview (see `linkpeek scan`)", link))?;

    println!("{} {}", "👆 Hovering:".cyan().bold(), binding.anchor().url);
    let start = Instant::now();
    controller.pointer_enter(AnchorId(link))?;

    while binding.state() == PreviewState::Fetching {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    if binding.state() == PreviewState::Idle {
        bail!("No preview available for {}", binding.anchor().url);
    }
    println!("   {} {:?}", "Card attached after".dimmed(), start.elapsed());

    tokio::time::sleep(transition_in + Duration::from_millis(10)).await;
    if let Some(card) = binding.lifecycle().card().and_then(|card| surface.card(card)) {
        println!("\n{}", card.html);
    }

    tokio::time::sleep(Duration::from_millis(dwell_ms)).await;
    controller.pointer_leave(AnchorId(link))?;
    tokio::time::sleep(transition_out + Duration::from_millis(10)).await;

    println!("\n{}", "📋 Surface events:".yellow().bold());
    for event in surface.events() {
        match event {
            SurfaceEvent::Attached { card, anchor } => println!("   attached {} to {}", card, anchor),
            SurfaceEvent::Opacity { card, opacity } => println!("   opacity {} -> {}", card, opacity),
            SurfaceEvent::Detached { card } => println!("   detached {}", card),
        }
    }
    println!("   {} {}", "Final state:".dimmed(), binding.state());
    Ok(())
}

/// Prefetch every previewable link
async fn cmd_warm(
    fetcher: &MetaFetcher,
    config: &PreviewConfig,
    file: &Path,
    base_url: Option<&Url>,
    concurrency: usize,
) -> Result<()> {
    let html = read_document(file)?;
    let urls: Vec<String> = discover_links(&html, &config.selector)
        .into_iter()
        .filter(|link| link.has_selector)
        .filter_map(|link| resolve_href(link.href.as_deref(), base_url))
        .collect();

    if urls.is_empty() {
        println!("{}", "⚠️  No previewable links found.".yellow());
        return Ok(());
    }

    println!("{} {} link(s)", "🔥 Warming".cyan().bold(), urls.len());
    let pb = ProgressBar::new(urls.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let results: Vec<_> = stream::iter(urls.iter())
        .map(|url| async move { (url, fetcher.fetch_detailed(url).await) })
        .buffer_unordered(concurrency.max(1))
        .inspect(|_| pb.inc(1))
        .collect()
        .await;
    pb.finish_and_clear();

    let mut cached = 0;
    let mut fetched = 0;
    for (url, result) in &results {
        match result {
            Ok(r) if r.from_cache => cached += 1,
            Ok(_) => fetched += 1,
            Err(e) => println!("   {} {} {}", "✗".red(), url, e.to_string().dimmed()),
        }
    }

    println!(
        "\n{} {} fetched, {} already cached, {} failed",
        "✅".green(),
        fetched,
        cached,
        results.len() - fetched - cached
    );
    Ok(())
}

/// Cache maintenance
fn cmd_cache(fetcher: &MetaFetcher, action: CacheAction) -> Result<()> {
    let cache = fetcher.cache();
    match action {
        CacheAction::Stats => {
            let stats = cache.stats().context("Failed to read cache")?;
            println!("{}", "📊 Cache:".cyan().bold());
            println!("   {} {}", "Entries:".yellow(), stats.total_entries);
            println!("   {} {}", "Fresh:".green(), stats.valid_entries);
            println!("   {} {}", "Expired:".dimmed(), stats.expired_entries);
        }
        CacheAction::Clear => {
            let count = cache.clear().context("Failed to clear cache")?;
            println!("{} Removed {} record(s)", "🧹".green(), count);
        }
    }
    Ok(())
}
