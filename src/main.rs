use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use itempage::cache::{self, DirCache};
use itempage::config::Overrides;
use itempage::theme::{self, RenderContext, Theme};
use itempage::{config, feed, page::PageBuilder, render};
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r##"
CONFIGURATION
    Configuration file: $XDG_CONFIG_HOME/itempage/config.yaml
                       (typically ~/.config/itempage/config.yaml)

    Image cache:       $XDG_CACHE_HOME/itempage/images
                       (typically ~/.cache/itempage/images)

    Example configuration:
        theme: light                 # dark, light, dark_oled
        right_to_left: false
        show_header: true
        display:
          stylesheet: "web.css"
          default_favicon: "file:///android_res/drawable/default_feed_icon_light.png"
          protocol_relative: global  # global, attributes_only, off
        colours:
          light:
            divider_line: "#1f000000"
            item_list_background: "#fafafa"
        cache:
          dir: ~/.cache/itempage/images
          fetch_timeout_secs: 30

LOGGING
    Set RUST_LOG (e.g. RUST_LOG=itempage=debug) for diagnostics on stderr.
"##;

/// Render one RSS/Atom entry as a themed HTML page.
#[derive(Parser, Debug)]
#[command(name = "itempage")]
#[command(version)]
#[command(about = "Render an RSS/Atom entry as a themed HTML page with cached images", long_about = None)]
#[command(after_help = LONG_HELP)]
struct Args {
    /// Path or http(s) URL of an RSS/Atom feed.
    source: String,

    /// Index of the entry to render.
    #[arg(short, long, default_value_t = 0)]
    entry: usize,

    /// Omit the title/feed/date header block.
    #[arg(long)]
    no_header: bool,

    /// Theme to render for: dark, light or dark-oled.
    #[arg(long, value_parser = theme::parse_theme)]
    theme: Option<Theme>,

    /// Lay the page out right-to-left.
    #[arg(long)]
    rtl: bool,

    /// Download the favicon and body images into the cache before rendering.
    #[arg(long)]
    prefetch: bool,

    /// Write the page to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file to use instead of the default location.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective settings (config file plus --theme, --rtl and
    /// --no-header) back to the config file.
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the page can be piped from stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // 1. Load configuration and apply command-line overrides.
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::config_path()?,
    };
    let mut config = config::load_from(&config_path)?;
    config.apply(Overrides {
        theme: args.theme,
        right_to_left: args.rtl,
        hide_header: args.no_header,
    });
    if args.save_config {
        config::save_to(&config, &config_path)?;
        tracing::info!(path = %config_path.display(), "saved configuration");
    }

    // 2. Open the image cache.
    let cache_dir = config.cache_dir()?;
    let cache = DirCache::open(&cache_dir)?;
    tracing::debug!(dir = %cache.dir().display(), "using image cache");

    // 3. Load the feed and pick the entry.
    let client = feed::build_client(Duration::from_secs(config.cache.fetch_timeout_secs))?;
    let bytes = feed::load_source(&client, &args.source).await?;
    let item = feed::load_item(&bytes, args.entry)?;
    tracing::info!(title = %item.title, "rendering entry");

    // 4. Optionally fill the cache so the page uses local copies.
    if args.prefetch {
        let report = cache::prefetch(&client, &cache, &feed::asset_urls(&item)).await;
        tracing::info!(
            stored = report.stored,
            skipped = report.skipped,
            failed = report.failed,
            "prefetch complete"
        );
    }

    // 5. Render on the blocking pool and wait for the page.
    let context = RenderContext::new(
        Arc::new(config.theme),
        Arc::new(config.palette()?),
        config.right_to_left,
    );
    let builder = Arc::new(PageBuilder::new(Arc::new(cache)).with_options(config.page_options()));
    let page = render::render_item(builder, context, item, config.show_header)
        .await
        .context("Failed to render entry")?;

    // 6. Emit.
    match &args.output {
        Some(path) => tokio::fs::write(path, page)
            .await
            .with_context(|| format!("Failed to write page: {}", path.display()))?,
        None => println!("{page}"),
    }

    Ok(())
}
