mod cli;

use reelfeed::check::{self, CheckOptions, CheckOutcome};
use reelfeed::device::DeviceState;
use reelfeed::telemetry::BackendViewSink;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use rf_core::config::Config;
use rf_core::{FeedFilter, VideoRecord};
use rf_feed::{FeedSource, HttpFeedSource, PageRequest};
use rf_playback::{NullViewSink, SourceResolver, ViewSink};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelfeed=trace,rf_playback=trace,rf_feed=debug,rf_core=debug".to_string()
        } else {
            "reelfeed=info,rf_playback=info,rf_feed=info,rf_core=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Feed {
            page,
            query,
            tag,
            json,
        } => {
            let config = Config::load_or_default(config_path);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show_feed(&config, page, build_filter(query, tag), json))
        }
        Commands::Resolve { file, fallback } => {
            let config = Config::load_or_default(config_path);
            resolve_record(&config, &file, fallback)
        }
        Commands::Check {
            count,
            query,
            tag,
            timeout,
            record_views,
            json,
        } => {
            let config = Config::load_or_default(config_path);
            let options = CheckOptions {
                count,
                filter: build_filter(query, tag),
                deadline: Duration::from_secs(timeout),
                ..CheckOptions::default()
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_check(&config, options, record_views, json))
        }
        Commands::Device { enter } => {
            let config = Config::load_or_default(config_path);
            show_device(&config, enter)
        }
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelfeed {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn build_filter(query: Option<String>, tags: Vec<String>) -> FeedFilter {
    FeedFilter { query, tags }
}

fn require_backend(config: &Config) -> Result<()> {
    if config.backend.base_url.trim().is_empty() {
        anyhow::bail!("backend.base_url is not configured");
    }
    Ok(())
}

async fn show_feed(config: &Config, page: u32, filter: FeedFilter, json: bool) -> Result<()> {
    require_backend(config)?;
    let source = HttpFeedSource::new(&config.backend);
    let request = PageRequest {
        generation: 0,
        page,
        limit: config.feed.page_size.max(1),
        filter,
        user_id: None,
    };

    let feed_page = source
        .fetch_page(&request)
        .await
        .with_context(|| format!("Failed to fetch feed page {page}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&feed_page.records)?);
        return Ok(());
    }

    let resolver = SourceResolver::new(&config.sources);
    println!(
        "Page {}: {} videos{}",
        feed_page.page,
        feed_page.records.len(),
        if feed_page.exhausted { " (end of feed)" } else { "" }
    );
    for (i, record) in feed_page.records.iter().enumerate() {
        print_record(i, record, &resolver, false);
    }
    Ok(())
}

fn print_record(index: usize, record: &VideoRecord, resolver: &SourceResolver, fallback: bool) {
    let caption = record.caption.as_deref().unwrap_or("");
    println!("  [{}] {} {}", index, record.id, caption);
    for candidate in resolver.candidates(record, fallback) {
        println!("      {:<11} {}", candidate.tier.to_string(), candidate.url);
    }
    if let Some(poster) = resolver.poster(record) {
        println!("      {:<11} {}", "poster", poster);
    }
}

fn resolve_record(config: &Config, file: &Path, fallback: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }
    let content = std::fs::read_to_string(file)?;
    let record: VideoRecord =
        serde_json::from_str(&content).with_context(|| format!("Invalid video record in {:?}", file))?;

    let resolver = SourceResolver::new(&config.sources);
    print_record(0, &record, &resolver, fallback);
    Ok(())
}

async fn run_check(config: &Config, mut options: CheckOptions, record_views: bool, json: bool) -> Result<()> {
    require_backend(config)?;
    let device = DeviceState::load_or_create(&config.device.state_path)?;
    options.viewer = Some(device.viewer());

    let source: Arc<dyn FeedSource> = Arc::new(HttpFeedSource::new(&config.backend));
    let sink: Arc<dyn ViewSink> = if record_views {
        Arc::new(BackendViewSink::current(source.clone()))
    } else {
        Arc::new(NullViewSink)
    };

    let report = check::run_check(config, source, sink, options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for video in &report.videos {
        match &video.outcome {
            CheckOutcome::Played { tier, ttff } => println!(
                "✓ [{}] {} {} in {}ms ({} failures)",
                video.index,
                video.video_id,
                tier,
                ttff.as_millis(),
                video.failures
            ),
            CheckOutcome::Failed { error } => {
                println!("✗ [{}] {} {}", video.index, video.video_id, error)
            }
        }
    }
    if let Some(ref err) = report.feed_error {
        println!("Feed error: {}", err);
    }
    if report.timed_out {
        println!("Stopped at deadline");
    }
    println!("\n{}/{} videos played", report.played(), report.videos.len());
    Ok(())
}

fn show_device(config: &Config, enter: bool) -> Result<()> {
    let path = &config.device.state_path;
    let mut state = DeviceState::load_or_create(path)?;
    if enter && state.mark_entered(path)? {
        println!("Entry gate passed");
    }

    println!("Device: {}", state.device_id);
    println!("Entered app: {}", state.entered_app);
    println!("Created: {}", state.created_at.to_rfc3339());
    println!("State file: {}", path.display());
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file {:?}", p))?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration parsed");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Backend: {}", if config.backend.base_url.is_empty() { "(unset)" } else { &config.backend.base_url });
    println!(
        "  Transform service: {}",
        config.sources.transform_base_url.as_deref().unwrap_or("(disabled)")
    );
    println!("  Max attempts: {}", config.playback.max_attempts);
    println!(
        "  Page size: {} (prefetch within {})",
        config.feed.page_size, config.feed.prefetch_lookahead
    );

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ No warnings");
    } else {
        println!("Warnings:");
        for w in &warnings {
            println!("  - {}", w);
        }
    }
    Ok(())
}
