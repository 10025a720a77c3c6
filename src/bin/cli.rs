//! Shutuba CLI - Command-line interface for race-card entry extraction

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use shutuba::browser::FixtureBrowser;
use shutuba::config::ScraperConfig;
use shutuba::scraper::{
    venue_code_or_unknown, venues, EntryScraper, Extraction, ExtractionRequest,
};
use shutuba::{Browser, EntryTable};

#[cfg(feature = "webdriver")]
use shutuba::browser::WebDriverBrowser;

#[derive(Parser)]
#[command(name = "shutuba")]
#[command(author, version, about = "Race-card entry extraction CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the entry table of one race
    Extract {
        /// Race id as used by the entry-list page (e.g. 202405040811)
        #[arg(long)]
        race_id: String,

        /// Venue name (e.g. 東京)
        #[arg(long)]
        venue: String,

        /// Race date (YYYYMMDD format)
        #[arg(long)]
        date: String,

        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// WebDriver endpoint, overrides the config
        #[arg(long)]
        webdriver_url: Option<String>,

        /// Wait bound in seconds, overrides the config
        #[arg(long)]
        timeout: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read a saved entry-list page instead of driving a browser.
        /// Handler links are not followed in this mode.
        #[arg(long)]
        from_html: Option<PathBuf>,
    },

    /// List venue codes
    Venues,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    match cli.command {
        Commands::Extract {
            race_id,
            venue,
            date,
            config,
            webdriver_url,
            timeout,
            format,
            output,
            from_html,
        } => {
            let config = load_config(config.as_deref(), webdriver_url, timeout)?;
            let request = ExtractionRequest::new(race_id, venue, date);
            run_extract(config, &request, format, output.as_deref(), from_html.as_deref())?;
        }
        Commands::Venues => list_venues(),
    }

    Ok(())
}

/// File, then environment, then command-line flags
fn load_config(
    path: Option<&Path>,
    webdriver_url: Option<String>,
    timeout: Option<u64>,
) -> Result<ScraperConfig> {
    let config = match path {
        Some(path) => ScraperConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => ScraperConfig::default(),
    };
    let mut config = config
        .with_env_overrides()
        .context("Invalid environment override")?;

    if let Some(url) = webdriver_url {
        config.webdriver_url = url;
    }
    if let Some(secs) = timeout {
        config.timeout_secs = secs;
    }
    Ok(config)
}

fn list_venues() {
    println!("{}", "Venue Codes:".yellow().bold());
    println!("{}", "-".repeat(20));
    for (name, code) in venues() {
        println!("  {}: {}", code, name);
    }
}

fn run_extract(
    mut config: ScraperConfig,
    request: &ExtractionRequest,
    format: OutputFormat,
    output: Option<&Path>,
    from_html: Option<&Path>,
) -> Result<()> {
    let offline_html = match from_html {
        Some(path) => {
            config.resolve_handlers = false;
            Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {:?}", path))?,
            )
        }
        None => None,
    };

    eprintln!(
        "{}: race {} at {} ({}) on {}",
        "Extracting".green(),
        request.race_id,
        request.venue,
        venue_code_or_unknown(&request.venue),
        request.date
    );

    // Create runtime for async operations
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message("Reading entry list...");
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = rt.block_on(async {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                canceller.cancel();
            }
        });

        let scraper = EntryScraper::new(config);
        match offline_html {
            Some(html) => {
                let browser = FixtureBrowser::new(&scraper.build_url(&request.race_id), &html);
                scrape(&scraper, browser, request, &cancel).await
            }
            None => scrape_live(&scraper, request, &cancel).await,
        }
    });

    pb.finish_and_clear();

    let extraction = result?;
    for issue in &extraction.issues {
        eprintln!("{}: {}", "Warning".yellow(), issue);
    }

    write_table(&extraction.table, format, output)?;

    eprintln!(
        "{}: {} entries, {} warnings",
        "Complete".green(),
        extraction.table.len(),
        extraction.issues.len()
    );
    Ok(())
}

#[cfg(feature = "webdriver")]
async fn scrape_live(
    scraper: &EntryScraper,
    request: &ExtractionRequest,
    cancel: &CancellationToken,
) -> Result<Extraction> {
    let browser = WebDriverBrowser::connect(scraper.config())
        .await
        .with_context(|| {
            format!(
                "Failed to start browser session at {}",
                scraper.config().webdriver_url
            )
        })?;
    scrape(scraper, browser, request, cancel).await
}

#[cfg(not(feature = "webdriver"))]
async fn scrape_live(
    _scraper: &EntryScraper,
    _request: &ExtractionRequest,
    _cancel: &CancellationToken,
) -> Result<Extraction> {
    anyhow::bail!("Built without the webdriver feature; use --from-html")
}

async fn scrape<B: Browser>(
    scraper: &EntryScraper,
    browser: B,
    request: &ExtractionRequest,
    cancel: &CancellationToken,
) -> Result<Extraction> {
    scraper
        .scrape(browser, request, cancel)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", e.kind(), e))
}

fn write_table(table: &EntryTable, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Json => {
            let json = table
                .to_json_pretty()
                .context("Failed to serialize entries")?;
            buf.extend_from_slice(json.as_bytes());
            buf.push(b'\n');
        }
        OutputFormat::Csv => table
            .write_csv(&mut buf)
            .context("Failed to write CSV")?,
    }

    match output {
        Some(path) => {
            std::fs::write(path, &buf).with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("{}: {:?}", "Saved".green(), path);
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(&buf)
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
