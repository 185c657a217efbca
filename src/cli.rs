use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use pagescrape::extract::{DEFAULT_IMAGE_SELECTOR, DEFAULT_LINK_SELECTOR};
use pagescrape::{parse_mapping, AppConfig, Document, ScrapeError, ScrapeResult, Scraper};

#[derive(Parser)]
#[command(name = "pagescrape")]
#[command(about = "Fetch a page and extract data from it with CSS selectors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(short, long, global = true, help = "Configuration file path")]
    config: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct SourceArgs {
    #[arg(help = "Page URL; with --file it is only used as the base for relative links")]
    url: String,

    #[arg(
        long,
        conflicts_with_all = ["timeout_ms", "headers", "user", "password", "cookie"],
        help = "Read HTML from this file instead of fetching"
    )]
    file: Option<PathBuf>,

    #[arg(long, help = "Request timeout in milliseconds")]
    timeout_ms: Option<u64>,

    #[arg(short = 'H', long = "header", value_parser = parse_header, help = "Extra header as 'Name: value' (repeatable)")]
    headers: Vec<(String, String)>,

    #[arg(long, requires = "password", help = "Basic auth username")]
    user: Option<String>,

    #[arg(long, requires = "user", help = "Basic auth password")]
    password: Option<String>,

    #[arg(long, help = "Raw Cookie header value")]
    cookie: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fetched HTML
    Fetch {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the trimmed text of a selector, or of several named selectors
    Text {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(required_unless_present = "fields", conflicts_with = "fields", help = "CSS selector")]
        selector: Option<String>,

        #[arg(long = "field", value_parser = parse_field, help = "Named selector as 'name=selector' (repeatable)")]
        fields: Vec<(String, String)>,

        #[arg(long, help = "One entry per matched element instead of combined text")]
        all: bool,
    },

    /// List images as JSON records
    Images {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, default_value = DEFAULT_IMAGE_SELECTOR)]
        selector: String,
    },

    /// List links as JSON records
    Links {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, default_value = DEFAULT_LINK_SELECTOR)]
        selector: String,
    },

    /// Evaluate a JSON field mapping against the page
    Extract {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, help = "Path to a JSON mapping of field name to selector")]
        mapping: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        AppConfig::load_from_file(config_path).await?
    } else {
        AppConfig::load().await?
    };

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    pagescrape::logging::init_logging(&config.logging)?;

    info!("pagescrape v{}", env!("CARGO_PKG_VERSION"));

    let scraper = Scraper::from_config(&config.scraping)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            ctrl_c.cancel();
        }
    });

    if let Err(e) = run(cli.command, scraper, &cancel).await {
        error!(category = e.category(), "{}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Commands, scraper: Scraper, cancel: &CancellationToken) -> ScrapeResult<()> {
    match command {
        Commands::Fetch { source } => {
            let html = load_html(&scraper, &source, cancel).await?;
            println!("{}", html);
        }
        Commands::Text { source, selector, fields, all } => {
            let document = load_document(&scraper, &source, cancel).await?;
            if !fields.is_empty() {
                let selectors: BTreeMap<String, String> = fields.into_iter().collect();
                print_json(&document.text_map(&selectors)?)?;
            } else if let Some(selector) = selector {
                if all {
                    print_json(&document.text_list(&selector)?)?;
                } else {
                    println!("{}", document.text(&selector)?);
                }
            }
        }
        Commands::Images { source, selector } => {
            let document = load_document(&scraper, &source, cancel).await?;
            print_json(&document.images(&selector, &source.url)?)?;
        }
        Commands::Links { source, selector } => {
            let document = load_document(&scraper, &source, cancel).await?;
            print_json(&document.links(&selector, &source.url)?)?;
        }
        Commands::Extract { source, mapping } => {
            let mapping_json = tokio::fs::read_to_string(&mapping).await?;
            let mapping = parse_mapping(&mapping_json)?;
            let document = load_document(&scraper, &source, cancel).await?;
            print_json(&document.structured_data(&mapping)?)?;
        }
    }

    Ok(())
}

/// Apply per-invocation flags on top of the configured defaults
fn configure(scraper: &Scraper, source: &SourceArgs) -> ScrapeResult<Scraper> {
    let mut scraper = scraper.clone();

    if let Some(timeout_ms) = source.timeout_ms {
        scraper.set_timeout_ms(timeout_ms)?;
    }
    if !source.headers.is_empty() {
        scraper.set_headers(source.headers.iter().cloned().collect());
    }
    if let (Some(user), Some(password)) = (&source.user, &source.password) {
        scraper.set_auth(user, password);
    }
    if let Some(cookie) = &source.cookie {
        scraper.set_cookies(cookie);
    }

    Ok(scraper)
}

async fn load_html(
    scraper: &Scraper,
    source: &SourceArgs,
    cancel: &CancellationToken,
) -> ScrapeResult<String> {
    if let Some(path) = &source.file {
        return Ok(tokio::fs::read_to_string(path).await?);
    }

    let scraper = configure(scraper, source)?;
    Ok(scraper.fetch_html_cancellable(&source.url, cancel).await?)
}

async fn load_document(
    scraper: &Scraper,
    source: &SourceArgs,
    cancel: &CancellationToken,
) -> ScrapeResult<Document> {
    if let Some(path) = &source.file {
        let bytes = tokio::fs::read(path).await?;
        return Ok(Document::from_bytes(&bytes)?);
    }

    let html = load_html(scraper, source, cancel).await?;
    Ok(Document::parse(&html))
}

fn print_json<T: Serialize>(value: &T) -> ScrapeResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ScrapeError::Io(e.into()))?;
    println!("{}", json);
    Ok(())
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{}'", raw))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, selector) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected 'name=selector', got '{}'", raw))?;
    Ok((name.trim().to_string(), selector.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_text_selector_and_fields_conflict() {
        let result = Cli::try_parse_from([
            "pagescrape", "text", "https://h.example", "h1", "--field", "title=h1",
        ]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["pagescrape", "text", "https://h.example", "--field", "title=h1"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Text { selector: None, .. }));
    }

    #[test]
    fn test_file_rejects_fetch_flags() {
        for flag in [
            vec!["--timeout-ms", "500"],
            vec!["-H", "X-A: 1"],
            vec!["--user", "u", "--password", "p"],
            vec!["--cookie", "a=b"],
        ] {
            let mut args = vec!["pagescrape", "links", "https://h.example", "--file", "page.html"];
            args.extend(flag);
            assert!(Cli::try_parse_from(args).is_err());
        }

        assert!(Cli::try_parse_from(["pagescrape", "links", "https://h.example", "--file", "page.html"]).is_ok());
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("X-A: 1").unwrap(), ("X-A".to_string(), "1".to_string()));
        assert!(parse_header("no-colon").is_err());
    }
}
