mod backlinks;
mod batch;
mod categorize;
mod config;
mod domain;
mod error;
mod export;
mod fetch;
mod metadata;
mod search;
mod serp;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::builder::RangedU64ValueParser;
use clap::{ArgGroup, Parser, Subcommand};
use tracing::error;

use backlinks::{Backlink, BacklinkFinder, BacklinkVerifier, VerificationSummary};
use config::{Config, DEFAULT_CONCURRENCY};
use export::Exporter;
use fetch::{HttpFetcher, PageFetcher};
use search::{GoogleSearchApi, SearchClient};
use serp::{CompetitorAnalysis, CompetitorAnalyzer, OnPageFailure};

#[derive(Parser)]
#[command(name = "backlink_scout", about = "Backlink discovery, verification and SERP research")]
struct Cli {
    /// Directory for JSON/CSV exports (default: $SCOUT_OUTPUT_DIR or ./output)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Counts must be at least 1; checked before any request is made.
fn count() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..)
}

#[derive(Subcommand)]
enum Commands {
    /// Keyword search, results categorized by site type
    Search {
        keyword: String,
        /// Number of results
        #[arg(short = 'n', long, default_value = "10", value_parser = count())]
        num: usize,
        /// Also scrape each result for metadata and submission signals
        #[arg(long)]
        metadata: bool,
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY, value_parser = count())]
        concurrency: usize,
    },
    /// Find pages referencing a domain or URL
    #[command(group(ArgGroup::new("target").required(true).args(["domain", "url"])))]
    Backlinks {
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(short = 'n', long, default_value = "50", value_parser = count())]
        num: usize,
        /// Fetch every source page and check for a real link
        #[arg(long)]
        verify: bool,
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY, value_parser = count())]
        concurrency: usize,
    },
    /// Verify backlinks from an earlier JSON export
    Verify {
        /// JSON file containing an array of backlinks
        #[arg(short, long)]
        input: PathBuf,
        /// Domain or URL the links should point at (default: the export's own target)
        #[arg(short, long)]
        target: Option<String>,
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY, value_parser = count())]
        concurrency: usize,
    },
    /// Backlinks of the top-ranking pages for a keyword
    Competitors {
        keyword: String,
        /// Ranked pages to analyse
        #[arg(short = 'n', long, default_value = "10", value_parser = count())]
        num: usize,
        /// Backlinks to collect per ranked page
        #[arg(short = 'm', long, default_value = "10", value_parser = count())]
        max_backlinks: usize,
        /// Leave out ranked pages whose backlink search fails instead of aborting
        #[arg(long)]
        skip_failed: bool,
    },
    /// Scrape title, description, keywords and headings from pages
    Metadata {
        /// URLs to scrape
        urls: Vec<String>,
        /// File with one URL per line
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY, value_parser = count())]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    let result = run(cli.command, &config).await;
    if result.is_ok() && config.output_dir.exists() {
        println!("Exports in {}", config.output_dir.display());
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    let exporter = Exporter::new(&config.output_dir);

    match command {
        Commands::Search {
            keyword,
            num,
            metadata,
            concurrency,
        } => {
            let search = search_client(config)?;
            let results = search.search(&keyword, num).await?;
            if results.is_empty() {
                println!("No results for {:?}.", keyword);
                return Ok(());
            }

            let categorized = categorize::categorize_results(&results);
            let name = format!("search_{keyword}");
            exporter.export_to_json(&categorized, &name)?;
            exporter.export_to_csv(&categorized, &name)?;

            println!("{} results for {:?}", categorized.len(), keyword);
            for (category, count) in categorize::count_by_category(&categorized) {
                println!("  {:<10} {}", category, count);
            }

            if metadata {
                let urls: Vec<String> = results.into_iter().map(|r| r.link).collect();
                let pages =
                    metadata::extract_metadata_batch(http_fetcher(config)?, &urls, concurrency)
                        .await;
                let name = format!("metadata_{keyword}");
                exporter.export_to_json(&pages, &name)?;
                exporter.export_to_csv(&pages, &name)?;
                print_signals(&pages);
            }
            Ok(())
        }
        Commands::Backlinks {
            domain,
            url,
            num,
            verify,
            concurrency,
        } => {
            let finder = BacklinkFinder::new(search_client(config)?);
            let fetcher = if verify { Some(http_fetcher(config)?) } else { None };
            let (backlinks, target) = match (domain, url) {
                (Some(d), _) => (finder.find_backlinks_for_domain(&d, num).await?, d),
                (None, Some(u)) => (finder.find_backlinks_for_url(&u, num).await?, u),
                (None, None) => bail!("one of --domain or --url is required"),
            };

            if backlinks.is_empty() {
                println!("No backlinks found for {}.", target);
                return Ok(());
            }

            let domains = backlinks::unique_referring_domains(&backlinks);
            println!(
                "Found {} backlinks from {} referring domains.",
                backlinks.len(),
                domains.len()
            );

            let name = format!("backlinks_{target}");
            exporter.export_to_json(&backlinks, &name)?;
            exporter.export_to_csv(&backlinks, &name)?;

            if let Some(fetcher) = fetcher {
                verify_and_export(fetcher, &exporter, &backlinks, &target, concurrency).await?;
            }
            Ok(())
        }
        Commands::Verify {
            input,
            target,
            concurrency,
        } => {
            let backlinks = read_backlinks(&input)?;
            let Some(first) = backlinks.first() else {
                bail!("{} contains no backlinks", input.display());
            };
            let target = target.unwrap_or_else(|| first.target.as_str().to_string());
            verify_and_export(http_fetcher(config)?, &exporter, &backlinks, &target, concurrency)
                .await
        }
        Commands::Competitors {
            keyword,
            num,
            max_backlinks,
            skip_failed,
        } => {
            let policy = if skip_failed {
                OnPageFailure::Skip
            } else {
                OnPageFailure::Abort
            };
            let analyzer = CompetitorAnalyzer::new(
                search_client(config)?.with_serp_delay(config.serp_delay),
            )
            .on_page_failure(policy);

            let analysis = analyzer
                .analyze_top_ranking_backlinks(&keyword, num, max_backlinks)
                .await
                .with_context(|| format!("competitor analysis for {:?} failed", keyword))?;

            if analysis.top_pages.is_empty() {
                println!("No ranking pages for {:?}.", keyword);
                return Ok(());
            }
            export_analysis(&exporter, &analysis)?;

            println!(
                "{:>3} | {:<50} | {:>9} | {:>7}",
                "#", "URL", "Backlinks", "Domains"
            );
            println!("{}", "-".repeat(78));
            for p in &analysis.backlinks_analysis {
                println!(
                    "{:>3} | {:<50} | {:>9} | {:>7}",
                    p.position,
                    truncate(&p.url, 50),
                    p.backlinks_count,
                    p.unique_domains_count
                );
            }
            Ok(())
        }
        Commands::Metadata {
            mut urls,
            input,
            concurrency,
        } => {
            if let Some(path) = input {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                urls.extend(
                    text.lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty() && !l.starts_with('#'))
                        .map(String::from),
                );
            }
            if urls.is_empty() {
                bail!("no URLs given; pass them as arguments or with --input");
            }

            let pages =
                metadata::extract_metadata_batch(http_fetcher(config)?, &urls, concurrency).await;
            exporter.export_to_json(&pages, "metadata")?;
            exporter.export_to_csv(&pages, "metadata")?;
            print_signals(&pages);
            Ok(())
        }
    }
}

async fn verify_and_export(
    fetcher: Arc<dyn PageFetcher>,
    exporter: &Exporter,
    backlinks: &[Backlink],
    target: &str,
    concurrency: usize,
) -> anyhow::Result<()> {
    let verifier = BacklinkVerifier::new(fetcher).with_concurrency(concurrency);
    let verified = verifier.verify_backlinks(backlinks, target).await;

    let name = format!("verified_{target}");
    exporter.export_to_json(&verified, &name)?;
    exporter.export_to_csv(&verified, &name)?;

    let s = VerificationSummary::from_results(&verified);
    println!(
        "Verified {} of {} ({} unverified, {} fetch errors). Links: {} dofollow, {} nofollow.",
        s.verified, s.total, s.unverified, s.failed, s.dofollow_links, s.nofollow_links
    );
    Ok(())
}

/// Writes nothing when no ranked page could be analysed.
fn export_analysis(exporter: &Exporter, analysis: &CompetitorAnalysis) -> anyhow::Result<()> {
    if analysis.backlinks_analysis.is_empty() {
        bail!(
            "backlink search failed for all {} ranked pages of {:?}",
            analysis.top_pages.len(),
            analysis.keyword
        );
    }
    let name = format!("competitors_{}", analysis.keyword);
    exporter.export_to_json(analysis, &name)?;
    exporter.export_to_csv(&analysis.backlinks_analysis, &name)?;
    Ok(())
}

fn search_client(config: &Config) -> anyhow::Result<SearchClient> {
    let api = GoogleSearchApi::new(config)?;
    Ok(SearchClient::new(Arc::new(api)))
}

fn http_fetcher(config: &Config) -> anyhow::Result<Arc<dyn PageFetcher>> {
    Ok(Arc::new(HttpFetcher::new(config)?))
}

fn read_backlinks(path: &Path) -> anyhow::Result<Vec<Backlink>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a backlink export", path.display()))
}

fn print_signals(pages: &[metadata::PageMetadata]) {
    let failed = pages.iter().filter(|p| p.error.is_some()).count();
    println!("Scraped {} pages ({} errors).", pages.len(), failed);

    let with_signals: Vec<_> = pages
        .iter()
        .filter(|p| !p.submission_signals.is_empty())
        .collect();
    if !with_signals.is_empty() {
        println!("\n--- Submission opportunities ---");
        for p in with_signals {
            println!("  {}: {}", truncate(&p.url, 60), p.submission_signals.join(", "));
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
