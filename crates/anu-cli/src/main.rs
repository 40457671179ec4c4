use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use anu_client::{ReqwestFetcher, SettingsJsonExtractor};
use anu_core::config::parse_max_concurrency;
use anu_core::traits::CacheStore;
use anu_core::{
    Course, JobOutcome, MemoryCacheStore, PrefetchConfig, PrefetchJob, PrefetchPlan,
    PrefetchService, TracingPrefetchReporter,
};
use anu_db::{CacheRepository, Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "anu", version, about = "Offline course prefetcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every page and image of a course into the offline cache
    Prefetch {
        /// Path to the course JSON produced by the content transform layer
        #[arg(short, long)]
        course: PathBuf,

        /// Site origin that relative locators are resolved against
        #[arg(short, long, env = "ANU_BASE_URL")]
        base_url: String,

        /// Name of the cache to populate
        #[arg(long, env = "ANU_CURRENT_CACHE")]
        cache: String,

        #[command(flatten)]
        paths: PathArgs,

        /// Maximum number of in-flight requests per batch (unbounded if unset)
        #[arg(long, env = "ANU_MAX_CONCURRENCY", value_parser = max_concurrency)]
        max_concurrency: Option<usize>,

        /// Per-request timeout in seconds (no timeout if unset)
        #[arg(long)]
        timeout: Option<u64>,

        /// Populate an in-memory cache instead of PostgreSQL
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// List the locators a prefetch would request before image discovery
    Plan {
        /// Path to the course JSON
        #[arg(short, long)]
        course: PathBuf,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// List the entries stored in a cache
    Entries {
        #[arg(long, env = "ANU_CURRENT_CACHE")]
        cache: String,

        /// Show the metadata of one stored locator instead
        #[arg(short, long)]
        locator: Option<String>,
    },

    /// Delete every entry of a cache
    Clear {
        #[arg(long, env = "ANU_CURRENT_CACHE")]
        cache: String,
    },
}

#[derive(clap::Args)]
struct PathArgs {
    /// Active language prefix, e.g. "/fr"
    #[arg(long, env = "ANU_LANG_PREFIX", default_value = "")]
    lang_prefix: String,

    #[arg(long, env = "ANU_HOME_PATH", default_value = "/")]
    home_path: String,

    #[arg(long, env = "ANU_LISTING_PATH", default_value = "/courses")]
    listing_path: String,
}

impl PathArgs {
    fn into_config(self, cache: &str) -> PrefetchConfig {
        let mut config = PrefetchConfig::new(cache).with_lang_prefix(self.lang_prefix);
        config.home_path = self.home_path;
        config.listing_path = self.listing_path;
        config
    }
}

fn max_concurrency(raw: &str) -> std::result::Result<usize, String> {
    parse_max_concurrency(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("anu=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Prefetch {
            course,
            base_url,
            cache,
            paths,
            max_concurrency,
            timeout,
            dry_run,
        } => {
            let course = load_course(&course)?;
            let config = paths.into_config(&cache).with_max_concurrency(max_concurrency);
            config.validate().map_err(|e| anyhow::anyhow!(e))?;

            let fetcher = match timeout {
                Some(secs) => ReqwestFetcher::with_timeout(Duration::from_secs(secs)),
                None => ReqwestFetcher::new(),
            }
            .and_then(|f| f.with_base_url(&base_url))
            .map_err(|e| anyhow::anyhow!(e))?;

            if dry_run {
                let store = MemoryCacheStore::new();
                cmd_prefetch(&course, fetcher, store.clone(), config).await?;
                if let Some(memory) = store.cache(&cache).await {
                    for key in memory.keys() {
                        println!("{key}");
                    }
                }
            } else {
                let repo = connect_db().await?;
                cmd_prefetch(&course, fetcher, repo, config).await?;
            }
        }
        Commands::Plan { course, paths } => {
            let course = load_course(&course)?;
            cmd_plan(&course, &paths.into_config("plan"));
        }
        Commands::Entries { cache, locator } => {
            let repo = connect_db().await?;
            cmd_entries(&repo, &cache, locator.as_deref()).await?;
        }
        Commands::Clear { cache } => {
            let repo = connect_db().await?;
            let removed = repo.clear(&cache).await.map_err(|e| anyhow::anyhow!(e))?;
            tracing::info!(cache = %cache, removed, "Cache cleared");
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL and apply migrations.
async fn connect_db() -> Result<CacheRepository> {
    let config = DatabaseConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.map_err(|e| anyhow::anyhow!(e))?;

    Ok(db.cache_repo())
}

fn load_course(path: &Path) -> Result<Course> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read course file: {}", path.display()))?;
    Course::from_json(&raw).context("Invalid course JSON")
}

async fn cmd_prefetch<S: CacheStore>(
    course: &Course,
    fetcher: ReqwestFetcher,
    store: S,
    config: PrefetchConfig,
) -> Result<()> {
    let extractor = SettingsJsonExtractor::new().map_err(|e| anyhow::anyhow!(e))?;
    let service = PrefetchService::new(fetcher, extractor, store, config);
    let job = PrefetchJob::new();

    let result = service
        .prefetch(course, &job, &TracingPrefetchReporter)
        .await;

    let outcome = job.outcome().unwrap_or(JobOutcome::Error);
    match result {
        Ok(report) => {
            tracing::info!(
                job_id = %report.job_id,
                structure = report.structure,
                pages = report.pages,
                images = report.images,
                "Prefetch report"
            );
            eprintln!("{}", outcome.message());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", outcome.message());
            Err(anyhow::anyhow!(e))
        }
    }
}

fn cmd_plan(course: &Course, config: &PrefetchConfig) {
    let plan = PrefetchPlan::from_course(course, config);
    for locator in &plan.structure {
        println!("structure  {locator}");
    }
    for locator in &plan.pages {
        println!("pages      {locator}");
    }
    println!("\nTotal: {} locators before image discovery", plan.total());
}

async fn cmd_entries(repo: &CacheRepository, cache: &str, locator: Option<&str>) -> Result<()> {
    if let Some(locator) = locator {
        let entry = repo
            .get(cache, locator)
            .await
            .map_err(|e| anyhow::anyhow!(e))?
            .with_context(|| format!("No entry for {locator} in cache {cache}"))?;
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    let keys = repo.keys(cache).await.map_err(|e| anyhow::anyhow!(e))?;
    if keys.is_empty() {
        println!("Cache {cache} is empty");
        return Ok(());
    }
    for key in &keys {
        println!("  {key}");
    }
    println!("\nTotal: {} entries", keys.len());
    Ok(())
}
