use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kwcluster_cli::cli::{
    drain_notifications, format_fetch_stats, init_tracing, print_json, CliConfig, FilterArgs,
};
use kwcluster_core::constants::PROGRESS_TICK_MS;
use kwcluster_core::models::View;
use kwcluster_core::{
    AppDataStore, CoreConfig, FetchRequest, HttpKeywordApi, KeywordFetchOrchestrator,
    NotificationQueue, ProcessingStatusPoller, ResultCache,
};
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(name = "kwcluster")]
#[command(about = "Inspect keyword views of a clustering project")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short, global = true)]
    pretty: bool,

    /// Path to JSON config file (apiBaseUrl, pageSize, cacheTtlMs, ...)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Keyword service base URL, overrides the config file
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Print how fetches were served (cache, local, bulk, server) to stderr
    #[arg(long, global = true)]
    fetch_stats: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List projects, ordered by name
    Projects,

    /// Fetch one page of a view
    Fetch {
        project_id: i64,
        /// ungrouped | grouped | confirmed | blocked
        view: View,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Rows per page (default from config)
        #[arg(long)]
        limit: Option<u32>,
        /// Bypass the result cache
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// List the children of a group
    Children { project_id: i64, group_id: String },

    /// Show project counters
    Stats { project_id: i64 },

    /// Follow an import job until it completes or fails
    Watch {
        project_id: i64,
        /// View to refresh when the job completes
        #[arg(long, default_value = "ungrouped")]
        view: View,
    },
}

struct Session {
    fetcher: Arc<KeywordFetchOrchestrator>,
    config: CoreConfig,
}

impl Session {
    fn new(config: CoreConfig) -> Result<Self> {
        let api = HttpKeywordApi::new(&config).context("Failed to build HTTP client")?;
        let fetcher = Arc::new(KeywordFetchOrchestrator::new(
            Arc::new(api),
            AppDataStore::shared(),
            ResultCache::shared(config.cache_ttl),
            NotificationQueue::shared(),
            config.clone(),
        ));
        Ok(Self { fetcher, config })
    }

    fn report_notifications(&self) {
        for notification in drain_notifications(self.fetcher.notifications()) {
            eprintln!("[{:?}] {}", notification.level, notification.message);
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let file_config = CliConfig::resolve(cli.config.as_deref())?;
    let session = Session::new(file_config.to_core_config(cli.api_url.as_deref()))?;

    let result = match cli.command {
        Commands::Projects => projects(&session, cli.pretty).await,
        Commands::Fetch {
            project_id,
            view,
            page,
            limit,
            force,
            filters,
        } => fetch(&session, project_id, view, page, limit, force, &filters, cli.pretty).await,
        Commands::Children { project_id, group_id } => {
            children(&session, project_id, &group_id, cli.pretty).await
        }
        Commands::Stats { project_id } => stats(&session, project_id, cli.pretty).await,
        Commands::Watch { project_id, view } => watch(&session, project_id, view).await,
    };

    session.report_notifications();
    if cli.fetch_stats {
        eprintln!("{}", format_fetch_stats(&session.fetcher.stats().snapshot()));
    }
    result
}

async fn projects(session: &Session, pretty: bool) -> Result<()> {
    let projects = session.fetcher.refresh_projects().await?;
    print_json(&projects, pretty)
}

#[allow(clippy::too_many_arguments)]
async fn fetch(
    session: &Session,
    project_id: i64,
    view: View,
    page: u32,
    limit: Option<u32>,
    force: bool,
    args: &FilterArgs,
    pretty: bool,
) -> Result<()> {
    let filters = args.to_filters();
    let mut request = FetchRequest::new(
        project_id,
        view,
        limit.unwrap_or(session.config.default_page_size),
    )
    .with_page(page)
    .with_filters(filters.clone())
    .with_sort(args.to_sort());
    request.include_match = args.include_match;
    request.exclude_match = args.exclude_match;
    if force {
        request = request.forced();
    }

    let outcome = session.fetcher.fetch(&request).await?;
    let rows = session
        .fetcher
        .store()
        .read()
        .keywords
        .materialized_view(project_id, view, &filters);

    print_json(
        &json!({
            "path": outcome.path.as_str(),
            "pagination": outcome.pagination,
            "keywords": rows,
        }),
        pretty,
    )
}

async fn children(session: &Session, project_id: i64, group_id: &str, pretty: bool) -> Result<()> {
    let rows = session.fetcher.fetch_children(project_id, group_id).await?;
    let rows: Vec<_> = rows.iter().map(|row| row.as_ref()).collect();
    print_json(&json!({ "groupId": group_id, "children": rows }), pretty)
}

async fn stats(session: &Session, project_id: i64, pretty: bool) -> Result<()> {
    let stats = session.fetcher.refresh_stats(project_id).await?;
    print_json(&stats, pretty)
}

async fn watch(session: &Session, project_id: i64, view: View) -> Result<()> {
    let active = FetchRequest::new(project_id, view, session.config.default_page_size);
    let poller = Arc::new(ProcessingStatusPoller::new(session.fetcher.clone(), active));
    let handle = poller.clone().spawn();
    info!(project_id, view = %view, "watching processing status");

    let mut frame = tokio::time::interval(Duration::from_millis(PROGRESS_TICK_MS));
    let mut last_printed = -1.0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                break;
            }
            _ = frame.tick() => {
                let shown = poller.tick_progress();
                if (shown - last_printed).abs() >= 1.0 {
                    eprint!("\r{:?} {:>5.1}%", poller.state(), shown);
                    last_printed = shown;
                }
                session.report_notifications();
                if handle.is_finished() {
                    break;
                }
            }
        }
    }
    eprintln!();
    handle.join().await;

    if let Some(status) = poller.last_status() {
        for error in &status.file_errors {
            eprintln!("{}: {}", error.file_name, error.message);
        }
    }
    Ok(())
}
