//! Command-line host: wires the settings, store, probe and completion client
//! together and runs one subcommand.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    categorization::CategorizationEngine,
    completion::HttpCompletionClient,
    db::{Database, SessionStore, Statistics},
    insights::InsightsService,
    models::{DateRange, Session},
    probe::default_probe,
    recategorize::{BatchJob, BatchOptions, BatchRecategorizer, DEFAULT_CHUNK_SIZE},
    settings::{normalize_interval, SettingsStore},
    tracking::{TrackerDeps, TrackerHandle},
};

#[derive(Parser, Debug)]
#[command(name = "timetrail")]
#[command(about = "Foreground activity tracker with AI-assisted categorization", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding settings.json and the database (default: platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// SQLite database path (default: <data-dir>/timetrail.sqlite3)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// OpenAI-compatible chat completions URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Model name sent to the completion endpoint
    #[arg(long, global = true)]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Track the foreground window until Ctrl-C
    Track {
        /// Poll interval in seconds (default: trackingInterval setting)
        #[arg(long)]
        interval: Option<i64>,
    },
    /// Re-categorize stored sessions in batches
    Recategorize {
        #[arg(long, default_value = "all")]
        range: DateRange,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// Productivity score for a range
    Score {
        #[arg(long, default_value = "today")]
        range: DateRange,
    },
    /// Time per category, top apps and top domains
    Stats {
        #[arg(long, default_value = "today")]
        range: DateRange,
    },
    /// Coaching insights for a range
    Insights {
        #[arg(long, default_value = "today")]
        range: DateRange,
    },
    /// Categorize one activity without storing anything
    Categorize {
        #[arg(long)]
        app: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: Option<String>,
    },
}

struct App {
    settings: Arc<SettingsStore>,
    db: Database,
    client: Option<Arc<HttpCompletionClient>>,
}

impl App {
    fn open(cli: &Cli) -> Result<Self> {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .context("no platform data directory; pass --data-dir")?
                .join("timetrail"),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let settings = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);
        let db_path = cli
            .db
            .clone()
            .unwrap_or_else(|| data_dir.join("timetrail.sqlite3"));
        let db = Database::new(db_path)?;

        let client = match HttpCompletionClient::new(settings.clone()) {
            Ok(mut client) => {
                if let Some(endpoint) = &cli.endpoint {
                    client = client.with_endpoint(endpoint.as_str());
                }
                if let Some(model) = &cli.model {
                    client = client.with_model(model.as_str());
                }
                Some(Arc::new(client))
            }
            Err(err) => {
                log::warn!("AI categorization unavailable: {err:#}");
                None
            }
        };

        Ok(Self {
            settings,
            db,
            client,
        })
    }

    fn engine(&self) -> CategorizationEngine<Arc<HttpCompletionClient>> {
        CategorizationEngine::new(self.settings.clone(), self.client.clone())
    }
}

pub async fn run() -> Result<()> {
    crate::utils::logging::init_logging();
    let cli = Cli::parse();
    let app = App::open(&cli)?;

    let command = match cli.command {
        Some(command) => command,
        None if app.settings.auto_start() => Command::Track { interval: None },
        None => {
            println!("autoStart is off; run `timetrail track` to start tracking.");
            return Ok(());
        }
    };

    match command {
        Command::Track { interval } => track(&app, interval).await,
        Command::Recategorize { range, chunk_size } => {
            recategorize(&app, range, chunk_size, cli.json).await
        }
        Command::Score { range } => {
            let sessions = app.db.fetch_sessions(range).await?;
            let score = InsightsService::new(app.settings.clone(), app.client.clone())
                .score(&sessions)
                .await;
            emit(cli.json, &score, || {
                format!("Productivity ({range}): {}/10\n{}", score.score, score.explanation)
            })
        }
        Command::Stats { range } => {
            let stats = app.db.statistics(range).await?;
            emit(cli.json, &stats, || render_stats(range, &stats))
        }
        Command::Insights { range } => {
            let stats = app.db.statistics(range).await?;
            let digest = stats
                .categories
                .iter()
                .map(|c| format!("{}: {} min", c.category, c.total_secs / 60))
                .collect::<Vec<_>>()
                .join("\n");
            let insights = InsightsService::new(app.settings.clone(), app.client.clone())
                .insights(range.label(), Some(&digest))
                .await;
            emit(cli.json, &insights, || insights.text.clone())
        }
        Command::Categorize { app: name, title, url } => {
            let session = Session::open(name, title, url, chrono::Utc::now());
            let category = app.engine().categorize(&session).await;
            emit(cli.json, &category, || category.clone())
        }
    }
}

async fn track(app: &App, interval: Option<i64>) -> Result<()> {
    let secs = interval
        .map(normalize_interval)
        .unwrap_or_else(|| app.settings.tracking_interval_secs());

    let mut tracker = TrackerHandle::new();
    tracker.start(
        TrackerDeps {
            probe: default_probe(),
            store: app.db.clone(),
            engine: app.engine(),
            settings: app.settings.clone(),
        },
        Duration::from_secs(secs),
    )?;
    log::info!("Tracking every {secs}s; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracker.stop().await
}

async fn recategorize(app: &App, range: DateRange, chunk_size: usize, json: bool) -> Result<()> {
    let Some(client) = app.client.clone().filter(|_| app.settings.ai_enabled()) else {
        anyhow::bail!("re-categorization needs AI enabled and an apiKey in settings.json");
    };

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let batch = BatchRecategorizer::with_options(
        app.db.clone(),
        client,
        BatchOptions {
            chunk_size,
            cancel: Some(cancel),
            ..BatchOptions::default()
        },
    );
    let report = batch
        .run(&BatchJob::from_settings(&app.settings, range))
        .await?;

    emit(json, &report, || {
        format!(
            "Updated {} of {} sessions",
            report.updated_count, report.total_count
        )
    })
}

fn render_stats(range: DateRange, stats: &Statistics) -> String {
    let mut out = format!("Statistics ({range})\n\nCategories:\n");
    for c in &stats.categories {
        out.push_str(&format!(
            "  {:<20} {:>6} min  {:>4} sessions  avg {:.0}s\n",
            c.category,
            c.total_secs / 60,
            c.session_count,
            c.average_secs
        ));
    }
    out.push_str("\nTop apps:\n");
    for a in &stats.top_apps {
        out.push_str(&format!("  {:<30} {:>6} min\n", a.process_name, a.total_secs / 60));
    }
    out.push_str("\nTop domains:\n");
    for d in &stats.top_domains {
        out.push_str(&format!("  {:<30} {:>6} min\n", d.domain, d.total_secs / 60));
    }
    out
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_recategorize_range() {
        let cli = Cli::parse_from(["timetrail", "recategorize", "--range", "week"]);
        match cli.command {
            Some(Command::Recategorize { range, chunk_size }) => {
                assert_eq!(range, DateRange::Week);
                assert_eq!(chunk_size, DEFAULT_CHUNK_SIZE);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn endpoint_and_model_are_global_flags() {
        let cli = Cli::parse_from([
            "timetrail",
            "stats",
            "--endpoint",
            "http://localhost:8080/v1/chat/completions",
            "--model",
            "llama3",
        ]);
        assert_eq!(
            cli.endpoint.as_deref(),
            Some("http://localhost:8080/v1/chat/completions")
        );
        assert_eq!(cli.model.as_deref(), Some("llama3"));
        assert!(matches!(cli.command, Some(Command::Stats { .. })));
    }

    #[test]
    fn stats_renders_every_section() {
        let rendered = render_stats(
            DateRange::Today,
            &Statistics {
                categories: vec![],
                top_apps: vec![],
                top_domains: vec![],
            },
        );
        assert!(rendered.contains("Categories:"));
        assert!(rendered.contains("Top apps:"));
        assert!(rendered.contains("Top domains:"));
    }
}
