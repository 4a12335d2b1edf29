use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use conjunction_desk::{AppState, Desk, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_CORPUS: &str = "conjunctions.jsonl";
const DEFAULT_CHECKLIST: &str = "progress_checklist.md";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    info!("using corpus at {}", config.corpus_path.display());
    info!("using checklist at {}", config.checklist_path.display());

    let start = Instant::now();
    let desk = Desk::open(&config.corpus_path, &config.checklist_path)?;
    let summary = desk.tracker().summary();
    info!(
        "loaded {} entries and {} batches ({} complete, {} in progress) in {} ms",
        desk.corpus().len(),
        summary.total,
        summary.complete,
        summary.in_progress,
        start.elapsed().as_millis()
    );

    let app = router(AppState::new(desk)).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    corpus_path: PathBuf,
    checklist_path: PathBuf,
}

fn load_config() -> Config {
    let mut cli_corpus: Option<PathBuf> = None;
    let mut cli_checklist: Option<PathBuf> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--corpus" => cli_corpus = args.next().map(PathBuf::from),
            "--checklist" => cli_checklist = args.next().map(PathBuf::from),
            _ => {
                if let Some(path) = arg.strip_prefix("--corpus=") {
                    cli_corpus = Some(PathBuf::from(path));
                } else if let Some(path) = arg.strip_prefix("--checklist=") {
                    cli_checklist = Some(PathBuf::from(path));
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let corpus_path = cli_corpus
        .or_else(|| env::var("CORPUS_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CORPUS));
    let checklist_path = cli_checklist
        .or_else(|| env::var("CHECKLIST_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKLIST));

    Config {
        host,
        port,
        corpus_path,
        checklist_path,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
