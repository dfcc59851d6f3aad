use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use cutout_compose::{Compositor, DirTemplateStore, HttpSegmenter, TemplateStore};
use cutout_core::CutoutConfig;
use cutout_sessions::{Limits, SessionManager, SessionStore};

mod app;
mod http;

#[derive(Parser, Debug)]
#[command(name = "cutout-gateway", version, about = "Product photo compositing bot")]
struct Cli {
    /// Config file path (overrides CUTOUT_CONFIG and ~/.cutout/cutout.toml).
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cutout_gateway=info,cutout_sessions=info,cutout_compose=info,\
                 cutout_telegram=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    // load config: --config > CUTOUT_CONFIG env > ~/.cutout/cutout.toml
    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("CUTOUT_CONFIG").ok());
    let config = CutoutConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        CutoutConfig::default()
    });

    if let Err(e) = config.ensure_dirs() {
        tracing::warn!(error = %e, code = e.code(), "cannot create data directories");
    }

    let db_path = &config.database.path;
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    let store = SessionStore::new(db)?;
    info!(sessions = store.count()?, "session store ready");

    let templates = DirTemplateStore::new(&config.compose.templates_dir);
    match templates.list() {
        Ok(names) => info!(dir = %templates.dir().display(), count = names.len(), "templates found"),
        Err(e) => tracing::warn!(error = %e, "template directory unreadable"),
    }

    let segmenter = HttpSegmenter::new(&config.compose.segmenter_url);
    info!(url = %config.compose.segmenter_url, "using segmentation service");
    let compositor = Compositor::new(
        Arc::new(segmenter),
        Duration::from_secs(config.compose.segmenter_timeout_secs),
    );

    let mut sessions = SessionManager::new(
        store,
        Arc::new(templates),
        compositor,
        Limits {
            max_height: config.compose.max_height_limit,
        },
    );
    if let Some(dir) = &config.compose.archive_dir {
        info!(dir = %dir, "archiving compositions");
        sessions = sessions.with_archive_dir(dir);
    }

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let state = Arc::new(app::AppState::new(config, sessions));
    let router = app::build_router(Arc::clone(&state));

    // spawn Telegram adapter if configured
    if let Some(ref telegram_cfg) = state.config.telegram {
        let adapter = cutout_telegram::TelegramAdapter::new(telegram_cfg, Arc::clone(&state));
        tokio::spawn(async move {
            adapter.run().await;
        });
        info!("Telegram bot started");
    } else {
        tracing::warn!("no [telegram] section configured; only the HTTP surface is active");
    }

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Cutout gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
