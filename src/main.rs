use std::net::SocketAddr;
use std::sync::Arc;
use tutorial_captions::captions::{ffmpeg, CaptionGenerator, UnconfiguredCaptioner, WhisperCaptioner};
use tutorial_captions::config::AppConfig;
use tutorial_captions::storage::MediaStorage;
use tutorial_captions::store::{MemoryTutorialStore, PgTutorialStore, TutorialStore};
use tutorial_captions::{build_router, db, jobs, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    if let Err(e) = run().await {
        tracing::error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let media = MediaStorage::new(&config.upload_dir);
    media.ensure_layout().await?;
    tracing::info!("Uploads directory ready: {}", config.upload_dir.display());

    let store: Arc<dyn TutorialStore> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url, config.database_max_connections).await?;
            tracing::info!("Using PostgreSQL tutorial store");
            Arc::new(PgTutorialStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set. Tutorials are kept in memory and lost on restart.");
            Arc::new(MemoryTutorialStore::new())
        }
    };

    let generator: Arc<dyn CaptionGenerator> = match WhisperCaptioner::from_config(&config.captions) {
        Some(captioner) => {
            tracing::info!(
                "Initializing captioning client ({} via {})...",
                config.captions.model,
                config.captions.api_url
            );
            if let Err(e) = ffmpeg::check_ffmpeg_available().await {
                tracing::warn!("{} Caption generation will fail until it is installed.", e);
            }
            Arc::new(captioner)
        }
        None => {
            tracing::warn!("CAPTIONS_API_KEY not found. Caption generation will be marked as failed.");
            tracing::info!("To enable captions, set: CAPTIONS_API_KEY and optionally CAPTIONS_API_URL, CAPTIONS_MODEL");
            Arc::new(UnconfiguredCaptioner)
        }
    };

    let (caption_queue, caption_worker) =
        jobs::caption_queue(generator, store.clone(), config.captions.timeout);
    tokio::spawn(caption_worker.run());

    let state = Arc::new(AppState {
        store,
        media,
        caption_queue,
    });

    let app = build_router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,tutorial_captions=trace,sqlx=info,reqwest=info,hyper=info,tower_http=info".to_string()
        } else {
            "info,sqlx=warn,reqwest=warn,hyper=warn,tower_http=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_new(&log_level)?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🎓 Tutorial captions service starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    Ok(())
}
