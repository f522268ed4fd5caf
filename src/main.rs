//! # ChefBot Backend - Main Application Entry Point
//!
//! Voice-assistant backend for The Hungry Dragon restaurant. A browser
//! records a clip, posts it to `/process_audio`, and gets back the spoken
//! reply: upload → normalize → transcribe → chat turn → synthesize → MP3.
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML files + environment variables)
//! - **error**: The error taxonomy and its HTTP mapping
//! - **audio**: Normalization of uploads to mono 16kHz WAV
//! - **speech**: Google Cloud STT/TTS clients and token minting
//! - **dialogue**: Persona, per-client sessions, Gemini client, action detection
//! - **pipeline**: The end-to-end voice turn
//! - **state**: Shared application state and metrics
//! - **middleware**: Request logging and metrics collection
//! - **handlers**: HTTP request handlers
//! - **health**: Health and metrics endpoints

mod audio;
mod config;
mod dialogue;
mod error;
mod handlers;
mod health;
mod middleware;
mod pipeline;
mod speech;
mod state;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use audio::AudioNormalizer;
use config::AppConfig;
use dialogue::{ChatClient, SessionRegistry};
use pipeline::VoicePipeline;
use speech::{GoogleAuth, SynthesisClient, TranscriptionClient};
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown flag, set by the signal handler task and polled by the
/// main select loop.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting chefbot-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}",
        config.server.host, config.server.port
    );

    let pipeline = Arc::new(build_pipeline(&config)?);
    let app_state = AppState::new(config.clone(), pipeline.clone());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();
    spawn_session_sweeper(pipeline.clone(), config.session.sweep_interval_secs);

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .route("/", web::get().to(handlers::index))
            .route("/process_audio", web::post().to(handlers::process_audio))
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics)),
            )
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Wire the pipeline stages together from the loaded configuration.
fn build_pipeline(config: &AppConfig) -> Result<VoicePipeline> {
    let timeout = Duration::from_secs(config.limits.request_timeout_secs);
    let auth = GoogleAuth::from_key_file(&config.cloud.credentials_path);

    let stt = TranscriptionClient::new(auth.clone(), config.cloud.stt_language.clone(), timeout)?;
    let chat = ChatClient::new(
        config.cloud.gemini_api_key.clone(),
        config.cloud.chat_model.clone(),
        timeout,
    )?;
    let tts = SynthesisClient::new(
        auth,
        config.cloud.tts_language.clone(),
        config.cloud.tts_gender.clone(),
        timeout,
    )?;
    let sessions = Arc::new(SessionRegistry::new(config.session.idle_timeout_secs));

    Ok(VoicePipeline::new(
        AudioNormalizer::new(),
        stt,
        chat,
        tts,
        sessions,
    ))
}

/// Periodically evict dialogue sessions that have gone idle.
fn spawn_session_sweeper(pipeline: Arc<VoicePipeline>, sweep_interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval_secs));
        loop {
            interval.tick().await;
            let evicted = pipeline.sessions().evict_idle();
            if evicted > 0 {
                info!(evicted, "evicted idle dialogue sessions");
            }
        }
    });
}

/// Initialize the tracing (logging) system.
///
/// `RUST_LOG` controls the filter; the default keeps this crate at debug
/// and actix at info.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chefbot_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Listen for SIGTERM/SIGINT and flip the shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Poll the shutdown flag until it is set.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
