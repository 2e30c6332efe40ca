mod config;
mod console;
mod playback;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use suara_chat::{HttpChatClient, ModelCatalog};
use suara_foundation::SessionState;
use suara_server::{router, EspeakBackend, TtsService};
use suara_session::{SessionConfig, SessionDeps, SessionNotice, VoiceSession};
use suara_tts::{LocalNarrator, NarrationConfig, RemoteNarrator};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Parser)]
#[command(name = "suara", about = "Voice assistant: narration service and console session")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the narration HTTP service
    Serve {
        /// Listen port (overrides configuration)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run an interactive voice session in the terminal
    Talk {
        /// Chat completion endpoint
        #[arg(long)]
        chat_url: Option<String>,
        /// Narration service endpoint
        #[arg(long)]
        narrate_url: Option<String>,
        /// Model to select at startup
        #[arg(long)]
        model: Option<String>,
    },
}

fn init_logging() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "suara.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    let config = config::load()?;

    match cli.command {
        Cmd::Serve { port } => serve(config, port).await,
        Cmd::Talk {
            chat_url,
            narrate_url,
            model,
        } => talk(config, chat_url, narrate_url, model).await,
    }
}

async fn serve(config: config::AppConfig, port_override: Option<u16>) -> anyhow::Result<()> {
    let port = port_override.unwrap_or(config.server.port);
    let service = TtsService::new(Box::new(EspeakBackend), &config.server.data_dir)?;
    let app = router(Arc::new(service));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(target: "server", "Narration service listening on port {}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!(target: "server", "Shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn talk(
    config: config::AppConfig,
    chat_url: Option<String>,
    narrate_url: Option<String>,
    model: Option<String>,
) -> anyhow::Result<()> {
    let chat_url = chat_url.unwrap_or(config.talk.chat_url);
    let narrate_url = narrate_url.unwrap_or(config.talk.narrate_url);
    let model = model.or(config.talk.model);

    let narration = NarrationConfig {
        lang: config.talk.lang.clone(),
        ..NarrationConfig::default()
    };
    let sink = Arc::new(playback::AplaySink::new().await);
    let primary = Arc::new(RemoteNarrator::new(narrate_url, narration.clone(), sink));
    let fallback = Arc::new(LocalNarrator::new(narration).await);
    let (engine, recognition_rx) = console::ConsoleEngine::new();

    let handle = VoiceSession::spawn(
        SessionDeps {
            engine: Box::new(engine),
            recognition_rx,
            chat: Arc::new(HttpChatClient::new(chat_url)),
            catalog: ModelCatalog::default(),
            primary_tier: primary,
            fallback_tier: fallback,
        },
        SessionConfig::default(),
    );
    if let Some(model) = model {
        handle.set_current_model(model).await;
    }

    let mut states = handle.subscribe_state();
    let mut notices = handle.subscribe_notices();
    println!("Type a line to speak; an empty line ends the take. Ctrl-C exits.");
    handle.greet().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            state = states.recv() => match state {
                Ok(SessionState::Speaking) => {
                    let snapshot = handle.snapshot();
                    if !snapshot.response.is_empty() {
                        println!("suara> {}", snapshot.response);
                    }
                }
                // Each completed round (or the greeting) re-arms listening.
                Ok(SessionState::Idle) => handle.start_listening().await,
                Ok(_) => {}
                Err(_) => break,
            },
            notice = notices.recv() => {
                if let Ok(SessionNotice::Error(message)) = notice {
                    eprintln!("! {message}");
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
