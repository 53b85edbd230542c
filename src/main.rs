mod app;
mod chat;
mod config;
mod event;
mod gemini;
mod settings;
mod theme;
mod ui;

use app::ChatStudioApp;
use chat::ChatSessionManager;
use config::ClientConfig;
use eframe::egui;
use gemini::{GeminiClient, GenerativeClient};
use std::sync::{mpsc, Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn connect(config: &ClientConfig) -> Result<Arc<dyn GenerativeClient>, chat::error::ChatError> {
    let credential = config::read_credential()?;
    info!("API key found; initializing client");
    let client = GeminiClient::connect(&credential, config)?;
    Ok(Arc::new(client))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("chatstudio-runtime")
        .build()?;

    let client_config = ClientConfig::from_env();
    let client = connect(&client_config);
    if let Err(err) = &client {
        error!(%err, "chat client unavailable");
    }

    let chat = ChatSessionManager::new(client, runtime.handle().clone(), tx, client_config.model);
    let app = ChatStudioApp::new(rx, chat, config::settings_path());
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Chat Studio")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Chat Studio",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )?;

    Ok(())
}
