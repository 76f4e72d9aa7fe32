use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use bikeservice::config::AppConfig;
use bikeservice::db;
use bikeservice::handlers;
use bikeservice::services::assistant::groq::GroqAssistant;
use bikeservice::services::assistant::ollama::OllamaAssistant;
use bikeservice::services::assistant::Assistant;
use bikeservice::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    config.check_secrets()?;

    let conn = db::init_db(&config.database_url)?;

    let assistant: Box<dyn Assistant> = match config.assistant_provider.as_str() {
        "groq" => {
            anyhow::ensure!(
                !config.groq_api_key.is_empty(),
                "GROQ_API_KEY must be set when ASSISTANT_PROVIDER=groq"
            );
            tracing::info!("using Groq assistant (model: {})", config.groq_model);
            Box::new(GroqAssistant::new(
                config.groq_api_key.clone(),
                config.groq_model.clone(),
            ))
        }
        _ => {
            tracing::info!(
                "using Ollama assistant (url: {}, model: {})",
                config.ollama_url,
                config.ollama_model
            );
            Box::new(OllamaAssistant::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
            ))
        }
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        assistant,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
