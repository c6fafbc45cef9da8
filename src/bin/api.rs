use chainease_payments::{
    analysis::{GeminiAnalyzer, MockAnalyzer, TransactionAnalyzer},
    api::{start_server, ApiState},
    config::AppConfig,
    session::Session,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    info!("🚀 ChainEase Payments - API Server");
    info!("📍 Port: {}", config.port);

    let analyzer: Arc<dyn TransactionAnalyzer> = if config.has_api_key() {
        info!(model = %config.analysis_model, "Using Gemini analyzer");
        Arc::new(GeminiAnalyzer::new(&config)?)
    } else {
        warn!("⚠️  GEMINI_API_KEY not set, using offline analyzer");
        Arc::new(MockAnalyzer)
    };

    let state = ApiState::new(Session::default(), analyzer);

    info!("✅ Session initialized");
    info!("📡 Starting API server...");

    start_server(state, config.port).await?;

    Ok(())
}
