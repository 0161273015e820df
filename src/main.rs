use std::sync::Arc;

use anyhow::Context;
use hama_pricing::{
    app,
    config::Config,
    pricing::PriceCalculator,
    vision::PestDetector,
    workbook::{SurfaceSource, TemplateSource},
    AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hama_pricing=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load config")?;

    // Fail fast on a missing calculation template.
    let source = TemplateSource::new(config.calculation_template.clone());
    source
        .load()
        .with_context(|| format!("Calculation template {}", config.calculation_template.display()))?;

    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run migrations")?;

    let detector = PestDetector::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.vision_timeout,
    )
    .context("Failed to build vision client")?;
    if !detector.is_configured() {
        tracing::warn!("GEMINI_API_KEY not set, pest detection is unavailable");
    }

    let state = AppState {
        db,
        calculator: Arc::new(PriceCalculator::new(source)),
        detector: Arc::new(detector),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}
