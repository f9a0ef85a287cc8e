use std::sync::Arc;

use anyhow::Context;
use poem::listener::TcpListener;
use psychro_chart_generator::core::renderer;
use psychro_chart_generator::settings::get_config;
use psychro_chart_generator::{AppState, init_openapi_route};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config()?;

    // Logging to File
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level())
        .with_target(false)
        .init();

    tracing::info!("Initializing Psychrometric Chart Service...");
    tracing::info!("run with config: {:?}", config);

    renderer::ensure_fonts().context("failed to register chart fonts")?;

    // Init App State
    let app_state = Arc::new(AppState::default());

    tracing::info!("Chart engine initialized successfully");

    let app = init_openapi_route(app_state, &config);
    tracing::info!("run server on {}:{}", config.host, config.port);
    poem::Server::new(TcpListener::bind(format!("{}:{}", config.host, config.port)))
        .run(app)
        .await
        .context("server stopped with an error")
}
