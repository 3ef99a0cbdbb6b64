use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crop_grader::app::{self, AppState};
use crop_grader::config::Config;
use crop_grader::grader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,crop_grader=debug".into());
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let missing = config.missing_required();
    if !missing.is_empty() {
        eprintln!("Missing environment variables:");
        for name in &missing {
            eprintln!("   - {name}");
        }
        eprintln!("Make sure your .env file exists and contains these variables");
        std::process::exit(1);
    }

    tracing::info!("Starting crop grading server with config: {:?}", config);
    for (name, masked) in config.masked_required() {
        tracing::info!("{name}: {masked}");
    }

    let grader = grader::from_config(&config)?;
    let state = AppState::new(&config, grader);
    state.uploads().ensure_dir().await?;

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = app::router(&config, state)
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(prometheus_layer),
        );

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());
    tracing::info!(
        upload_dir = %config.upload_dir.display(),
        retain_uploads = config.retain_uploads,
        ml_service_url = config.ml_service_url(),
        "Serving predictions"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
