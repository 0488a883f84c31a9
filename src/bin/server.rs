use std::sync::Arc;

use axum::routing::get;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use smarttrip_api::config::AppConfig;
use smarttrip_api::planner::RoutePlanner;
use smarttrip_api::providers::{GeminiClient, GooglePlacesClient, PlaceProvider, WeatherApiClient};
use smarttrip_api::{api, migrator, telemetry};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    telemetry::init_telemetry("smarttrip-api").expect("failed to install OpenTelemetry tracer");

    let config = AppConfig::from_env().expect("invalid configuration");
    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let mut opts = ConnectOptions::new(config.database_url.clone());
    opts.sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to database");

    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    smarttrip_api::metrics::init_metrics(&db).await;

    let place_provider: Arc<dyn PlaceProvider> = Arc::new(GooglePlacesClient::new(&config.places));
    let planner = Arc::new(RoutePlanner::new(
        db.clone(),
        Arc::new(GeminiClient::new(&config.gemini)),
        place_provider.clone(),
        Arc::new(WeatherApiClient::new(&config.weather)),
        &config.places,
        config.planner.clone(),
    ));

    let shutdown = CancellationToken::new();

    let cors = match config.cors_origin.as_deref() {
        Some(origin) => tower_http::cors::CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<axum::http::HeaderValue>()
                    .expect("CORS_ORIGIN must be a valid header value"),
            )
            .allow_credentials(true),
        None => tower_http::cors::CorsLayer::new().allow_origin(tower_http::cors::Any),
    }
    .allow_methods([
        axum::http::Method::GET,
        axum::http::Method::POST,
        axum::http::Method::DELETE,
    ])
    .allow_headers([
        axum::http::header::CONTENT_TYPE,
        axum::http::header::AUTHORIZATION,
    ]);

    let app = api::router(db, planner, place_provider, shutdown.clone())
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // "METHOD /path", e.g. "POST /api/routes/plan"
                    let span_name = match matched_path {
                        Some(path) => format!("{} {}", request.method(), path),
                        None => format!("{} {}", request.method(), request.uri().path()),
                    };

                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        // Filled in by middleware and handlers
                        table = tracing::field::Empty,
                        action = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        itinerary_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {})
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(cors)
        .route("/metrics", get(|| async move { metric_handle.render() }));

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listener");

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received, cancelling in-flight requests");
            signal_token.cancel();
        })
        .await
        .expect("server error");

    telemetry::shutdown_telemetry();
}
