use super::handlers;
use super::state::AppState;
use crate::config::CorsOrigins;
use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Builds the router with CORS and request tracing.
pub fn create_app(state: AppState, cors_origins: &CorsOrigins) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/predict", post(handlers::predict))
        .route("/api/backtest", post(handlers::backtest))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Explicit origins get credentials; a wildcard does not, since browsers
/// refuse credentialed wildcard responses.
pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    match origins {
        CorsOrigins::Any => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600)),
        CorsOrigins::List(list) => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
                .max_age(Duration::from_secs(3600))
        }
    }
}
