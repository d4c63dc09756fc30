// routes.rs
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use http::HeaderName;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::AllowedOrigins;
use crate::handlers::{self, ADMIN_KEY_HEADER};
use crate::poll::PollService;

pub fn create_routes(service: PollService, allowed_origins: &AllowedOrigins) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/polls", post(handlers::create_poll))
        .route("/api/polls/{id}", get(handlers::get_poll))
        .route("/api/polls/{id}/vote", post(handlers::vote))
        .layer(cors(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

fn cors(allowed_origins: &AllowedOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(ADMIN_KEY_HEADER)]);

    match allowed_origins {
        // Browsers refuse credentials with a wildcard origin.
        AllowedOrigins::Any => layer.allow_origin(AllowOrigin::any()),
        AllowedOrigins::List(list) => {
            let origins: Vec<HeaderValue> = list
                .iter()
                .filter(|origin| origin.as_str() != "*")
                .filter_map(|origin| {
                    HeaderValue::from_str(origin)
                        .map_err(|_| warn!("Ignoring invalid CORS origin: {origin}"))
                        .ok()
                })
                .collect();

            layer
                .allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
        }
    }
}
