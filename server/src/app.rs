//! Router assembly.

use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::routes::{auth, events, extract, orders, system};
use crate::session::{require_session, LOGIN_PATH};
use crate::state::AppState;

/// Builds the full application. `cors_origins` empty means same-origin only.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let public = Router::new()
        .route("/health", get(system::health))
        .route(LOGIN_PATH, get(auth::login_page).post(auth::login));

    let mut protected = Router::new()
        .route("/", get(system::index))
        .route("/logout", post(auth::logout))
        .route("/api/taxonomy", get(system::taxonomy))
        .route(
            "/api/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/api/orders/events", get(events::order_events))
        .route(
            "/api/orders/{id}",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/api/parse-pdf", post(extract::parse_pdf));

    if let Some(files) = &state.files {
        tracing::info!(mount = %files.mount, root = %files.root, "serving stored scans");
        protected = protected.nest_service(&files.mount, ServeDir::new(&files.root));
    }

    let protected =
        protected.route_layer(from_fn_with_state(state.clone(), require_session));

    let mut app = Router::new()
        .merge(public)
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(state.body_limit)),
        )
        .with_state(state);

    if let Some(cors) = cors_layer(cors_origins) {
        app = app.layer(cors);
    }
    app
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([CONTENT_TYPE])
            .allow_credentials(true),
    )
}
