use std::path::Path;

use axum::{
    Router,
    routing::get,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{handlers, state::AppState};

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::default_list).post(handlers::add_item))
        .route(
            "/delete",
            get(handlers::delete_list_page).post(handlers::delete_item),
        )
        .route("/about", get(handlers::about))
        .route("/healthz", get(handlers::healthcheck))
        .route("/{list_name}", get(handlers::custom_list))
}

/// Page and form routes only.
pub fn build_router(state: AppState) -> Router {
    routes().layer(TraceLayer::new_for_http()).with_state(state)
}

/// [`build_router`] plus files under `public_dir` for every unmatched path.
pub fn build_router_with_assets(state: AppState, public_dir: impl AsRef<Path>) -> Router {
    routes()
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
