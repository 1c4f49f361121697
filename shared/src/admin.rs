use crate::http::make_error_response;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

/// Liveness and readiness probes served on the admin listener.
///
/// Both answer `ok` once the listener is up. The admin listener only starts
/// after the service state is built, so being reachable means ready.
pub fn admin_router() -> Router {
    Router::new()
        .route("/health", get(ok))
        .route("/ready", get(ok))
        .fallback(|| async { make_error_response(StatusCode::NOT_FOUND) })
}

async fn ok() -> &'static str {
    "ok\n"
}
