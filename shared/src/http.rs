use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tokio::net::TcpListener;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error_message: &'a str,
}

/// JSON error response carrying an explicit message.
pub fn make_json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error_message: message,
        }),
    )
        .into_response()
}

/// JSON error response using the canonical reason phrase of the status.
pub fn make_error_response(status: StatusCode) -> Response {
    make_json_error(status, status.canonical_reason().unwrap_or("Unknown"))
}

/// Binds `host:port` and serves the router until the listener fails.
pub async fn run_http_service(host: &str, port: u16, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host, port, "Listening");
    axum::serve(listener, router).await
}
