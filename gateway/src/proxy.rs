use crate::errors::Result;
use crate::params::{QueryParams, check_path};
use crate::state::AppState;
use crate::upstream::{join_url, parse_json};
use axum::Json;
use axum::response::{IntoResponse, Response};
use shared::http::make_json_error;

/// Which of the two public APIs a pass-through route targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiBase {
    Pncp,
    Consulta,
}

/// Relays one GET to the upstream API, keeping its status and JSON body.
pub async fn forward(
    state: &AppState,
    base: ApiBase,
    endpoint: &str,
    params: &QueryParams,
) -> Result<Response> {
    check_path(endpoint)?;

    let base_url = match base {
        ApiBase::Pncp => &state.config.upstream.pncp_api_base,
        ApiBase::Consulta => &state.config.upstream.consulta_api_base,
    };
    let url = join_url(base_url, endpoint);
    let response = state.upstream.get(&url, params).await?;

    match parse_json(&url, &response.body) {
        Ok(body) => Ok((response.status, Json(body)).into_response()),
        Err(_) if !response.status.is_success() => Ok(make_json_error(
            response.status,
            &format!("Upstream returned status {}", response.status),
        )),
        Err(e) => Err(e),
    }
}
