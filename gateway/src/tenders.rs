use crate::cache::build_key;
use crate::errors::{GatewayError, Result};
use crate::identifier::web_url;
use crate::params::{
    MIN_PAGE_SIZE, ParamError, QueryParams, check_path, non_empty, normalize_date,
    normalize_page_size, parse_number,
};
use crate::state::AppState;
use crate::upstream::join_url;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const OPEN_TENDERS_NAMESPACE: &str = "tenders:open";
const OPEN_TENDERS_PATH: &str = "v1/contratacoes/proposta";

/// Query string of the open tenders listing.
#[derive(Debug, Default, Deserialize)]
pub struct OpenTendersQuery {
    #[serde(rename = "dataFinal")]
    pub data_final: Option<String>,
    #[serde(rename = "codigoModalidadeContratacao")]
    pub codigo_modalidade_contratacao: Option<String>,
    pub uf: Option<String>,
    #[serde(rename = "palavraChave")]
    pub palavra_chave: Option<String>,
    pub pagina: Option<String>,
    #[serde(rename = "tamanhoPagina")]
    pub tamanho_pagina: Option<String>,
}

pub fn open_tender_params(query: &OpenTendersQuery, today: NaiveDate) -> Result<QueryParams, ParamError> {
    let mut params = QueryParams::new();
    params.insert(
        "dataFinal".into(),
        normalize_date(query.data_final.as_deref(), today)?,
    );

    let filters = [
        ("codigoModalidadeContratacao", &query.codigo_modalidade_contratacao),
        ("uf", &query.uf),
        ("palavraChave", &query.palavra_chave),
    ];
    for (name, value) in filters {
        if let Some(value) = non_empty(value.as_deref()) {
            params.insert(name.into(), value.to_string());
        }
    }

    let page = parse_number("pagina", query.pagina.as_deref())?.unwrap_or(1);
    let page_size = normalize_page_size(
        parse_number("tamanhoPagina", query.tamanho_pagina.as_deref())?,
        MIN_PAGE_SIZE,
    );
    params.insert("pagina".into(), page.to_string());
    params.insert("tamanhoPagina".into(), page_size.to_string());

    Ok(params)
}

/// Tenders currently accepting proposals, passed through as the upstream sent them.
pub async fn open_tenders(state: &AppState, query: &OpenTendersQuery, today: NaiveDate) -> Result<Value> {
    let params = open_tender_params(query, today)?;
    let key = build_key(OPEN_TENDERS_NAMESPACE, &params);

    if let Some(cached) = state.cache.get_json::<Value>(&key).await {
        return Ok(cached);
    }

    let url = join_url(&state.config.upstream.consulta_api_base, OPEN_TENDERS_PATH);
    let body = state.upstream.get_json(&url, &params).await?;

    state.cache.set_json(&key, &body, state.config.ttl.list()).await;

    let count = body
        .get("data")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);
    tracing::info!(count, "Open tenders served");
    Ok(body)
}

/// URLs tried, in order, when looking up one tender.
///
/// `identifier` must already have passed [`check_path`].
pub fn detail_candidates(state: &AppState, identifier: &str) -> [String; 3] {
    let upstream = &state.config.upstream;
    [
        join_url(
            &upstream.consulta_api_base,
            &format!("v1/contratacoes/{identifier}"),
        ),
        join_url(&upstream.pncp_api_base, &format!("v1/contratacoes/{identifier}")),
        join_url(&upstream.pncp_api_base, &format!("contratacoes/{identifier}")),
    ]
}

/// Body returned when no candidate produced the tender.
#[derive(Debug, Serialize)]
pub struct DetailUnavailable {
    #[serde(skip)]
    pub status: StatusCode,
    #[serde(rename = "numeroControlePNCP")]
    pub numero_controle_pncp: String,
    pub pncp_web_url: Option<String>,
    pub message: String,
    #[serde(rename = "status")]
    pub availability: &'static str,
}

impl IntoResponse for DetailUnavailable {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// How the candidate lookups failed, decides the final status.
#[derive(Debug, Default)]
struct Attempts {
    answered: usize,
    timed_out: usize,
    unreachable: usize,
}

impl Attempts {
    fn status(&self) -> StatusCode {
        if self.answered > 0 {
            StatusCode::NOT_FOUND
        } else if self.unreachable == 0 && self.timed_out > 0 {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        }
    }
}

/// Looks a tender up by control number, trying each candidate URL in turn.
///
/// The first 200 carrying a JSON object wins and is returned with
/// `numeroControlePNCP` and `pncp_web_url` added. Identifiers that could
/// reach outside the tender paths are answered with a 404 without any
/// upstream call.
pub async fn tender_details(
    state: &AppState,
    identifier: &str,
) -> std::result::Result<Value, DetailUnavailable> {
    let pncp_web_url = web_url(&state.config.upstream.portal_base, identifier);

    if let Err(e) = check_path(identifier) {
        tracing::warn!(identifier, error = %e, "Rejected tender identifier");
        return Err(DetailUnavailable {
            status: StatusCode::NOT_FOUND,
            numero_controle_pncp: identifier.to_string(),
            pncp_web_url,
            message: "Invalid tender identifier".to_string(),
            availability: "unavailable",
        });
    }

    let mut attempts = Attempts::default();

    for url in detail_candidates(state, identifier) {
        match state.upstream.get_json(&url, &QueryParams::new()).await {
            Ok(Value::Object(mut tender)) => {
                tracing::info!(identifier, url, "Tender details found");
                tender
                    .entry("numeroControlePNCP")
                    .or_insert_with(|| Value::String(identifier.to_string()));
                tender.insert(
                    "pncp_web_url".into(),
                    pncp_web_url.clone().map(Value::String).unwrap_or(Value::Null),
                );
                return Ok(Value::Object(tender));
            }
            Ok(_) => {
                tracing::debug!(identifier, url, "Candidate answered with a non-object payload");
                attempts.answered += 1;
            }
            Err(GatewayError::UpstreamTimeout(_)) => attempts.timed_out += 1,
            Err(GatewayError::UpstreamUnavailable(..)) => attempts.unreachable += 1,
            Err(e) => {
                tracing::debug!(identifier, url, error = %e, "Candidate did not have the tender");
                attempts.answered += 1;
            }
        }
    }

    let status = attempts.status();
    tracing::warn!(identifier, status = %status, ?attempts, "Tender details unavailable");

    let message = match status {
        StatusCode::NOT_FOUND => "Tender not found in any PNCP API",
        StatusCode::GATEWAY_TIMEOUT => "PNCP API timed out",
        _ => "PNCP API unreachable",
    };
    Err(DetailUnavailable {
        status,
        numero_controle_pncp: identifier.to_string(),
        pncp_web_url,
        message: message.to_string(),
        availability: "unavailable",
    })
}
