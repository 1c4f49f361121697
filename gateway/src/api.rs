use crate::errors::{GatewayError, Result};
use crate::params::QueryParams;
use crate::proxy::{ApiBase, forward};
use crate::state::AppState;
use crate::stats::{StatCategory, StatsQuery, StatsResponse, load_stats};
use crate::tenders::{self, DetailUnavailable, OpenTendersQuery};
use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use chrono::{Local, NaiveDate};
use serde_json::{Value, json};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/test", get(test_api))
        .route("/api/licitacoes/abertas", get(open_tenders))
        .route(
            "/api/licitacoes/detalhes/{*numero_controle}",
            get(tender_details),
        )
        .route("/api/estatisticas/{category}", get(statistics))
        .route("/api/pncp/{*endpoint}", get(proxy_pncp))
        .route("/api/consulta/{*endpoint}", get(proxy_consulta))
        .fallback(not_found)
        .with_state(state)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn test_api() -> Json<Value> {
    Json(json!({"message": "API is working correctly"}))
}

async fn open_tenders(
    State(state): State<AppState>,
    Query(query): Query<OpenTendersQuery>,
) -> Result<Json<Value>> {
    tenders::open_tenders(&state, &query, today()).await.map(Json)
}

async fn tender_details(
    State(state): State<AppState>,
    Path(numero_controle): Path<String>,
) -> std::result::Result<Json<Value>, DetailUnavailable> {
    tenders::tender_details(&state, &numero_controle)
        .await
        .map(Json)
}

async fn statistics(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<StatsResponse> {
    let category: StatCategory = category.parse()?;
    load_stats(&state, category, &query, today()).await
}

async fn proxy_pncp(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Response> {
    forward(&state, ApiBase::Pncp, &endpoint, &params).await
}

async fn proxy_consulta(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Response> {
    forward(&state, ApiBase::Consulta, &endpoint, &params).await
}

async fn not_found() -> GatewayError {
    GatewayError::NotFound("no such route".into())
}
