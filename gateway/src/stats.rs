//! Aggregated procurement statistics.
//!
//! Each category maps onto one upstream listing whose items are reshaped into
//! [`StatRecord`]s. When the upstream fails or answers with an unknown shape,
//! the category's placeholder table is served instead.

use crate::cache::build_key;
use crate::errors::{GatewayError, Result};
use crate::fallback;
use crate::metrics_defs::STATS_FALLBACK;
use crate::params::{ParamError, QueryParams, default_window, non_empty, normalize_date, parse_number};
use crate::state::AppState;
use crate::upstream::{UpstreamClient, join_url};
use axum::Json;
use axum::response::{IntoResponse, Response};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::counter;
use std::str::FromStr;
use url::Url;

/// Response header naming where the statistics came from.
pub const SOURCE_HEADER: &str = "x-data-source";

const MISSING_LABEL: &str = "N/A";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatCategory {
    Modalidades,
    Uf,
    TipoOrgao,
    Contratos,
    Atas,
    Planos,
}

impl StatCategory {
    pub const ALL: [StatCategory; 6] = [
        StatCategory::Modalidades,
        StatCategory::Uf,
        StatCategory::TipoOrgao,
        StatCategory::Contratos,
        StatCategory::Atas,
        StatCategory::Planos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatCategory::Modalidades => "modalidades",
            StatCategory::Uf => "uf",
            StatCategory::TipoOrgao => "tipo_orgao",
            StatCategory::Contratos => "contratos",
            StatCategory::Atas => "atas",
            StatCategory::Planos => "planos",
        }
    }

    /// Path under the consulta API base.
    pub fn upstream_path(&self) -> &'static str {
        match self {
            StatCategory::Modalidades => "v1/contratacoes/modalidades",
            StatCategory::Uf => "v1/contratacoes/uf",
            StatCategory::TipoOrgao => "v1/contratacoes/tipoOrgao",
            StatCategory::Contratos => "v1/contratos",
            StatCategory::Atas => "v1/atas-registro-precos",
            StatCategory::Planos => "v1/pca",
        }
    }

    pub fn cache_namespace(&self) -> &'static str {
        match self {
            StatCategory::Modalidades => "stats:modalidade",
            StatCategory::Uf => "stats:uf",
            StatCategory::TipoOrgao => "stats:tipo_orgao",
            StatCategory::Contratos => "stats:contratos",
            StatCategory::Atas => "stats:atas",
            StatCategory::Planos => "stats:planos",
        }
    }

    /// Upstream field holding the record label.
    fn label_field(&self) -> &'static str {
        match self {
            StatCategory::Modalidades => "nome",
            StatCategory::Uf => "uf",
            StatCategory::TipoOrgao => "tipoOrgao",
            StatCategory::Contratos | StatCategory::Atas | StatCategory::Planos => "tipo",
        }
    }

    fn has_code(&self) -> bool {
        matches!(self, StatCategory::Modalidades)
    }

    /// Every category but the per-state breakdown can be narrowed to one state.
    pub fn accepts_uf(&self) -> bool {
        !matches!(self, StatCategory::Uf)
    }

    /// Procurement plans are filtered by year instead of a date window.
    pub fn uses_year(&self) -> bool {
        matches!(self, StatCategory::Planos)
    }
}

impl FromStr for StatCategory {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        StatCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| GatewayError::NotFound(format!("unknown statistics category {s:?}")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Live,
    Fallback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Live => "live",
            Source::Fallback => "fallback",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub quantity: u64,
    pub amount: f64,
    pub source: Source,
}

/// The shapes the upstream statistics listings come in.
#[derive(Debug, PartialEq)]
pub enum Envelope {
    /// A JSON array of items.
    Bare(Vec<Value>),
    /// An object carrying the items under `data`.
    Wrapped(Vec<Value>),
    Unrecognized,
}

impl From<Value> for Envelope {
    fn from(body: Value) -> Self {
        match body {
            Value::Array(items) => Envelope::Bare(items),
            Value::Object(mut object) => match object.remove("data") {
                Some(Value::Array(items)) => Envelope::Wrapped(items),
                _ => Envelope::Unrecognized,
            },
            _ => Envelope::Unrecognized,
        }
    }
}

impl Envelope {
    /// Maps the items onto records, or `None` when the shape is unknown.
    pub fn into_records(self, category: StatCategory) -> Option<Vec<StatRecord>> {
        match self {
            Envelope::Bare(items) => Some(records_from_items(category, &items)),
            Envelope::Wrapped(items) => {
                tracing::debug!(category = category.as_str(), "Unwrapping data envelope");
                Some(records_from_items(category, &items))
            }
            Envelope::Unrecognized => None,
        }
    }
}

fn records_from_items(category: StatCategory, items: &[Value]) -> Vec<StatRecord> {
    items
        .iter()
        .filter_map(|item| match item.as_object() {
            Some(object) => Some(record_from_object(category, object)),
            None => {
                tracing::debug!(category = category.as_str(), "Skipping non-object item");
                None
            }
        })
        .collect()
}

fn record_from_object(category: StatCategory, item: &Map<String, Value>) -> StatRecord {
    let label = match item.get(category.label_field()) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => MISSING_LABEL.to_string(),
    };
    let code = if category.has_code() {
        Some(item.get("codigo").and_then(as_i64).unwrap_or(0))
    } else {
        None
    };

    StatRecord {
        label,
        code,
        quantity: item.get("quantidade").and_then(as_u64).unwrap_or(0),
        amount: item.get("valorTotal").and_then(as_f64).unwrap_or(0.0),
        source: Source::Live,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Sorts by quantity, largest first. Ties keep their incoming order.
pub fn sort_by_quantity(records: &mut [StatRecord]) {
    records.sort_by(|a, b| b.quantity.cmp(&a.quantity));
}

/// Query string accepted by every statistics route.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    #[serde(rename = "dataInicial")]
    pub data_inicial: Option<String>,
    #[serde(rename = "dataFinal")]
    pub data_final: Option<String>,
    pub uf: Option<String>,
    pub ano: Option<String>,
}

/// Builds the upstream query for a category.
pub fn stats_params(
    category: StatCategory,
    query: &StatsQuery,
    today: NaiveDate,
) -> Result<QueryParams, ParamError> {
    let mut params = QueryParams::new();

    if category.uses_year() {
        let year = parse_number("ano", query.ano.as_deref())?.unwrap_or(today.year() as u32);
        params.insert("ano".into(), year.to_string());
    } else {
        let (start, end) = default_window(today);
        params.insert(
            "dataInicial".into(),
            normalize_date(query.data_inicial.as_deref(), start)?,
        );
        params.insert(
            "dataFinal".into(),
            normalize_date(query.data_final.as_deref(), end)?,
        );
    }

    if category.accepts_uf() {
        if let Some(uf) = non_empty(query.uf.as_deref()) {
            params.insert("uf".into(), uf.to_string());
        }
    }

    Ok(params)
}

/// Fetches one category from upstream, substituting the placeholder table on
/// any failure. The result is always sorted.
pub async fn fetch_stats(
    upstream: &UpstreamClient,
    consulta_base: &Url,
    category: StatCategory,
    params: &QueryParams,
) -> (Vec<StatRecord>, Source) {
    let url = join_url(consulta_base, category.upstream_path());

    let live = upstream.get_json(&url, params).await.and_then(|body| {
        Envelope::from(body)
            .into_records(category)
            .ok_or_else(|| GatewayError::UpstreamMalformed(url.clone(), "unrecognized envelope".into()))
    });

    let (mut records, source) = match live {
        Ok(records) => (records, Source::Live),
        Err(e) => {
            tracing::warn!(category = category.as_str(), error = %e, "Serving fallback statistics");
            counter!(STATS_FALLBACK, "category" => category.as_str()).increment(1);
            (fallback::records(category), Source::Fallback)
        }
    };

    sort_by_quantity(&mut records);
    (records, source)
}

/// A statistics answer, rendered as a bare JSON array.
#[derive(Debug)]
pub struct StatsResponse {
    pub records: Vec<StatRecord>,
    pub source: Source,
}

impl StatsResponse {
    fn from_cached(records: Vec<StatRecord>) -> Self {
        let source = records.first().map(|r| r.source).unwrap_or(Source::Live);
        StatsResponse { records, source }
    }
}

impl IntoResponse for StatsResponse {
    fn into_response(self) -> Response {
        ([(SOURCE_HEADER, self.source.as_str())], Json(self.records)).into_response()
    }
}

/// Normalize, consult the cache, fetch, then store.
pub async fn load_stats(
    state: &AppState,
    category: StatCategory,
    query: &StatsQuery,
    today: NaiveDate,
) -> Result<StatsResponse> {
    let params = stats_params(category, query, today)?;
    let key = build_key(category.cache_namespace(), &params);

    if let Some(records) = state.cache.get_json::<Vec<StatRecord>>(&key).await {
        return Ok(StatsResponse::from_cached(records));
    }

    let (records, source) = fetch_stats(
        &state.upstream,
        &state.config.upstream.consulta_api_base,
        category,
        &params,
    )
    .await;

    if source == Source::Live || state.config.stats.cache_fallback {
        state
            .cache
            .set_json(&key, &records, state.config.ttl.stats())
            .await;
    }

    tracing::info!(
        category = category.as_str(),
        source = source.as_str(),
        records = records.len(),
        "Statistics served"
    );
    Ok(StatsResponse { records, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{test_state, test_state_with};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
    }

    fn quantities(records: &[StatRecord]) -> Vec<u64> {
        records.iter().map(|r| r.quantity).collect()
    }

    #[test]
    fn test_category_round_trip() {
        for category in StatCategory::ALL {
            assert_eq!(category.as_str().parse::<StatCategory>().unwrap(), category);
        }
        assert!(matches!(
            "orgaos".parse::<StatCategory>(),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[test]
    fn test_envelope_detection() {
        assert_eq!(Envelope::from(json!([1])), Envelope::Bare(vec![json!(1)]));
        assert_eq!(
            Envelope::from(json!({"data": [1], "total": 1})),
            Envelope::Wrapped(vec![json!(1)])
        );
        assert_eq!(Envelope::from(json!({"data": {}})), Envelope::Unrecognized);
        assert_eq!(Envelope::from(json!({"items": []})), Envelope::Unrecognized);
        assert_eq!(Envelope::from(json!("text")), Envelope::Unrecognized);
    }

    #[test]
    fn test_field_mapping() {
        let items = json!([
            {"nome": "Pregão", "codigo": 6, "quantidade": 10, "valorTotal": 99.5},
            {"codigo": "7", "quantidade": "3", "valorTotal": "12.25"},
            {},
            42
        ]);
        let records = Envelope::from(items)
            .into_records(StatCategory::Modalidades)
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            StatRecord {
                label: "Pregão".into(),
                code: Some(6),
                quantity: 10,
                amount: 99.5,
                source: Source::Live,
            }
        );
        assert_eq!(records[1].label, "N/A");
        assert_eq!(records[1].code, Some(7));
        assert_eq!(records[1].quantity, 3);
        assert_eq!(records[1].amount, 12.25);
        assert_eq!(records[2].code, Some(0));
        assert_eq!(records[2].quantity, 0);
        assert_eq!(records[2].amount, 0.0);
    }

    #[test]
    fn test_label_field_per_category() {
        let item = json!([{"uf": "SP", "tipoOrgao": "Autarquia", "tipo": "Aditivo", "quantidade": 1}]);
        let label = |category| {
            Envelope::from(item.clone()).into_records(category).unwrap()[0]
                .label
                .clone()
        };
        assert_eq!(label(StatCategory::Uf), "SP");
        assert_eq!(label(StatCategory::TipoOrgao), "Autarquia");
        assert_eq!(label(StatCategory::Contratos), "Aditivo");
        assert_eq!(label(StatCategory::Modalidades), "N/A");
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let record = |label: &str, quantity| StatRecord {
            label: label.into(),
            code: None,
            quantity,
            amount: 0.0,
            source: Source::Live,
        };
        let mut records = vec![record("a", 5), record("b", 67), record("c", 22), record("d", 22)];
        sort_by_quantity(&mut records);
        let labels: Vec<_> = records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["b", "c", "d", "a"]);
    }

    #[test]
    fn test_stats_params() {
        let query = StatsQuery {
            data_inicial: Some("2024-05-01".into()),
            uf: Some("SP".into()),
            ..Default::default()
        };
        let params = stats_params(StatCategory::Contratos, &query, today()).unwrap();
        assert_eq!(params.get("dataInicial").map(String::as_str), Some("20240501"));
        assert_eq!(params.get("dataFinal").map(String::as_str), Some("20240531"));
        assert_eq!(params.get("uf").map(String::as_str), Some("SP"));

        // The per-state breakdown ignores a state filter
        let params = stats_params(StatCategory::Uf, &query, today()).unwrap();
        assert!(!params.contains_key("uf"));

        // Plans use a year
        let params = stats_params(StatCategory::Planos, &StatsQuery::default(), today()).unwrap();
        assert_eq!(params.get("ano").map(String::as_str), Some("2024"));
        assert!(!params.contains_key("dataInicial"));

        let params = stats_params(StatCategory::Atas, &StatsQuery::default(), today()).unwrap();
        assert_eq!(params.get("dataInicial").map(String::as_str), Some("20240501"));
    }

    #[test]
    fn test_stats_params_invalid() {
        let query = StatsQuery {
            data_final: Some("2024-13-01".into()),
            ..Default::default()
        };
        assert!(stats_params(StatCategory::Uf, &query, today()).is_err());

        let query = StatsQuery {
            ano: Some("next".into()),
            ..Default::default()
        };
        assert!(stats_params(StatCategory::Planos, &query, today()).is_err());
    }

    #[tokio::test]
    async fn test_live_stats_are_sorted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/consulta/v1/contratacoes/uf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
                {"uf": "AC", "quantidade": 5, "valorTotal": 1.0},
                {"uf": "SP", "quantidade": 67, "valorTotal": 2.0},
                {"uf": "RJ", "quantidade": 22, "valorTotal": 3.0}
            ]})))
            .mount(&server)
            .await;

        let state = test_state(&server.uri());
        let response = load_stats(&state, StatCategory::Uf, &StatsQuery::default(), today())
            .await
            .unwrap();

        assert_eq!(response.source, Source::Live);
        assert_eq!(quantities(&response.records), [67, 22, 5]);
    }

    #[tokio::test]
    async fn test_error_status_serves_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/consulta/v1/contratacoes/modalidades"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let state = test_state(&server.uri());
        let response = load_stats(
            &state,
            StatCategory::Modalidades,
            &StatsQuery::default(),
            today(),
        )
        .await
        .unwrap();

        assert_eq!(response.source, Source::Fallback);
        assert_eq!(response.records.len(), 7);
        assert_eq!(response.records[0].label, "Dispensa de Licitação");
        assert_eq!(response.records[0].quantity, 67);
        assert_eq!(response.records[0].code, Some(7));
        assert_eq!(quantities(&response.records), [67, 45, 22, 15, 12, 8, 5]);
    }

    #[tokio::test]
    async fn test_unknown_shape_serves_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/consulta/v1/contratos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"foo": 1})))
            .mount(&server)
            .await;

        let state = test_state(&server.uri());
        let response = load_stats(&state, StatCategory::Contratos, &StatsQuery::default(), today())
            .await
            .unwrap();
        assert_eq!(response.source, Source::Fallback);
        assert_eq!(quantities(&response.records), [125, 42, 5]);
    }

    #[tokio::test]
    async fn test_timeout_serves_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let state = test_state(&server.uri());
        let response = load_stats(&state, StatCategory::Atas, &StatsQuery::default(), today())
            .await
            .unwrap();
        assert_eq!(response.source, Source::Fallback);
        assert_eq!(response.records[0].label, "Ata de Registro");
    }

    #[tokio::test]
    async fn test_empty_upstream_list_is_live() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/consulta/v1/pca"))
            .and(query_param("ano", "2023"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let state = test_state(&server.uri());
        let query = StatsQuery {
            ano: Some("2023".into()),
            ..Default::default()
        };
        let response = load_stats(&state, StatCategory::Planos, &query, today())
            .await
            .unwrap();
        assert_eq!(response.source, Source::Live);
        assert!(response.records.is_empty());
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/consulta/v1/contratacoes/tipoOrgao"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"tipoOrgao": "Prefeitura", "quantidade": 3, "valorTotal": 10.0}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_state(&server.uri());
        let first = load_stats(&state, StatCategory::TipoOrgao, &StatsQuery::default(), today())
            .await
            .unwrap();
        let second = load_stats(&state, StatCategory::TipoOrgao, &StatsQuery::default(), today())
            .await
            .unwrap();
        assert_eq!(first.records, second.records);
        assert_eq!(second.source, Source::Live);
    }

    #[tokio::test]
    async fn test_fallback_caching_is_configurable() {
        for (cache_fallback, expected_calls) in [(true, 1), (false, 2)] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(503))
                .expect(expected_calls)
                .mount(&server)
                .await;

            let state = test_state_with(&server.uri(), |config| {
                config.stats.cache_fallback = cache_fallback;
            });
            for _ in 0..2 {
                let response = load_stats(&state, StatCategory::Uf, &StatsQuery::default(), today())
                    .await
                    .unwrap();
                assert_eq!(response.source, Source::Fallback);
            }
            server.verify().await;
        }
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_a_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let state = test_state(&server.uri());
        let query = StatsQuery {
            data_inicial: Some("2024-02-30".into()),
            ..Default::default()
        };
        let result = load_stats(&state, StatCategory::Uf, &query, today()).await;
        assert!(matches!(result, Err(GatewayError::InputInvalid(_))));
    }
}
