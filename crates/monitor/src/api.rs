//! HTTP API: health checks, Prometheus metrics and portfolio evaluation

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use monitor_lib::{
    health::{ComponentStatus, EvaluationSummary, HealthRegistry},
    Holding, HoldingReport, MetricDefinition, MetricStatus, PortfolioMonitor, PortfolioReport,
    SectorFilter,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub monitor: Arc<PortfolioMonitor>,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, monitor: Arc<PortfolioMonitor>) -> Self {
        Self {
            health_registry,
            monitor,
        }
    }
}

/// `?sector=a,b&as_of=YYYY-MM-DD`
#[derive(Debug, Default, Deserialize)]
pub struct EvaluateParams {
    pub sector: Option<String>,
    pub as_of: Option<NaiveDate>,
}

impl EvaluateParams {
    fn filter(&self) -> SectorFilter {
        self.sector
            .as_deref()
            .map(SectorFilter::parse)
            .unwrap_or_default()
    }

    fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// 200 while operational, 503 once a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus text exposition
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

async fn catalog(State(state): State<Arc<AppState>>) -> Json<Vec<MetricDefinition>> {
    Json(state.monitor.catalog().iter().cloned().collect())
}

async fn portfolio(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EvaluateParams>,
) -> Json<Vec<Holding>> {
    let filter = params.filter();
    Json(
        state
            .monitor
            .portfolio()
            .select(&filter)
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn evaluate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EvaluateParams>,
) -> Json<PortfolioReport> {
    let report = state
        .monitor
        .evaluate(&params.filter(), params.as_of())
        .await;

    state
        .health_registry
        .record_evaluation(EvaluationSummary::new(
            report.as_of,
            report.metrics_evaluated,
            report.data_unavailable,
        ))
        .await;

    Json(report)
}

async fn evaluate_holding(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(params): Query<EvaluateParams>,
) -> Result<Json<HoldingReport>, (StatusCode, Json<ErrorBody>)> {
    let as_of = params.as_of();
    let report = state
        .monitor
        .evaluate_holding(&ticker, as_of)
        .await
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: format!("ticker '{}' is not in the portfolio", ticker),
                }),
            )
        })?;

    let unavailable = report
        .metrics
        .iter()
        .filter(|m| m.status == MetricStatus::NoData)
        .count();
    state
        .health_registry
        .record_evaluation(EvaluationSummary::new(as_of, report.metrics.len(), unavailable))
        .await;

    Ok(Json(report))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/catalog", get(catalog))
        .route("/api/v1/portfolio", get(portfolio))
        .route("/api/v1/evaluate", get(evaluate))
        .route("/api/v1/holdings/:ticker/evaluate", get(evaluate_holding))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use monitor_lib::health::components;
    use monitor_lib::source::StaticDataSource;
    use monitor_lib::{MetricObservation, MetricSeries};
    use tower::ServiceExt;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn test_state() -> Arc<AppState> {
        let source = StaticDataSource::new().with_series(MetricSeries::new(
            "MSFT",
            "pe_ratio",
            vec![
                MetricObservation::new(date(2024, 3, 31), 35.0),
                MetricObservation::new(date(2024, 6, 30), 36.0),
                MetricObservation::new(date(2024, 9, 30), 34.0),
                MetricObservation::new(date(2024, 12, 20), 37.5),
            ],
        ));
        let monitor = PortfolioMonitor::builder()
            .source(Arc::new(source))
            .build()
            .unwrap();

        let health_registry = HealthRegistry::new();
        health_registry.register(components::DATA_SOURCE).await;
        health_registry.set_ready(true).await;

        Arc::new(AppState::new(health_registry, Arc::new(monitor)))
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_healthz_and_readyz() {
        let state = test_state().await;

        let (status, body) = get_json(state.clone(), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = get_json(state, "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
    }

    #[tokio::test]
    async fn test_catalog_lists_metrics() {
        let (status, body) = get_json(test_state().await, "/api/v1/catalog").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 16);
        assert_eq!(body[0]["id"], "pe_ratio");
    }

    #[tokio::test]
    async fn test_portfolio_sector_filter() {
        let (status, body) =
            get_json(test_state().await, "/api/v1/portfolio?sector=Technology").await;

        assert_eq!(status, StatusCode::OK);
        let tickers: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["ticker"].as_str().unwrap())
            .collect();
        assert_eq!(tickers, vec!["MSFT", "AAPL"]);
    }

    #[tokio::test]
    async fn test_evaluate_degrades_data_source() {
        let state = test_state().await;
        let (status, body) = get_json(
            state.clone(),
            "/api/v1/evaluate?sector=technology&as_of=2024-12-31",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["as_of"], "2024-12-31");
        assert_eq!(body["holdings"].as_array().unwrap().len(), 2);
        // Only MSFT pe_ratio has data: 2 holdings x 16 metrics - 1
        assert_eq!(body["data_unavailable"], 31);

        let health = state.health_registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.last_evaluation.map(|s| s.data_unavailable), Some(31));
    }

    #[tokio::test]
    async fn test_evaluate_holding() {
        let (status, body) = get_json(
            test_state().await,
            "/api/v1/holdings/msft/evaluate?as_of=2024-12-31",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["holding"]["ticker"], "MSFT");
        assert_eq!(body["metrics"][0]["current"], 37.5);
        assert_eq!(body["metrics"][0]["history_len"], 3);
    }

    #[tokio::test]
    async fn test_evaluate_unknown_holding_is_404() {
        let (status, body) =
            get_json(test_state().await, "/api/v1/holdings/TSLA/evaluate").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("TSLA"));
    }

    #[tokio::test]
    async fn test_invalid_as_of_is_rejected() {
        let (status, _) = get_json(test_state().await, "/api/v1/evaluate?as_of=yesterday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let response = create_router(test_state().await)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
