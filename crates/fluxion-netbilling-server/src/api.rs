// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! HTTP boundary for the revenue service

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use fluxion_netbilling::{
    AggregateBucket, DebugCounters, Granularity, HourlyRow, NetBillingError, RevenueService,
    RevenueTotals,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RevenueService>,
    pub cache_control: HeaderValue,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("cache_control", &self.cache_control)
            .finish()
    }
}

impl AppState {
    pub fn new(service: Arc<RevenueService>, cache_control: &str) -> anyhow::Result<Self> {
        Ok(Self {
            service,
            cache_control: HeaderValue::from_str(cache_control)?,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/revenue/hourly", get(hourly_handler))
        .route("/api/revenue/aggregate", get(aggregate_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub debug: Option<String>,
    pub granularity: Option<String>,
}

impl RangeQuery {
    fn debug_requested(&self) -> bool {
        self.debug.as_deref().is_some_and(|flag| {
            matches!(
                flag.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }
}

#[derive(Debug, Serialize)]
struct HourlyResponse<'a> {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    rows: &'a [HourlyRow],
    totals: RevenueTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<DebugCounters>,
}

#[derive(Debug, Serialize)]
struct AggregateResponse {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    granularity: Granularity,
    buckets: Vec<AggregateBucket>,
}

/// Serialized as `{ "error": message }` with a status per failure kind
struct ApiError(StatusCode, String);

impl From<NetBillingError> for ApiError {
    fn from(err: NetBillingError) -> Self {
        let status = match &err {
            NetBillingError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            NetBillingError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            NetBillingError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

async fn hourly_handler(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Response, ApiError> {
    let report = state
        .service
        .hourly(
            query.from.as_deref(),
            query.to.as_deref(),
            query.debug_requested(),
        )
        .await?;

    info!(
        "📊 Hourly revenue {}..{}: {} rows, {:.2} PLN",
        report.range.from.format("%Y-%m-%d %H:%M"),
        report.range.to.format("%Y-%m-%d %H:%M"),
        report.rows.len(),
        report.totals.revenue_pln
    );

    let body = HourlyResponse {
        from: report.range.from,
        to: report.range.to,
        rows: report.rows.as_slice(),
        totals: report.totals,
        debug: report.debug,
    };
    Ok(cached(&state, Json(body)))
}

async fn aggregate_handler(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Response, ApiError> {
    let granularity = match query.granularity.as_deref() {
        None => Granularity::Day,
        Some(text) => text.parse::<Granularity>().map_err(|e| {
            warn!("⚠️ Rejected aggregate request: {}", e);
            ApiError(StatusCode::BAD_REQUEST, e.to_string())
        })?,
    };

    let report = state
        .service
        .aggregate(query.from.as_deref(), query.to.as_deref(), granularity)
        .await?;

    info!(
        "📊 Aggregated revenue by {}: {} buckets",
        report.granularity,
        report.buckets.len()
    );

    let body = AggregateResponse {
        from: report.range.from,
        to: report.range.to,
        granularity: report.granularity,
        buckets: report.buckets,
    };
    Ok(cached(&state, Json(body)))
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.service.metrics().encode() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn cached(state: &AppState, body: impl IntoResponse) -> Response {
    let mut response = body.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, state.cache_control.clone());
    response
}
