//! HTTP read layer for the dashboard.
//!
//! All endpoints read through the shared readonly pool. Card endpoints
//! accept a POST body naming the card type and an optional LGA scope, and
//! respond with the rows, a computed summary block and a row count.

pub mod queries;

use crate::db::{self, DbError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{PgPool, Row};
use tower_http::cors::CorsLayer;
use tracing::error;

use queries::{CardType, LgaFilter};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/da-comprehensive", post(da_comprehensive))
        .route("/api/cc-comprehensive", post(cc_comprehensive))
        .route("/api/oc-comprehensive", post(oc_comprehensive))
        .route("/api/lgas", get(list_lgas))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    #[serde(rename = "type")]
    card_type: Option<String>,
    lga_code: Option<String>,
    lga_name: Option<String>,
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: String) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": message })),
    )
}

fn internal_error(context: &str, err: DbError) -> ApiError {
    error!("[{}] Error: {}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": err.to_string() })),
    )
}

/// Parse and validate the card type from a request body.
fn card_type(request: &CardRequest) -> Result<(CardType, &str), ApiError> {
    let raw = request
        .card_type
        .as_deref()
        .ok_or_else(|| bad_request("Missing required parameter: type".to_string()))?;

    let card = CardType::parse(raw).ok_or_else(|| bad_request(format!("Invalid type: {}", raw)))?;
    Ok((card, raw))
}

/// Run a card statement and unwrap the single `json_agg` row into the
/// underlying array of card rows.
async fn fetch_card_rows(
    pool: &PgPool,
    inner_sql: &str,
    filter: &LgaFilter,
) -> Result<Vec<Value>, DbError> {
    let sql = format!(
        "SELECT COALESCE(json_agg(row_to_json(t)), '[]'::json) AS data FROM ({}) t",
        inner_sql
    );

    let rows = db::fetch_rows(pool, &sql, filter.param.as_deref()).await?;

    let data = rows
        .first()
        .map(|row| row.try_get::<Value, _>("data"))
        .transpose()?
        .unwrap_or_else(|| Value::Array(Vec::new()));

    match data {
        Value::Array(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

fn card_response(card_raw: &str, filter: &LgaFilter, data: Vec<Value>, summary: Value) -> Value {
    json!({
        "success": true,
        "type": card_raw,
        "lga": filter.label,
        "count": data.len(),
        "data": data,
        "summary": summary,
    })
}

async fn da_comprehensive(
    State(state): State<AppState>,
    Json(request): Json<CardRequest>,
) -> Result<Json<Value>, ApiError> {
    let (card, raw) = card_type(&request)?;
    let filter = LgaFilter::new(request.lga_code.as_deref(), request.lga_name.as_deref());

    let sql = queries::da_query(card, &filter);
    let data = fetch_card_rows(&state.db, &sql, &filter)
        .await
        .map_err(|e| internal_error("DA Comprehensive API", e))?;

    let summary = queries::da_summary(&data);
    Ok(Json(card_response(raw, &filter, data, summary)))
}

async fn cc_comprehensive(
    State(state): State<AppState>,
    Json(request): Json<CardRequest>,
) -> Result<Json<Value>, ApiError> {
    let (card, raw) = card_type(&request)?;
    let filter = LgaFilter::new(request.lga_code.as_deref(), request.lga_name.as_deref());

    let sql = queries::cc_query(card, &filter)
        .ok_or_else(|| bad_request(format!("Invalid type: {}", raw)))?;
    let data = fetch_card_rows(&state.db, &sql, &filter)
        .await
        .map_err(|e| internal_error("CC Comprehensive API", e))?;

    let summary = queries::cc_summary(&data);
    Ok(Json(card_response(raw, &filter, data, summary)))
}

async fn oc_comprehensive(
    State(state): State<AppState>,
    Json(request): Json<CardRequest>,
) -> Result<Json<Value>, ApiError> {
    let (card, raw) = card_type(&request)?;
    let filter = LgaFilter::new(request.lga_code.as_deref(), request.lga_name.as_deref());

    let sql = queries::oc_query(card, &filter)
        .ok_or_else(|| bad_request(format!("Invalid type: {}", raw)))?;
    let data = fetch_card_rows(&state.db, &sql, &filter)
        .await
        .map_err(|e| internal_error("OC Comprehensive API", e))?;

    let summary = queries::oc_summary(&data);
    Ok(Json(card_response(raw, &filter, data, summary)))
}

async fn list_lgas(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let filter = LgaFilter::new(None, None);
    let data = fetch_card_rows(&state.db, queries::LGA_LIST_SQL, &filter)
        .await
        .map_err(|e| internal_error("LGA List API", e))?;

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match db::health_check(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "ok" })),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": err })),
        ),
    }
}
