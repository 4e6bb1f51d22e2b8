//! HTTP surface of the scoring pipeline

use crate::error::PipelineError;
use crate::pipeline::TransactionPipeline;
use crate::types::{DailyFraudCount, DashboardSummary, Transaction, TransactionRecord};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Records returned by `GET /transactions` when no limit is given
pub const DEFAULT_LIST_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TransactionPipeline>,
}

/// Response body of `POST /transaction`
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub message: String,
    #[serde(rename = "isFraud")]
    pub is_fraud: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

pub fn router(pipeline: Arc<TransactionPipeline>) -> Router {
    Router::new()
        .route("/transaction", post(process_transaction))
        .route("/transactions", get(list_transactions))
        .route("/dashboard-data", get(dashboard_data))
        .route("/fraud-trends", get(fraud_trends))
        .route("/health", get(health))
        .with_state(AppState { pipeline })
}

/// The body is parsed here rather than by the `Json` extractor so that
/// malformed input maps onto the same 400 response as other validation errors.
async fn process_transaction(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ProcessResponse>, PipelineError> {
    let transaction: Transaction = serde_json::from_slice(&body)
        .map_err(|e| PipelineError::Validation(e.to_string()))?;

    let verdict = state.pipeline.process(transaction).await?;

    Ok(Json(ProcessResponse {
        message: "Transaction processed".to_string(),
        is_fraud: verdict.is_fraud,
    }))
}

async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TransactionRecord>>, PipelineError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Json(state.pipeline.list_recent(limit).await?))
}

async fn dashboard_data(
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, PipelineError> {
    Ok(Json(state.pipeline.summary().await?))
}

async fn fraud_trends(
    State(state): State<AppState>,
) -> Result<Json<Vec<DailyFraudCount>>, PipelineError> {
    Ok(Json(state.pipeline.daily_fraud_counts().await?))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (PipelineError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                PipelineError::Encoding { value: "X".into() },
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::Inference("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PipelineError::Persistence("locked".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
