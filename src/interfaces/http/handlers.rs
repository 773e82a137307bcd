use super::dto::{BacktestResponse, HealthResponse, PredictionResponse, SymbolRequest};
use super::error::{AppError, AppResult};
use super::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `POST /api/predict`
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<SymbolRequest>, JsonRejection>,
) -> AppResult<Json<PredictionResponse>> {
    let Json(request) = body.map_err(|e| AppError::Unprocessable(e.body_text()))?;
    let result = state.service.predict(&request.symbol).await?;
    Ok(Json(result.into()))
}

/// `POST /api/backtest`
pub async fn backtest(
    State(state): State<AppState>,
    body: Result<Json<SymbolRequest>, JsonRejection>,
) -> AppResult<Json<BacktestResponse>> {
    let Json(request) = body.map_err(|e| AppError::Unprocessable(e.body_text()))?;
    let result = state.service.backtest(&request.symbol).await?;
    Ok(Json(result.into()))
}
