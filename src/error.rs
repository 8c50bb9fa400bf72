use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::services::aggregator::AggregationError;
use crate::services::power_predictor::PredictionError;
use crate::services::report::ReportError;
use crate::services::store::StoreError;
use crate::services::weather_client::WeatherError;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Aggregation(AggregationError::EmptyInput) => StatusCode::BAD_REQUEST,
            AppError::Prediction(_) | AppError::Weather(WeatherError::InvalidWeatherData(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Weather(WeatherError::UpstreamUnavailable(_)) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
