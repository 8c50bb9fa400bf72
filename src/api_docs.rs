use utoipa::OpenApi;

use crate::controllers::dashboard_controller;
use crate::error::ErrorBody;
use crate::models::{api, prediction, stats, telemetry, weather};

#[derive(OpenApi)]
#[openapi(
    paths(
        dashboard_controller::get_solar_data,
        dashboard_controller::post_solar_data,
        dashboard_controller::get_weather,
        dashboard_controller::get_predictions,
        dashboard_controller::get_prediction_chart,
        dashboard_controller::get_stats,
        dashboard_controller::export_report,
        dashboard_controller::get_health
    ),
    components(
        schemas(
            telemetry::TelemetrySample,
            telemetry::TelemetryReading,
            weather::WeatherDayObservation,
            weather::WeatherResponse,
            prediction::ImpactFactors,
            prediction::PowerPrediction,
            prediction::PredictionResponse,
            stats::AggregatedStats,
            stats::BatteryStats,
            stats::PowerStats,
            stats::TemperatureStats,
            api::IngestResponse,
            api::HealthStatus,
            ErrorBody
        )
    ),
    tags(
        (name = "solar-dashboard", description = "Solar monitoring, forecasting and reporting API")
    )
)]
pub struct ApiDoc;
