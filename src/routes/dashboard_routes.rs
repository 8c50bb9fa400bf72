use axum::{routing::get, Router};

use crate::controllers::dashboard_controller::{
    export_report, get_health, get_prediction_chart, get_predictions, get_solar_data, get_stats, get_weather,
    post_solar_data,
};
use crate::shared_state::AppState;

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/solar-data",        get(get_solar_data).post(post_solar_data))
        .route("/weather",           get(get_weather))
        .route("/predictions",       get(get_predictions))
        .route("/predictions/chart", get(get_prediction_chart))
        .route("/stats",             get(get_stats))
        .route("/export-report",     get(export_report))
        .route("/health",            get(get_health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::store::DataStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    fn app() -> Router {
        let config: Config = serde_json::from_value(serde_json::json!({
            "weather": { "api_key": "k", "base_url": "http://127.0.0.1:9", "latitude": 1.0, "longitude": 2.0 }
        }))
        .unwrap();
        let state = AppState::new(config, DataStore::open_in_memory().unwrap()).unwrap();
        Router::new().nest("/api", api_routes(state))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn batch() -> String {
        let now = Utc::now();
        serde_json::json!([
            { "timestamp": now - Duration::minutes(2), "data": { "battery_capacity": 90.0, "pv_input_power": 1200.0 } },
            { "timestamp": now - Duration::minutes(1), "data": { "battery_capacity": 91.0, "pv_input_power": 1300.0 } }
        ])
        .to_string()
    }

    fn post(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["forecast_fresh"], false);
    }

    #[tokio::test]
    async fn ingested_samples_are_listed() {
        let app = app();
        let response = app.clone().oneshot(post("/api/solar-data", batch())).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["inserted"], 2);

        let response = app.oneshot(get("/api/solar-data?timeRange=1d&dataType=all")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["data"]["pv_input_power"], 1200.0);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let response = app().oneshot(post("/api/solar-data", "[]".into())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn stats_on_empty_window_is_bad_request() {
        let response = app().oneshot(get("/api/stats?timeRange=yesterday")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn weather_without_provider_is_bad_gateway() {
        let response = app().oneshot(get("/api/weather")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn report_is_served_as_attachment() {
        let app = app();
        app.clone().oneshot(post("/api/solar-data", batch())).await.unwrap();

        let response = app.oneshot(get("/api/export-report?timeRange=week")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert_eq!(disposition, "attachment; filename=\"solar-report-week.html\"");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Time Period: Week"));
    }
}
