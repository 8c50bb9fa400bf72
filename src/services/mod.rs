pub mod aggregator;
pub mod cache;
pub mod charts;
pub mod dashboard_service;
pub mod power_predictor;
pub mod report;
pub mod store;
pub mod weather_client;
pub mod weather_impact;
