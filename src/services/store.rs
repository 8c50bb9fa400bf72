use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::models::prediction::{ImpactFactors, PowerPrediction};
use crate::models::telemetry::{TelemetryReading, TelemetrySample};
use crate::models::weather::WeatherDayObservation;
use crate::services::cache::TtlCache;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored document is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("database lock poisoned")]
    Poisoned,
}

/// SQLite persistence for telemetry, predictions and the last forecast.
#[derive(Debug)]
pub struct DataStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS telemetry (
        id                              INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp                       TEXT NOT NULL,
        battery_capacity                REAL,
        battery_voltage                 REAL,
        battery_charging_current        REAL,
        battery_discharge_current       REAL,
        pv_input_power                  REAL,
        ac_output_active_power          REAL,
        inverter_heat_sink_temperature  REAL
    );

    CREATE INDEX IF NOT EXISTS idx_telemetry_timestamp ON telemetry(timestamp);

    CREATE TABLE IF NOT EXISTS predictions (
        date             TEXT PRIMARY KEY,
        predicted_power  INTEGER NOT NULL,
        confidence       REAL NOT NULL,
        factors_json     TEXT NOT NULL,
        weather_json     TEXT NOT NULL,
        last_updated     TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS weather_forecasts (
        id            INTEGER PRIMARY KEY CHECK (id = 1),
        fetched_at    TEXT NOT NULL,
        forecast_json TEXT NOT NULL
    );
";

impl DataStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!(path, "database opened");
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }

    // ─── Telemetry ───────────────────────────────────────────────────────────

    pub fn insert_telemetry(&self, samples: &[TelemetrySample]) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO telemetry (timestamp, battery_capacity, battery_voltage,
                        battery_charging_current, battery_discharge_current, pv_input_power,
                        ac_output_active_power, inverter_heat_sink_temperature)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for s in samples {
                    let d = &s.data;
                    stmt.execute(params![
                        s.timestamp,
                        d.battery_capacity,
                        d.battery_voltage,
                        d.battery_charging_current,
                        d.battery_discharge_current,
                        d.pv_input_power,
                        d.ac_output_active_power,
                        d.inverter_heat_sink_temperature,
                    ])?;
                }
            }
            tx.commit()?;
            debug!(count = samples.len(), "telemetry stored");
            Ok(samples.len())
        })
    }

    /// Samples with `start <= timestamp <= end`, oldest first.
    pub fn telemetry_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<TelemetrySample>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, battery_capacity, battery_voltage, battery_charging_current,
                        battery_discharge_current, pv_input_power, ac_output_active_power,
                        inverter_heat_sink_temperature
                 FROM telemetry
                 WHERE timestamp >= ?1 AND timestamp <= ?2
                 ORDER BY timestamp ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![start, end], |row| {
                Ok(TelemetrySample {
                    timestamp: row.get(0)?,
                    data: TelemetryReading {
                        battery_capacity: row.get(1)?,
                        battery_voltage: row.get(2)?,
                        battery_charging_current: row.get(3)?,
                        battery_discharge_current: row.get(4)?,
                        pv_input_power: row.get(5)?,
                        ac_output_active_power: row.get(6)?,
                        inverter_heat_sink_temperature: row.get(7)?,
                    },
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    // ─── Predictions ─────────────────────────────────────────────────────────

    /// Replaces the whole stored prediction set in one transaction.
    pub fn replace_predictions(&self, predictions: &[PowerPrediction], refreshed_at: DateTime<Utc>) -> Result<(), StoreError> {
        let encoded = predictions
            .iter()
            .map(|p| Ok((p, serde_json::to_string(&p.factors)?, serde_json::to_string(&p.weather)?)))
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM predictions", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO predictions (date, predicted_power, confidence, factors_json, weather_json, last_updated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for (p, factors, weather) in &encoded {
                    stmt.execute(params![p.date, p.predicted_power, p.confidence, factors, weather, refreshed_at])?;
                }
            }
            tx.commit()?;
            info!(count = predictions.len(), "prediction set replaced");
            Ok(())
        })
    }

    /// The stored set from today on, if it holds exactly `expected` days all refreshed within `ttl`.
    pub fn fresh_predictions(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
        expected: usize,
    ) -> Result<Option<TtlCache<Vec<PowerPrediction>>>, StoreError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT date, predicted_power, confidence, factors_json, weather_json, last_updated
                 FROM predictions WHERE date >= ?1 ORDER BY date ASC",
            )?;
            let rows = stmt.query_map(params![now.date_naive()], |row| {
                Ok((
                    row.get::<_, NaiveDate>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, DateTime<Utc>>(5)?,
                ))
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })?;

        if rows.len() != expected {
            return Ok(None);
        }
        let Some(oldest) = rows.iter().map(|r| r.5).min() else {
            return Ok(None);
        };
        let cache_entry = TtlCache::new((), oldest, ttl);
        if !cache_entry.is_fresh(now) {
            return Ok(None);
        }

        let predictions = rows
            .into_iter()
            .map(|(date, predicted_power, confidence, factors, weather, _)| {
                Ok(PowerPrediction {
                    date,
                    predicted_power,
                    confidence,
                    factors: serde_json::from_str::<ImpactFactors>(&factors)?,
                    weather: serde_json::from_str::<WeatherDayObservation>(&weather)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(Some(TtlCache::new(predictions, oldest, ttl)))
    }

    // ─── Weather ─────────────────────────────────────────────────────────────

    pub fn store_forecast(&self, forecast: &[WeatherDayObservation], fetched_at: DateTime<Utc>) -> Result<(), StoreError> {
        let json = serde_json::to_string(forecast)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO weather_forecasts (id, fetched_at, forecast_json) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET fetched_at = excluded.fetched_at, forecast_json = excluded.forecast_json",
                params![fetched_at, json],
            )?;
            Ok(())
        })
    }

    /// Last stored forecast and its fetch time, regardless of age.
    pub fn latest_forecast(&self) -> Result<Option<(Vec<WeatherDayObservation>, DateTime<Utc>)>, StoreError> {
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT forecast_json, fetched_at FROM weather_forecasts WHERE id = 1",
                    [],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, DateTime<Utc>>(1)?)),
                )
                .optional()?)
        })?;
        match row {
            Some((json, fetched_at)) => Ok(Some((serde_json::from_str(&json)?, fetched_at))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::telemetry::fixtures::{pv_sample, t0};
    use chrono::TimeZone;

    fn prediction(day: u32, power: u32) -> PowerPrediction {
        let date = NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        PowerPrediction {
            date,
            predicted_power: power,
            confidence: 0.85,
            weather: WeatherDayObservation::new(date),
            factors: ImpactFactors { cloud_impact: 0.7, temp_impact: 1.0, rain_impact: 0.8 },
        }
    }

    fn week(power: u32) -> Vec<PowerPrediction> {
        (1..=7).map(|d| prediction(d, power)).collect()
    }

    #[test]
    fn telemetry_is_returned_in_time_order_within_window() {
        let store = DataStore::open_in_memory().unwrap();
        let samples = vec![pv_sample(30, 3.0), pv_sample(0, 1.0), pv_sample(10, 2.0), pv_sample(120, 9.0)];
        assert_eq!(store.insert_telemetry(&samples).unwrap(), 4);

        let got = store.telemetry_between(t0(), t0() + Duration::minutes(30)).unwrap();
        let pv: Vec<_> = got.iter().map(|s| s.data.pv_input_power.unwrap()).collect();
        assert_eq!(pv, vec![1.0, 2.0, 3.0]);
        assert_eq!(got[0].data.battery_capacity, None);
    }

    #[test]
    fn predictions_are_replaced_as_a_whole() {
        let store = DataStore::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap();
        store.replace_predictions(&week(100), now).unwrap();

        let mut shifted: Vec<_> = (2..=8).map(|d| prediction(d, 300)).collect();
        shifted[0].weather.condition = Some("sunny".into());
        store.replace_predictions(&shifted, now).unwrap();

        let cached = store.fresh_predictions(now, Duration::hours(2), 7).unwrap().unwrap();
        assert_eq!(cached.value, shifted);
        assert_eq!(cached.fetched_at, now);
    }

    #[test]
    fn stale_or_incomplete_sets_are_not_served() {
        let store = DataStore::open_in_memory().unwrap();
        let refreshed = Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap();
        assert!(store.fresh_predictions(refreshed, Duration::hours(2), 7).unwrap().is_none());

        store.replace_predictions(&week(100), refreshed).unwrap();
        assert!(store.fresh_predictions(refreshed + Duration::minutes(90), Duration::hours(2), 7).unwrap().is_some());
        assert!(store.fresh_predictions(refreshed + Duration::hours(3), Duration::hours(2), 7).unwrap().is_none());
        assert!(store.fresh_predictions(refreshed, Duration::hours(2), 5).unwrap().is_none());
    }

    #[test]
    fn past_dates_are_not_served() {
        let store = DataStore::open_in_memory().unwrap();
        let refreshed = Utc.with_ymd_and_hms(2025, 6, 1, 23, 30, 0).unwrap();
        store.replace_predictions(&week(100), refreshed).unwrap();
        assert!(store.fresh_predictions(refreshed, Duration::hours(2), 7).unwrap().is_some());

        // still within the TTL, but June 1st is over
        let after_midnight = refreshed + Duration::hours(1);
        assert!(store.fresh_predictions(after_midnight, Duration::hours(2), 7).unwrap().is_none());
        let rest = store.fresh_predictions(after_midnight, Duration::hours(2), 6).unwrap().unwrap();
        assert_eq!(rest.value.first().map(|p| p.date), NaiveDate::from_ymd_opt(2025, 6, 2));
    }

    #[test]
    fn forecast_round_trips_through_single_slot() {
        let store = DataStore::open_in_memory().unwrap();
        assert!(store.latest_forecast().unwrap().is_none());

        let day = WeatherDayObservation::new(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        let t1 = Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap();
        store.store_forecast(&[day.clone()], t1).unwrap();
        let t2 = t1 + Duration::hours(3);
        store.store_forecast(&[day.clone(), day.clone()], t2).unwrap();

        let (forecast, fetched_at) = store.latest_forecast().unwrap().unwrap();
        assert_eq!(forecast.len(), 2);
        assert_eq!(fetched_at, t2);
    }

    #[test]
    fn file_backed_store_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("solar.db");
        let store = DataStore::open(path.to_str().unwrap()).unwrap();
        store.insert_telemetry(&[pv_sample(0, 5.0)]).unwrap();
        drop(store);

        let reopened = DataStore::open(path.to_str().unwrap()).unwrap();
        let all = reopened.telemetry_between(t0() - Duration::days(1), t0() + Duration::days(1)).unwrap();
        assert_eq!(all.len(), 1);
    }
}
