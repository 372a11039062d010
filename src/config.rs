use anyhow::Result;
use dotenvy::dotenv;
use std::env;

use crate::distance::DistanceUnit;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub distance_unit: DistanceUnit,
    pub worker_poll_interval: u64,
    pub worker_max_retries: u32,
    pub worker_circuit_breaker_cooldown: u64,
    pub years_tracked_ttl: u64,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "tracklog".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "tracklog".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "tracklog".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let distance_unit = env::var("DISTANCE_UNIT")
            .unwrap_or_else(|_| "km".to_string())
            .parse()
            .unwrap_or(DistanceUnit::Km);
        let worker_poll_interval = env::var("WORKER_POLL_INTERVAL")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);
        let worker_max_retries = env::var("WORKER_MAX_RETRIES")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);
        let worker_circuit_breaker_cooldown = env::var("WORKER_CIRCUIT_BREAKER_COOLDOWN")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);
        let years_tracked_ttl = env::var("YEARS_TRACKED_TTL")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            distance_unit,
            worker_poll_interval,
            worker_max_retries,
            worker_circuit_breaker_cooldown,
            years_tracked_ttl,
            log_level,
        })
    }
}
