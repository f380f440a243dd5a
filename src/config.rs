use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub booking: BookingSettings,
}

/// Tunables for the booking core. Read once at startup and carried in
/// `AppState`; the rest of the code never touches the environment.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    /// Spacing between candidate start times in the availability grid.
    pub slot_cadence_minutes: i64,
    /// Attempts for transient storage failures (deadlock, broken connection).
    pub storage_retry_max: u32,
    /// Upper bound for the exponential backoff between retries.
    pub storage_retry_cap_ms: u64,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            slot_cadence_minutes: 30,
            storage_retry_max: 3,
            storage_retry_cap_ms: 200,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let defaults = BookingSettings::default();
        let booking = BookingSettings {
            slot_cadence_minutes: env::var("SLOT_CADENCE_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.slot_cadence_minutes),
            storage_retry_max: env::var("STORAGE_RETRY_MAX")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.storage_retry_max),
            storage_retry_cap_ms: env::var("STORAGE_RETRY_CAP_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.storage_retry_cap_ms),
        };

        Ok(Self {
            port,
            database_url,
            host,
            booking,
        })
    }
}
