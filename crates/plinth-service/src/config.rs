//! Environment-driven configuration.

use std::time::Duration;

use plinth_core::defaults::{CACHE_TTL_SECS, CHANGE_DEBOUNCE_MS};
use plinth_core::{Error, Result};

use crate::miniatures::WriteDefaults;

/// Application configuration assembled from the environment.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `DATABASE_URL` | required | PostgreSQL connection string |
/// | `PLINTH_IMAGE_ENDPOINT` | unset | Image upload/delete script URL |
/// | `PLINTH_IMAGE_BASE_URL` | `""` | Public base URL images are served from |
/// | `PLINTH_DEFAULT_PAINTER_ID` | `1` | Painter applied when none is chosen |
/// | `PLINTH_DEFAULT_BASE_SIZE_ID` | `1` | Base size applied when none is chosen |
/// | `PLINTH_CACHE_TTL_SECS` | `300` | Page/reference cache time-to-live |
/// | `PLINTH_DEBOUNCE_MS` | `100` | Change-feed debounce window |
#[derive(Debug, Clone)]
pub struct PlinthConfig {
    pub database_url: String,
    pub image_endpoint: Option<String>,
    pub image_base_url: String,
    pub default_painter_id: i64,
    pub default_base_size_id: i64,
    pub cache_ttl: Duration,
    pub change_debounce: Duration,
}

impl PlinthConfig {
    /// Read configuration from the environment (and `.env` when present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;

        Ok(Self {
            database_url,
            image_endpoint: std::env::var("PLINTH_IMAGE_ENDPOINT").ok(),
            image_base_url: std::env::var("PLINTH_IMAGE_BASE_URL").unwrap_or_default(),
            default_painter_id: env_i64("PLINTH_DEFAULT_PAINTER_ID", 1),
            default_base_size_id: env_i64("PLINTH_DEFAULT_BASE_SIZE_ID", 1),
            cache_ttl: Duration::from_secs(env_u64("PLINTH_CACHE_TTL_SECS", CACHE_TTL_SECS)),
            change_debounce: Duration::from_millis(env_u64(
                "PLINTH_DEBOUNCE_MS",
                CHANGE_DEBOUNCE_MS,
            )),
        })
    }

    /// The write-service defaults carried by this configuration.
    pub fn write_defaults(&self) -> WriteDefaults {
        WriteDefaults {
            painted_by_id: self.default_painter_id,
            base_size_id: self.default_base_size_id,
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
