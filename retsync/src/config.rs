use dhemitter::RetryPolicy;
use snowfetcher::{SnowflakeConfig, SourceFilter};

use crate::error::SyncError;

/// The warehouse platform identifier used in dataset URNs.
pub const PLATFORM: &str = "snowflake";

/// Knobs for one sync run, distinct from connection credentials.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Target environment fabric baked into every dataset URN (e.g. PROD).
    pub environment: String,
    /// Extract and report, but never call the write API.
    pub dry_run: bool,
    /// Global cap on concurrent in-flight upsert calls.
    pub max_in_flight: usize,
    pub retry: RetryPolicy,
}

/// Everything a run needs, validated once at startup and passed by reference
/// from then on. Nothing reads the environment after this is built.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub snowflake: SnowflakeConfig,
    pub gms_url: String,
    pub gms_token: String,
    pub filter: SourceFilter,
    pub options: SyncOptions,
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), SyncError> {
        self.snowflake
            .validate()
            .map_err(|err| SyncError::Config(err.to_string()))?;

        for (name, value) in [
            ("GMS URL", &self.gms_url),
            ("GMS token", &self.gms_token),
            ("environment", &self.options.environment),
        ] {
            if value.trim().is_empty() {
                return Err(SyncError::Config(format!("{name} must not be empty")));
            }
        }

        if self.options.max_in_flight == 0 {
            return Err(SyncError::Config(
                "max in-flight upserts must be at least 1".to_string(),
            ));
        }
        if self.options.retry.max_attempts == 0 {
            return Err(SyncError::Config(
                "retry attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
