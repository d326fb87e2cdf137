use std::str::FromStr;
use std::time::Duration;

use nomina_core::encoding::SourceCharset;
use nomina_core::retry::RetryPolicy;
use nomina_db::DEFAULT_MAX_CONNECTIONS;
use nomina_legacy::ProcedureNames;
use nomina_pipeline::SiteConstants;

/// Configuration errors raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Whether pending movements are written to the legacy store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Build and log the legacy calls without executing them.
    DryRun,
    /// Migrate movements and record the outcome.
    Live,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::Live => "live",
        }
    }
}

impl FromStr for SyncMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dry_run" | "dry-run" | "dryrun" => Ok(Self::DryRun),
            "live" => Ok(Self::Live),
            _ => Err(()),
        }
    }
}

/// Bridge configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Character set of undecoded legacy text columns.
    pub charset: SourceCharset,
    pub procedures: ProcedureNames,
    pub retry: RetryPolicy,
    pub site: SiteConstants,
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub mode: SyncMode,
}

impl BridgeConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Default            |
    /// |----------------------------|--------------------|
    /// | `DATABASE_URL`             | required           |
    /// | `DATABASE_MAX_CONNECTIONS` | `20`               |
    /// | `LEGACY_CHARSET`           | `WIN1252`          |
    /// | `LEGACY_CREATE_PROCEDURE`  | `SP_ALTA_AFILIADO` |
    /// | `LEGACY_EDIT_PROCEDURE`    | `SP_EDITA_ENTIDAD` |
    /// | `LEGACY_CALL_TIMEOUT_SECS` | `60`               |
    /// | `LEGACY_TIMEOUT_RETRIES`   | `1`                |
    /// | `LEGACY_CONFLICT_RETRIES`  | `3`                |
    /// | `LEGACY_LOCALITY`          | `0001`             |
    /// | `LEGACY_MUNICIPALITY`      | `001`              |
    /// | `LEGACY_STATE`             | `09`               |
    /// | `LEGACY_COUNTRY`           | `MEX`              |
    /// | `SYNC_POLL_INTERVAL_SECS`  | `30`               |
    /// | `SYNC_BATCH_SIZE`          | `25`               |
    /// | `SYNC_MODE`                | `dry_run`          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let max_connections = parse(&get, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;

        let charset = match get("LEGACY_CHARSET") {
            None => SourceCharset::default(),
            Some(value) => SourceCharset::parse(&value).ok_or(ConfigError::Invalid {
                key: "LEGACY_CHARSET",
                value,
            })?,
        };

        let defaults = ProcedureNames::default();
        let procedures = ProcedureNames {
            create_affiliate: get("LEGACY_CREATE_PROCEDURE").unwrap_or(defaults.create_affiliate),
            edit_entity: get("LEGACY_EDIT_PROCEDURE").unwrap_or(defaults.edit_entity),
        };

        let policy = RetryPolicy::default();
        let retry = RetryPolicy {
            call_timeout: Duration::from_secs(parse_positive(
                &get,
                "LEGACY_CALL_TIMEOUT_SECS",
                policy.call_timeout.as_secs(),
            )?),
            max_timeout_retries: parse(&get, "LEGACY_TIMEOUT_RETRIES", policy.max_timeout_retries)?,
            max_conflict_retries: parse(&get, "LEGACY_CONFLICT_RETRIES", policy.max_conflict_retries)?,
            ..policy
        };

        let site_defaults = SiteConstants::default();
        let site = SiteConstants {
            locality: get("LEGACY_LOCALITY").unwrap_or(site_defaults.locality),
            municipality: get("LEGACY_MUNICIPALITY").unwrap_or(site_defaults.municipality),
            state: get("LEGACY_STATE").unwrap_or(site_defaults.state),
            country: get("LEGACY_COUNTRY").unwrap_or(site_defaults.country),
        };

        let poll_interval = Duration::from_secs(parse_positive(&get, "SYNC_POLL_INTERVAL_SECS", 30)?);
        let batch_size = parse(&get, "SYNC_BATCH_SIZE", 25i64)?;
        if batch_size <= 0 {
            return Err(ConfigError::Invalid {
                key: "SYNC_BATCH_SIZE",
                value: batch_size.to_string(),
            });
        }

        let mode = match get("SYNC_MODE") {
            None => SyncMode::DryRun,
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "SYNC_MODE",
                value,
            })?,
        };

        Ok(Self {
            database_url,
            max_connections,
            charset,
            procedures,
            retry,
            site,
            poll_interval,
            batch_size,
            mode,
        })
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Like [`parse`], for durations in seconds that must be non-zero.
fn parse_positive(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let secs = parse(get, key, default)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: secs.to_string(),
        });
    }
    Ok(secs)
}
