use crate::app_config::{AppConfig, Environment, JobsConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can use a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_nonzero_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        match raw.parse::<usize>() {
            Ok(0) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            }),
            Ok(v) => Ok(v),
            Err(e) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        }
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("PARTSDB_ENV", "development"))?;

    let bind_addr = parse("PARTSDB_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PARTSDB_LOG_LEVEL", "info");
    let aliases_path = PathBuf::from(or_default(
        "PARTSDB_ALIASES_PATH",
        "./config/brand_aliases.yaml",
    ));
    let storage_root = PathBuf::from(or_default("PARTSDB_STORAGE_ROOT", "./storage/uploads"));
    let public_base_url = or_default("PARTSDB_PUBLIC_BASE_URL", "http://localhost:3000/uploads")
        .trim_end_matches('/')
        .to_string();
    let export_path = PathBuf::from(or_default("PARTSDB_EXPORT_PATH", "./storage/products.xlsx"));

    let db_max_connections = parse_u32("PARTSDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PARTSDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PARTSDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let max_batch_items = parse_nonzero_usize("PARTSDB_MAX_BATCH_ITEMS", "500")?;
    let max_payload_bytes = parse_nonzero_usize("PARTSDB_MAX_PAYLOAD_BYTES", "2097152")?;
    let max_request_bytes = parse_nonzero_usize("PARTSDB_MAX_REQUEST_BYTES", "67108864")?;

    let jobs = JobsConfig {
        python: or_default("PARTSDB_JOB_PYTHON", "python3"),
        price_photo_script: PathBuf::from(or_default(
            "PARTSDB_JOB_PRICE_PHOTO_SCRIPT",
            "./python_modules/price_photo_update/main.py",
        )),
        trast_script: PathBuf::from(or_default(
            "PARTSDB_JOB_TRAST_SCRIPT",
            "./python_modules/price_photo_update/multi_parser.py",
        )),
        log_dir: PathBuf::from(or_default("PARTSDB_JOB_LOG_DIR", "./logs")),
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        aliases_path,
        storage_root,
        public_base_url,
        export_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        max_batch_items,
        max_payload_bytes,
        max_request_bytes,
        jobs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PARTSDB_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
