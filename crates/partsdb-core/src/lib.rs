pub mod aliases;
pub mod app_config;
pub mod catalog;
pub mod config;
pub mod jobs;
pub mod payload;
pub mod resolver;
pub mod status;

use thiserror::Error;

pub use aliases::{
    clean_aliases, load_aliases, parse_alias_blob, render_alias_blob, AliasesFile,
    BrandAliasConfig, ALIAS_DELIMITER,
};
pub use app_config::{AppConfig, Environment, JobsConfig};
pub use catalog::{
    normalize_article, normalize_brand, normalize_key, BatchReport, ItemInput, ItemOutcome,
    KeyError, NormalizedKey, ALLOWED_EXTENSIONS, STAGING_DIR,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use jobs::{JobKind, JobStatus};
pub use payload::{decode_payload, DecodedPayload, PayloadError};
pub use resolver::{classify, pick_canonical, resolve, BrandMatch, MatchKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read aliases file '{path}': {source}")]
    AliasesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse aliases file: {0}")]
    AliasesFileParse(#[from] serde_yaml::Error),

    #[error("alias validation failed: {0}")]
    Validation(String),
}
