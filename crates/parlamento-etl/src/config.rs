//! Configuration for the ETL pipeline
//!
//! All settings are collected into a single immutable [`EtlConfig`] value,
//! built once at startup from defaults plus environment variables and passed
//! explicitly to the orchestrator and fetcher. There is no mutable
//! process-wide registry.

use chrono::NaiveDate;
use parlamento_common::EntityType;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

// ============================================================================
// Defaults
// ============================================================================

/// Default base URL for the open-data endpoints of parlamento.pt.
pub const DEFAULT_BASE_URL: &str = "https://app.parlamento.pt/webutils/abertos";

/// Default root for the bronze/silver data tiers.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Per-attempt HTTP timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Maximum fetch attempts per partition (first try included).
pub const DEFAULT_FETCH_RETRIES: u32 = 3;

/// Base delay for exponential backoff between attempts, in seconds.
pub const DEFAULT_FETCH_RETRY_DELAY_SECS: u64 = 2;

/// Concurrent fetches across partitions. Kept low on purpose: the upstream
/// source throttles aggressive clients.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// Parquet row group size; also the transform/write batch size.
pub const DEFAULT_PARQUET_ROW_GROUP_SIZE: usize = 100_000;

/// User agent sent on every request.
pub const USER_AGENT: &str = concat!("ParlamentoDB-ETL/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Legislatures
// ============================================================================

/// Immutable descriptor of a single legislature (session).
#[derive(Debug, Clone)]
pub struct LegislatureConfig {
    /// Session code, e.g. "L17"
    pub code: String,
    /// Display name, e.g. "XVII Legislatura"
    pub name: String,
    /// First day of the legislative term
    pub start_date: NaiveDate,
    /// Source URL template with an `{entity}` placeholder
    pub url_template: String,
}

impl LegislatureConfig {
    /// Resolve the source URL for one entity type.
    pub fn entity_url(&self, entity: EntityType) -> String {
        self.url_template.replace("{entity}", entity.as_str())
    }
}

// ============================================================================
// EtlConfig
// ============================================================================

/// Complete, immutable ETL configuration.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    /// Configured legislatures, newest first
    pub legislatures: Vec<LegislatureConfig>,
    /// Root of the data tiers (`bronze/`, `silver/` live under it)
    pub data_dir: PathBuf,
    /// Per-attempt HTTP timeout
    pub fetch_timeout: Duration,
    /// Maximum fetch attempts per partition
    pub fetch_retries: u32,
    /// Base backoff delay between attempts
    pub fetch_retry_delay: Duration,
    /// Bounded concurrency for fetches across partitions
    pub fetch_concurrency: usize,
    /// Parquet row group size / write batch size
    pub parquet_row_group_size: usize,
}

impl EtlConfig {
    /// Load configuration from environment and defaults.
    ///
    /// Environment variables:
    /// - `PARLAMENTO_BASE_URL`: base URL for source endpoints
    /// - `PARLAMENTO_DATA_DIR`: data tier root
    /// - `PARLAMENTO_FETCH_TIMEOUT_SECS`, `PARLAMENTO_FETCH_RETRIES`,
    ///   `PARLAMENTO_FETCH_RETRY_DELAY_SECS`, `PARLAMENTO_FETCH_CONCURRENCY`
    /// - `PARLAMENTO_PARQUET_ROW_GROUP_SIZE`
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let base_url = std::env::var("PARLAMENTO_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url)
            .map_err(|e| anyhow::anyhow!("invalid PARLAMENTO_BASE_URL '{}': {}", base_url, e))?;

        let config = EtlConfig {
            legislatures: Self::default_legislatures(&base_url),
            data_dir: std::env::var("PARLAMENTO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
            fetch_timeout: Duration::from_secs(
                env_parse("PARLAMENTO_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS),
            ),
            fetch_retries: env_parse("PARLAMENTO_FETCH_RETRIES", DEFAULT_FETCH_RETRIES),
            fetch_retry_delay: Duration::from_secs(env_parse(
                "PARLAMENTO_FETCH_RETRY_DELAY_SECS",
                DEFAULT_FETCH_RETRY_DELAY_SECS,
            )),
            fetch_concurrency: env_parse(
                "PARLAMENTO_FETCH_CONCURRENCY",
                DEFAULT_FETCH_CONCURRENCY,
            ),
            parquet_row_group_size: env_parse(
                "PARLAMENTO_PARQUET_ROW_GROUP_SIZE",
                DEFAULT_PARQUET_ROW_GROUP_SIZE,
            ),
        };

        Ok(config)
    }

    /// Replace the source base URL, rebuilding every legislature's URL
    /// template. Used by the `--base-url` CLI override.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.legislatures = Self::default_legislatures(base_url);
        self
    }

    /// Replace the data tier root. Used by the `--data-dir` CLI override.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Raw tier directory (unmodified fetched JSON).
    pub fn bronze_dir(&self) -> PathBuf {
        self.data_dir.join("bronze")
    }

    /// Normalized tier directory (columnar artifacts).
    pub fn silver_dir(&self) -> PathBuf {
        self.data_dir.join("silver")
    }

    /// Look up a legislature by code.
    pub fn legislature(&self, code: &str) -> Option<&LegislatureConfig> {
        self.legislatures.iter().find(|l| l.code == code)
    }

    /// All configured legislature codes, newest first.
    pub fn legislature_codes(&self) -> Vec<&str> {
        self.legislatures.iter().map(|l| l.code.as_str()).collect()
    }

    /// The last three legislatures. Codes and start dates follow the
    /// upstream numbering; each entity type is published as one JSON array
    /// per legislature under the same path scheme.
    fn default_legislatures(base_url: &str) -> Vec<LegislatureConfig> {
        let base = base_url.trim_end_matches('/');
        let template = |code: &str| format!("{}/{}/{{entity}}.json", base, code.to_lowercase());

        vec![
            LegislatureConfig {
                code: "L17".to_string(),
                name: "XVII Legislatura".to_string(),
                start_date: NaiveDate::from_ymd_opt(2025, 6, 3).expect("valid date"),
                url_template: template("L17"),
            },
            LegislatureConfig {
                code: "L16".to_string(),
                name: "XVI Legislatura".to_string(),
                start_date: NaiveDate::from_ymd_opt(2022, 3, 29).expect("valid date"),
                url_template: template("L16"),
            },
            LegislatureConfig {
                code: "L15".to_string(),
                name: "XV Legislatura".to_string(),
                start_date: NaiveDate::from_ymd_opt(2019, 10, 25).expect("valid date"),
                url_template: template("L15"),
            },
        ]
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Test helper: a config pointing at a throwaway data dir with fast retries.
#[doc(hidden)]
pub fn test_config(base_url: &str, data_dir: &Path) -> EtlConfig {
    EtlConfig {
        legislatures: EtlConfig::default_legislatures(base_url),
        data_dir: data_dir.to_path_buf(),
        fetch_timeout: Duration::from_secs(5),
        fetch_retries: 3,
        fetch_retry_delay: Duration::from_millis(10),
        fetch_concurrency: 4,
        parquet_row_group_size: DEFAULT_PARQUET_ROW_GROUP_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_legislatures() {
        let config = test_config(DEFAULT_BASE_URL, Path::new("./data"));
        assert_eq!(config.legislature_codes(), vec!["L17", "L16", "L15"]);

        let l16 = config.legislature("L16").unwrap();
        assert_eq!(l16.name, "XVI Legislatura");
        assert_eq!(l16.start_date, NaiveDate::from_ymd_opt(2022, 3, 29).unwrap());
    }

    #[test]
    fn test_entity_url_substitution() {
        let config = test_config("http://localhost:9999", Path::new("./data"));
        let l17 = config.legislature("L17").unwrap();
        assert_eq!(
            l17.entity_url(EntityType::Votacoes),
            "http://localhost:9999/l17/votacoes.json"
        );
    }

    #[test]
    fn test_unknown_legislature_lookup() {
        let config = test_config(DEFAULT_BASE_URL, Path::new("./data"));
        assert!(config.legislature("L03").is_none());
    }

    #[test]
    fn test_with_base_url_rebuilds_templates() {
        let config = test_config(DEFAULT_BASE_URL, Path::new("./data"))
            .with_base_url("http://127.0.0.1:8080/");
        let l15 = config.legislature("L15").unwrap();
        assert_eq!(
            l15.entity_url(EntityType::Circulos),
            "http://127.0.0.1:8080/l15/circulos.json"
        );
    }

    #[test]
    fn test_tier_dirs() {
        let config = test_config(DEFAULT_BASE_URL, Path::new("/tmp/parl"));
        assert_eq!(config.bronze_dir(), PathBuf::from("/tmp/parl/bronze"));
        assert_eq!(config.silver_dir(), PathBuf::from("/tmp/parl/silver"));
    }
}
