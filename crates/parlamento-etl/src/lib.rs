//! ParlamentoDB ETL Library
//!
//! Ingests the irregularly-shaped JSON published by the Portuguese
//! Parliament and converts it into compact, schema-normalized Parquet
//! artifacts, partitioned by legislature and entity type.
//!
//! Data flows Fetcher -> SchemaNormalizer -> RecordTransformer ->
//! ColumnarWriter, orchestrated per (legislature, entity type) partition;
//! partitions are independent and processed concurrently up to a bounded
//! limit.
//!
//! # Example
//!
//! ```no_run
//! use parlamento_etl::config::EtlConfig;
//! use parlamento_etl::orchestrator::{Orchestrator, RunSelection};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EtlConfig::load()?;
//!     let orchestrator = Orchestrator::new(config)?;
//!     let report = orchestrator.run(&RunSelection::default()).await?;
//!     std::process::exit(if report.has_failures() { 1 } else { 0 });
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod orchestrator;
pub mod records;
pub mod schema;
pub mod transform;
pub mod votes;
pub mod writer;

pub use orchestrator::{Orchestrator, RunReport, RunSelection};
