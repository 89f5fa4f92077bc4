//! Run orchestration
//!
//! Fans the requested legislatures and entity types out into independent
//! (legislature, entity type) partitions and drives fetch -> transform ->
//! write for each. Fetches run concurrently up to a bounded limit; transform
//! and write happen on the blocking pool once a partition's document is in.
//! A failed partition is recorded and skipped; it never aborts the run.

use crate::config::EtlConfig;
use crate::error::{PartitionError, TransformError};
use crate::fetch::Fetcher;
use crate::transform::{RecordTransformer, TransformContext};
use crate::writer::{ColumnarWriter, WriteSummary};
use chrono::{SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use parlamento_common::{EntityType, Partition};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What to process: which sessions, which entity types, and whether to
/// refresh the raw tier.
#[derive(Debug, Clone)]
pub struct RunSelection {
    /// Legislature codes, `None` for all configured
    pub legislatures: Option<Vec<String>>,
    /// Entity types to process (opt-outs already removed)
    pub entities: Vec<EntityType>,
    /// Re-download raw documents even when cached
    pub force: bool,
}

impl Default for RunSelection {
    fn default() -> Self {
        Self {
            legislatures: None,
            entities: EntityType::ALL.to_vec(),
            force: false,
        }
    }
}

/// Outcome of one partition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionStatus {
    /// Columnar artifact produced
    Success {
        records: usize,
        rejected: usize,
        path: PathBuf,
    },
    /// Raw document retrieved (fetch-only mode)
    Fetched { bytes: usize, path: PathBuf },
    /// Partition failed and was skipped; the rest of the run continued
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionOutcome {
    pub partition: Partition,
    #[serde(flatten)]
    pub status: PartitionStatus,
}

/// Structured end-of-run summary.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<PartitionOutcome>,
}

impl RunReport {
    pub fn total_records(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                PartitionStatus::Success { records, .. } => records,
                _ => 0,
            })
            .sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                PartitionStatus::Success { rejected, .. } => rejected,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_partitions(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, PartitionStatus::Skipped { .. }))
            .count()
    }

    /// True when any partition failed; drives the process exit status.
    pub fn has_failures(&self) -> bool {
        self.failed_partitions() > 0
    }

    fn log_summary(&self) {
        for outcome in &self.outcomes {
            match &outcome.status {
                PartitionStatus::Success {
                    records,
                    rejected,
                    path,
                } => info!(
                    partition = %outcome.partition,
                    records,
                    rejected,
                    path = %path.display(),
                    "partition_success"
                ),
                PartitionStatus::Fetched { bytes, path } => info!(
                    partition = %outcome.partition,
                    bytes,
                    path = %path.display(),
                    "partition_fetched"
                ),
                PartitionStatus::Skipped { reason } => warn!(
                    partition = %outcome.partition,
                    reason = %reason,
                    "partition_skipped"
                ),
            }
        }
        info!(
            partitions = self.outcomes.len(),
            failed = self.failed_partitions(),
            records = self.total_records(),
            rejected = self.total_rejected(),
            "run_complete"
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    /// Fetch raw documents and produce columnar artifacts
    Full,
    /// Raw tier only
    FetchOnly,
    /// Silver tier from existing raw tier, no network
    TransformOnly,
}

/// Drives the whole run.
pub struct Orchestrator {
    config: Arc<EtlConfig>,
    fetcher: Fetcher,
    transformer: RecordTransformer,
}

impl Orchestrator {
    pub fn new(config: EtlConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let fetcher = Fetcher::new(Arc::clone(&config))?;
        Ok(Self {
            config,
            fetcher,
            transformer: RecordTransformer::new(),
        })
    }

    /// Full pipeline: fetch -> transform -> write per partition.
    pub async fn run(&self, selection: &RunSelection) -> anyhow::Result<RunReport> {
        self.execute(selection, Mode::Full).await
    }

    /// Refresh the raw tier only.
    pub async fn fetch_only(&self, selection: &RunSelection) -> anyhow::Result<RunReport> {
        self.execute(selection, Mode::FetchOnly).await
    }

    /// Rebuild columnar artifacts from the existing raw tier.
    pub async fn transform_only(&self, selection: &RunSelection) -> anyhow::Result<RunReport> {
        self.execute(selection, Mode::TransformOnly).await
    }

    async fn execute(&self, selection: &RunSelection, mode: Mode) -> anyhow::Result<RunReport> {
        let partitions = self.partitions(selection)?;
        // Provenance timestamp, taken once for the whole run.
        let etl_timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let force = selection.force;

        info!(
            partitions = partitions.len(),
            concurrency = self.config.fetch_concurrency,
            "run_started"
        );

        let outcomes = stream::iter(partitions)
            .map(|partition| {
                let timestamp = etl_timestamp.clone();
                async move {
                    let result = match mode {
                        Mode::Full => self.full_partition(&partition, &timestamp, force).await,
                        Mode::FetchOnly => self.fetch_partition(&partition, force).await,
                        Mode::TransformOnly => {
                            self.transform_partition(&partition, &timestamp).await
                        }
                    };
                    match result {
                        Ok(status) => PartitionOutcome { partition, status },
                        Err(err) => {
                            error!(partition = %partition, error = %err, "partition_failed");
                            PartitionOutcome {
                                partition,
                                status: PartitionStatus::Skipped {
                                    reason: err.to_string(),
                                },
                            }
                        }
                    }
                }
            })
            .buffer_unordered(self.config.fetch_concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = RunReport { outcomes };
        report.log_summary();
        Ok(report)
    }

    /// Expand the selection into partitions, validating session codes up
    /// front so a typo aborts before any network traffic.
    fn partitions(&self, selection: &RunSelection) -> anyhow::Result<Vec<Partition>> {
        let codes: Vec<String> = match &selection.legislatures {
            Some(requested) => {
                let invalid: Vec<&str> = requested
                    .iter()
                    .filter(|code| self.config.legislature(code).is_none())
                    .map(String::as_str)
                    .collect();
                if !invalid.is_empty() {
                    anyhow::bail!(
                        "unknown legislature(s): {} (available: {})",
                        invalid.join(", "),
                        self.config.legislature_codes().join(", ")
                    );
                }
                requested.clone()
            }
            None => self
                .config
                .legislature_codes()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        Ok(codes
            .iter()
            .flat_map(|code| {
                selection
                    .entities
                    .iter()
                    .map(move |entity| Partition::new(code.clone(), *entity))
            })
            .collect())
    }

    async fn full_partition(
        &self,
        partition: &Partition,
        etl_timestamp: &str,
        force: bool,
    ) -> Result<PartitionStatus, PartitionError> {
        let document = self.fetcher.fetch(partition, force).await?;
        self.transform_document(partition, document.bytes, etl_timestamp)
            .await
    }

    async fn fetch_partition(
        &self,
        partition: &Partition,
        force: bool,
    ) -> Result<PartitionStatus, PartitionError> {
        let document = self.fetcher.fetch(partition, force).await?;
        Ok(PartitionStatus::Fetched {
            bytes: document.bytes.len(),
            path: document.path,
        })
    }

    async fn transform_partition(
        &self,
        partition: &Partition,
        etl_timestamp: &str,
    ) -> Result<PartitionStatus, PartitionError> {
        let path = self
            .config
            .bronze_dir()
            .join(format!("{}.json", partition.file_stem()));
        if !path.exists() {
            return Err(TransformError::MissingRawArtifact(path).into());
        }
        let document = tokio::fs::read(&path)
            .await
            .map_err(TransformError::Io)?;
        self.transform_document(partition, document, etl_timestamp)
            .await
    }

    /// Transform and write on the blocking pool; the decode/encode work is
    /// CPU-bound and must stay off the async reactor.
    async fn transform_document(
        &self,
        partition: &Partition,
        document: Vec<u8>,
        etl_timestamp: &str,
    ) -> Result<PartitionStatus, PartitionError> {
        let transformer = self.transformer.clone();
        let writer = ColumnarWriter::new(
            self.config.silver_dir(),
            self.config.parquet_row_group_size,
        );
        let partition = partition.clone();
        let etl_timestamp = etl_timestamp.to_string();

        let handle = tokio::task::spawn_blocking(
            move || -> Result<(WriteSummary, usize), PartitionError> {
                let ctx = TransformContext::new(partition.legislature.clone(), etl_timestamp);
                let stream = transformer.transform(partition.entity, &document, &ctx)?;

                let mut rejected = 0usize;
                let records = stream.filter_map(|item| match item {
                    Ok(record) => Some(record),
                    Err(err) => {
                        warn!(partition = %partition, error = %err, "record_rejected");
                        rejected += 1;
                        None
                    }
                });

                let summary = writer.write(&partition, records)?;
                Ok((summary, rejected))
            },
        );

        let (summary, rejected) = handle
            .await
            .map_err(|e| PartitionError::Transform(TransformError::Io(std::io::Error::other(e))))??;

        Ok(PartitionStatus::Success {
            records: summary.records,
            rejected,
            path: summary.path,
        })
    }
}
