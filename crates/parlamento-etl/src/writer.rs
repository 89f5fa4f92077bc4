//! Columnar artifact production
//!
//! Serializes a normalized record stream into one ZSTD-compressed Parquet
//! file per partition. Records are decoded in row-group-sized batches
//! through arrow's JSON decoder, so nested sub-structures land as
//! List/Struct columns rather than strings. The file is staged under a
//! temporary name and renamed into place only on success: readers never
//! observe a truncated artifact, and a failure leaves any previous artifact
//! untouched.

use crate::error::WriteError;
use crate::records::NormalizedRecord;
use crate::schema;
use arrow::datatypes::{DataType, Field, Fields, Schema, SchemaRef};
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ReaderBuilder;
use parlamento_common::{EntityType, Partition};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Result of a successful partition write.
#[derive(Debug, Clone)]
pub struct WriteSummary {
    /// Canonical artifact path
    pub path: PathBuf,
    /// Rows written
    pub records: usize,
    /// Artifact size in bytes
    pub bytes: u64,
}

/// Writes normalized record streams to partitioned Parquet artifacts.
#[derive(Debug, Clone)]
pub struct ColumnarWriter {
    silver_dir: PathBuf,
    row_group_size: usize,
}

impl ColumnarWriter {
    pub fn new(silver_dir: impl Into<PathBuf>, row_group_size: usize) -> Self {
        Self {
            silver_dir: silver_dir.into(),
            row_group_size: row_group_size.max(1),
        }
    }

    /// Serialize the record stream to the partition's canonical path,
    /// atomically. Overwriting an existing artifact is the steady-state
    /// operation.
    pub fn write(
        &self,
        partition: &Partition,
        records: impl Iterator<Item = NormalizedRecord>,
    ) -> Result<WriteSummary, WriteError> {
        std::fs::create_dir_all(&self.silver_dir)?;
        let final_path = self
            .silver_dir
            .join(format!("{}.parquet", partition.file_stem()));
        let temp_path = self
            .silver_dir
            .join(format!("{}.parquet.tmp", partition.file_stem()));

        match self.write_to(&temp_path, partition.entity, records) {
            Ok(rows) => {
                std::fs::rename(&temp_path, &final_path)?;
                let bytes = std::fs::metadata(&final_path)?.len();
                Ok(WriteSummary {
                    path: final_path,
                    records: rows,
                    bytes,
                })
            }
            Err(err) => {
                let _ = std::fs::remove_file(&temp_path);
                Err(err)
            }
        }
    }

    fn write_to(
        &self,
        temp_path: &Path,
        entity: EntityType,
        mut records: impl Iterator<Item = NormalizedRecord>,
    ) -> Result<usize, WriteError> {
        let mut batch = Vec::new();
        fill_batch(&mut batch, &mut records, self.row_group_size)?;

        let schema: SchemaRef = if batch.is_empty() {
            Arc::new(empty_schema(entity))
        } else {
            let inferred =
                infer_json_schema_from_iterator(batch.iter().map(Ok::<&Value, _>))?;
            Arc::new(relax_null_columns(&inferred))
        };
        debug!(entity = %entity, columns = schema.fields().len(), "inferred artifact schema");

        let file = File::create(temp_path)?;
        let props = writer_properties(self.row_group_size);
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let mut total = 0usize;
        while !batch.is_empty() {
            let mut decoder = ReaderBuilder::new(schema.clone())
                .with_coerce_primitive(true)
                .build_decoder()?;
            decoder.serialize(&batch)?;
            if let Some(record_batch) = decoder.flush()? {
                total += record_batch.num_rows();
                writer.write(&record_batch)?;
            }
            batch.clear();
            fill_batch(&mut batch, &mut records, self.row_group_size)?;
        }

        writer.close()?;
        Ok(total)
    }
}

fn fill_batch(
    batch: &mut Vec<Value>,
    records: &mut impl Iterator<Item = NormalizedRecord>,
    size: usize,
) -> Result<(), WriteError> {
    for record in records.by_ref() {
        batch.push(record.to_value()?);
        if batch.len() >= size {
            break;
        }
    }
    Ok(())
}

fn writer_properties(row_group_size: usize) -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some("parlamento-etl".to_string()),
    };
    WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .set_max_row_group_size(row_group_size)
        .set_key_value_metadata(Some(vec![created_by]))
        .build()
}

/// Schema for an empty partition: the entity's full output field set as
/// nullable strings, so the artifact is still valid and enumerable.
fn empty_schema(entity: EntityType) -> Schema {
    Schema::new(
        schema::output_fields(entity)
            .into_iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}

/// Columns that were null in every inferred record come out as the Null
/// type, which Parquet cannot store; relax them to nullable strings.
fn relax_null_columns(schema: &Schema) -> Schema {
    Schema::new(
        schema
            .fields()
            .iter()
            .map(|f| relax_field(f))
            .collect::<Vec<_>>(),
    )
}

fn relax_field(field: &Field) -> Field {
    match field.data_type() {
        DataType::Null => Field::new(field.name(), DataType::Utf8, true),
        DataType::List(inner) => Field::new(
            field.name(),
            DataType::List(Arc::new(relax_field(inner))),
            field.is_nullable(),
        ),
        DataType::Struct(children) => Field::new(
            field.name(),
            DataType::Struct(Fields::from(
                children
                    .iter()
                    .map(|c| relax_field(c))
                    .collect::<Vec<_>>(),
            )),
            field.is_nullable(),
        ),
        _ => field.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Partido;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    fn partido(sigla: &str, nome: Option<&str>) -> NormalizedRecord {
        NormalizedRecord::Partido(Box::new(Partido {
            gp_sigla: Value::String(sigla.to_string()),
            gp_nome: nome.map(|n| Value::String(n.to_string())).unwrap_or(Value::Null),
            legislatura: "L17".to_string(),
            etl_timestamp: "2025-08-01T12:00:00Z".to_string(),
            extras: None,
        }))
    }

    fn partition() -> Partition {
        Partition::new("L17", EntityType::Partidos)
    }

    fn read_rows(path: &Path) -> (usize, Vec<String>) {
        let file = File::open(path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
        let rows = batches.iter().map(|b| b.num_rows()).sum();
        let columns = batches
            .first()
            .map(|b| {
                b.schema()
                    .fields()
                    .iter()
                    .map(|f| f.name().clone())
                    .collect()
            })
            .unwrap_or_default();
        (rows, columns)
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let writer = ColumnarWriter::new(dir.path(), 100);
        let records = vec![
            partido("PS", Some("Partido Socialista")),
            partido("PSD", Some("Partido Social Democrata")),
            partido("BE", None),
        ];

        let summary = writer.write(&partition(), records.into_iter()).unwrap();
        assert_eq!(summary.records, 3);
        assert!(summary.bytes > 0);
        assert!(summary.path.ends_with("partidos_l17.parquet"));

        let (rows, columns) = read_rows(&summary.path);
        assert_eq!(rows, 3);
        for column in &columns {
            assert!(
                schema::output_fields(EntityType::Partidos).contains(&column.as_str()),
                "unexpected column {column}"
            );
        }
        assert!(columns.iter().any(|c| c == "gp_sigla"));
        assert!(columns.iter().any(|c| c == "etl_timestamp"));
    }

    #[test]
    fn test_multiple_row_groups() {
        let dir = tempdir().unwrap();
        let writer = ColumnarWriter::new(dir.path(), 2);
        let records = (0..5).map(|i| partido(&format!("P{i}"), None));
        let summary = writer.write(&partition(), records).unwrap();
        assert_eq!(summary.records, 5);
        let (rows, _) = read_rows(&summary.path);
        assert_eq!(rows, 5);
    }

    #[test]
    fn test_empty_partition_still_produces_artifact() {
        let dir = tempdir().unwrap();
        let writer = ColumnarWriter::new(dir.path(), 100);
        let summary = writer.write(&partition(), std::iter::empty()).unwrap();
        assert_eq!(summary.records, 0);
        assert!(summary.path.exists());

        let (rows, _) = read_rows(&summary.path);
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_overwrite_is_deterministic() {
        // Same input and timestamp, byte-identical artifact.
        let dir = tempdir().unwrap();
        let writer = ColumnarWriter::new(dir.path(), 100);
        let records = || vec![partido("PS", None), partido("PCP", None)].into_iter();

        let first = writer.write(&partition(), records()).unwrap();
        let bytes_first = std::fs::read(&first.path).unwrap();
        let second = writer.write(&partition(), records()).unwrap();
        let bytes_second = std::fs::read(&second.path).unwrap();
        assert_eq!(bytes_first, bytes_second);
    }

    #[test]
    fn test_failed_write_preserves_previous_artifact() {
        let dir = tempdir().unwrap();
        // Row group of 1 so the schema is inferred from the first record
        // only; the conflicting record arrives in a later batch.
        let writer = ColumnarWriter::new(dir.path(), 1);

        let good = writer
            .write(&partition(), vec![partido("PS", None)].into_iter())
            .unwrap();
        let good_bytes = std::fs::read(&good.path).unwrap();

        // Second run: a record whose gp_nome is an object clashes with the
        // Utf8 column inferred from the first record.
        let conflicting = vec![
            partido("PS", Some("Partido Socialista")),
            NormalizedRecord::Partido(Box::new(Partido {
                gp_sigla: Value::String("XX".to_string()),
                gp_nome: serde_json::json!({"unexpected": "shape"}),
                legislatura: "L17".to_string(),
                etl_timestamp: "2025-08-01T12:00:00Z".to_string(),
                extras: None,
            })),
        ];
        let result = writer.write(&partition(), conflicting.into_iter());
        assert!(result.is_err());

        // No temp file left behind, previous artifact intact.
        assert!(!dir.path().join("partidos_l17.parquet.tmp").exists());
        assert_eq!(std::fs::read(&good.path).unwrap(), good_bytes);
    }
}
