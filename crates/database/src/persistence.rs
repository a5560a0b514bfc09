//! Versioned JSON snapshots of the record table.
//!
//! Vectors are stored as base64 of their little-endian `f32` bytes so a
//! reloaded index is bit-identical to the saved one. Writes go to a sibling
//! temp file that is renamed over the target once written, so readers never
//! see a half-written snapshot. The data is not fsynced.

use crate::error::{DatabaseError, Result};
use crate::metrics::MetricsSnapshot;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rag_vector_store::vector::{decode_vector, encode_vector};
use rag_vector_store::{DocumentMetadata, LshConfig, Record, RecordId, VectorStoreError};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// File name used when `save`/`load` is given a directory
pub const SNAPSHOT_FILE_NAME: &str = "ragdb.snapshot.json";

/// Hashing parameters a snapshot was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedLsh {
    pub bands: usize,
    pub bits_per_band: usize,
    pub max_candidates: usize,
    pub seed: u64,
}

impl From<&LshConfig> for PersistedLsh {
    fn from(config: &LshConfig) -> Self {
        Self {
            bands: config.bands,
            bits_per_band: config.bits_per_band,
            max_candidates: config.max_candidates,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: RecordId,
    pub external_id: String,
    pub parent_external_id: String,
    pub chunk_index: usize,
    pub text: String,
    /// base64 of little-endian `f32` components
    pub vector: String,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub tombstoned: bool,
}

impl PersistedRecord {
    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id,
            external_id: record.external_id.clone(),
            parent_external_id: record.parent_external_id.clone(),
            chunk_index: record.chunk_index,
            text: record.text.clone(),
            vector: STANDARD.encode(encode_vector(&record.vector)),
            metadata: record.metadata.clone(),
            tombstoned: record.tombstoned,
        }
    }

    fn into_record(self, dimension: usize) -> Result<Record> {
        let bytes = STANDARD.decode(self.vector.as_bytes()).map_err(|err| {
            VectorStoreError::CorruptRecords(format!("record {}: bad vector encoding: {err}", self.id))
        })?;
        let vector = decode_vector(&bytes, dimension).ok_or_else(|| {
            VectorStoreError::CorruptRecords(format!(
                "record {}: vector holds {} bytes, expected {}",
                self.id,
                bytes.len(),
                dimension * 4
            ))
        })?;
        Ok(Record {
            id: self.id,
            external_id: self.external_id,
            parent_external_id: self.parent_external_id,
            chunk_index: self.chunk_index,
            text: self.text,
            vector,
            metadata: self.metadata,
            tombstoned: self.tombstoned,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotHeader {
    format_version: u32,
}

/// Everything needed to rebuild a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub dimension: usize,
    pub lsh: PersistedLsh,
    pub metrics: MetricsSnapshot,
    pub records: Vec<PersistedRecord>,
}

impl Snapshot {
    pub fn capture<'a>(
        dimension: usize,
        lsh: &LshConfig,
        records: impl IntoIterator<Item = &'a Record>,
        metrics: MetricsSnapshot,
    ) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            dimension,
            lsh: PersistedLsh::from(lsh),
            metrics,
            records: records.into_iter().map(PersistedRecord::from_record).collect(),
        }
    }

    /// Reject snapshots built for another dimension or hashing setup.
    ///
    /// `max_candidates` is a query-time bound and may differ.
    pub fn check_compatible(&self, dimension: usize, lsh: &LshConfig) -> Result<()> {
        if self.dimension != dimension {
            return Err(DatabaseError::DimensionMismatch {
                expected: dimension,
                actual: self.dimension,
            });
        }
        let live = PersistedLsh::from(lsh);
        if self.lsh.bands != live.bands
            || self.lsh.bits_per_band != live.bits_per_band
            || self.lsh.seed != live.seed
        {
            return Err(DatabaseError::config_mismatch(format!(
                "snapshot LSH (bands {}, bits {}, seed {}) differs from live (bands {}, bits {}, seed {})",
                self.lsh.bands,
                self.lsh.bits_per_band,
                self.lsh.seed,
                live.bands,
                live.bits_per_band,
                live.seed
            )));
        }
        Ok(())
    }

    /// Decode every record, in id order.
    pub fn into_records(self) -> Result<(Vec<Record>, MetricsSnapshot)> {
        let dimension = self.dimension;
        let records = self
            .records
            .into_iter()
            .map(|record| record.into_record(dimension))
            .collect::<Result<Vec<_>>>()?;
        Ok((records, self.metrics))
    }
}

/// A directory resolves to `<dir>/ragdb.snapshot.json`; anything else is used as-is.
pub async fn resolve_snapshot_path(path: &Path) -> PathBuf {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => path.join(SNAPSHOT_FILE_NAME),
        _ => path.to_path_buf(),
    }
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("snapshot path {} has no file name", path.display()),
        )
    })?;
    let mut tmp_name = OsString::from(file_name);
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

/// Atomically replace `path` with `snapshot`.
pub async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = serde_json::to_vec(snapshot)?;
    let tmp = temp_path_for(path)?;
    let written = async {
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(err) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove temp snapshot {}: {cleanup}", tmp.display());
            }
        }
        return Err(err.into());
    }
    Ok(())
}

/// Read and version-check a snapshot. Compatibility with the live database is
/// checked separately by [`Snapshot::check_compatible`].
pub async fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let bytes = tokio::fs::read(path).await?;
    parse_snapshot(&bytes)
}

pub fn parse_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    let header: SnapshotHeader = serde_json::from_slice(bytes)?;
    if header.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(DatabaseError::FormatVersionMismatch {
            found: header.format_version,
            expected: SNAPSHOT_FORMAT_VERSION,
        });
    }
    Ok(serde_json::from_slice(bytes)?)
}
