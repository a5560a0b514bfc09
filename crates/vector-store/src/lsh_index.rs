use crate::error::{Result, VectorStoreError};
use crate::types::RecordId;
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Random-hyperplane LSH parameters.
///
/// More `bands` raise recall and cost; more `bits_per_band` narrow each
/// bucket, trading false positives for recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LshConfig {
    /// Independent hash families; candidates are unioned across bands
    pub bands: usize,

    /// Hyperplanes per band (bucket key width, at most 64)
    pub bits_per_band: usize,

    /// Upper bound on candidates returned for one query
    pub max_candidates: usize,

    /// Seed for hyperplane generation
    pub seed: u64,

    /// Fall back to scanning every indexed record when no bucket matches
    pub full_scan_fallback: bool,

    /// Largest index size for which the full-scan fallback may run
    pub full_scan_limit: usize,
}

impl Default for LshConfig {
    fn default() -> Self {
        Self {
            bands: 12,
            bits_per_band: 8,
            max_candidates: 1024,
            seed: 1337,
            full_scan_fallback: true,
            full_scan_limit: 4096,
        }
    }
}

impl LshConfig {
    #[must_use]
    pub fn new(bands: usize, bits_per_band: usize, max_candidates: usize, seed: u64) -> Self {
        Self {
            bands,
            bits_per_band,
            max_candidates,
            seed,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn without_full_scan(mut self) -> Self {
        self.full_scan_fallback = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.bands == 0 {
            return Err(VectorStoreError::invalid_config("bands must be > 0"));
        }
        if self.bits_per_band == 0 || self.bits_per_band > 64 {
            return Err(VectorStoreError::invalid_config(format!(
                "bits_per_band must be within 1..=64, got {}",
                self.bits_per_band
            )));
        }
        if self.max_candidates == 0 {
            return Err(VectorStoreError::invalid_config(
                "max_candidates must be > 0",
            ));
        }
        Ok(())
    }

    /// Whether two configs hash vectors into the same buckets.
    #[must_use]
    pub const fn same_hashing(&self, other: &Self) -> bool {
        self.bands == other.bands
            && self.bits_per_band == other.bits_per_band
            && self.seed == other.seed
    }
}

/// Candidate ids for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates {
    pub ids: Vec<RecordId>,
    /// Produced by the full-scan fallback rather than bucket lookup
    pub full_scan: bool,
}

/// Banded random-hyperplane index.
///
/// Row `band * bits_per_band + bit` of `hyperplanes` is the normal of one
/// hyperplane; a band's bucket key packs the signs of its rows' projections.
#[derive(Debug, Clone)]
pub struct LshIndex {
    config: LshConfig,
    dimension: usize,
    hyperplanes: Array2<f32>,
    buckets: Vec<HashMap<u64, BTreeSet<RecordId>>>,
    members: BTreeSet<RecordId>,
}

impl LshIndex {
    pub fn new(dimension: usize, config: LshConfig) -> Result<Self> {
        config.validate()?;
        if dimension == 0 {
            return Err(VectorStoreError::invalid_config("dimension must be > 0"));
        }

        let rows = config.bands * config.bits_per_band;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let hyperplanes =
            Array2::from_shape_fn((rows, dimension), |_| rng.sample::<f32, _>(StandardNormal));

        log::debug!(
            "LSH index: {} bands x {} bits over {} dims (seed {})",
            config.bands,
            config.bits_per_band,
            dimension,
            config.seed
        );

        Ok(Self {
            config,
            dimension,
            hyperplanes,
            buckets: vec![HashMap::new(); config.bands],
            members: BTreeSet::new(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &LshConfig {
        &self.config
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: RecordId) -> bool {
        self.members.contains(&id)
    }

    /// Non-empty buckets across all bands
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.iter().map(HashMap::len).sum()
    }

    /// One bucket key per band.
    pub fn signature(&self, vector: &[f32]) -> Result<Vec<u64>> {
        self.check_dimension(vector)?;
        let projections = self.hyperplanes.dot(&ArrayView1::from(vector));
        let bits = self.config.bits_per_band;
        let keys = (0..self.config.bands)
            .map(|band| {
                (0..bits).fold(0u64, |key, bit| {
                    if projections[band * bits + bit] > 0.0 {
                        key | (1u64 << bit)
                    } else {
                        key
                    }
                })
            })
            .collect();
        Ok(keys)
    }

    pub fn insert(&mut self, id: RecordId, vector: &[f32]) -> Result<()> {
        let keys = self.signature(vector)?;
        for (band, key) in keys.into_iter().enumerate() {
            self.buckets[band].entry(key).or_default().insert(id);
        }
        self.members.insert(id);
        Ok(())
    }

    /// Inverse of [`LshIndex::insert`]; `vector` must be the one inserted.
    pub fn remove(&mut self, id: RecordId, vector: &[f32]) -> Result<bool> {
        let keys = self.signature(vector)?;
        for (band, key) in keys.into_iter().enumerate() {
            let buckets = &mut self.buckets[band];
            if let Some(bucket) = buckets.get_mut(&key) {
                bucket.remove(&id);
                if bucket.is_empty() {
                    buckets.remove(&key);
                }
            }
        }
        Ok(self.members.remove(&id))
    }

    pub fn clear(&mut self) {
        for band in &mut self.buckets {
            band.clear();
        }
        self.members.clear();
    }

    /// Ids sharing at least one bucket with `query`.
    ///
    /// Ids matching in more bands come first (ties by lower id), and at most
    /// `max_candidates` are returned. When nothing matches and the fallback
    /// is enabled for an index of at most `full_scan_limit` records, every
    /// indexed id is returned instead.
    pub fn candidates(&self, query: &[f32], max_candidates: usize) -> Result<Candidates> {
        let keys = self.signature(query)?;

        let mut agreement: HashMap<RecordId, u32> = HashMap::new();
        for (band, key) in keys.iter().enumerate() {
            if let Some(bucket) = self.buckets[band].get(key) {
                for id in bucket {
                    *agreement.entry(*id).or_insert(0) += 1;
                }
            }
        }

        if agreement.is_empty() {
            return Ok(self.full_scan());
        }

        let mut ranked: Vec<(RecordId, u32)> = agreement.into_iter().collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_candidates);

        Ok(Candidates {
            ids: ranked.into_iter().map(|(id, _)| id).collect(),
            full_scan: false,
        })
    }

    fn full_scan(&self) -> Candidates {
        if !self.config.full_scan_fallback || self.members.is_empty() {
            return Candidates::default();
        }
        if self.members.len() > self.config.full_scan_limit {
            log::warn!(
                "No LSH bucket matched and {} records exceed the full-scan limit of {}",
                self.members.len(),
                self.config.full_scan_limit
            );
            return Candidates::default();
        }
        log::debug!("No LSH bucket matched; scanning {} records", self.members.len());
        Candidates {
            ids: self.members.iter().copied().collect(),
            full_scan: true,
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
