use crate::error::{DatabaseError, Result};
use rag_chunker::ChunkingOptions;
use rag_vector_store::LshConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime knobs of a [`crate::Database`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Record slots reserved up front
    pub initial_capacity: usize,

    /// Cached queries kept (0 disables the cache)
    pub query_cache_capacity: usize,

    /// Rescale stored vectors to unit length
    pub normalize_vectors_on_add: bool,

    /// Rescale query vectors to unit length before lookup
    pub normalize_query_on_search: bool,

    /// Chunking used by `upsert_text_document`
    pub default_chunking: ChunkingOptions,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            query_cache_capacity: 256,
            normalize_vectors_on_add: true,
            normalize_query_on_search: true,
            default_chunking: ChunkingOptions::default(),
        }
    }
}

impl DatabaseOptions {
    #[must_use]
    pub const fn with_query_cache_capacity(mut self, capacity: usize) -> Self {
        self.query_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_default_chunking(mut self, chunking: ChunkingOptions) -> Self {
        self.default_chunking = chunking;
        self
    }
}

/// Construction-time configuration. Never mutated once a database exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Vector length shared by every record and query
    pub dimension: usize,

    #[serde(default)]
    pub lsh: LshConfig,

    #[serde(default)]
    pub options: DatabaseOptions,
}

impl DatabaseConfig {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            lsh: LshConfig::default(),
            options: DatabaseOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_lsh(mut self, lsh: LshConfig) -> Self {
        self.lsh = lsh;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: DatabaseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(DatabaseError::invalid_config("dimension must be > 0"));
        }
        self.lsh.validate()?;
        self.options.default_chunking.validate()?;
        Ok(())
    }

    /// Load a JSON or TOML config file and validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes).map_err(|err| match err {
            DatabaseError::ConfigParse(message) => {
                DatabaseError::ConfigParse(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Parse JSON, falling back to TOML, then validate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(json_err) => {
                let utf8 = std::str::from_utf8(bytes)
                    .map_err(|err| DatabaseError::ConfigParse(format!("{json_err}; {err}")))?;
                let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                    DatabaseError::ConfigParse(format!(
                        "not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                    ))
                })?;
                serde_json::to_value(toml_value).map_err(|err| {
                    DatabaseError::ConfigParse(format!("failed to convert TOML config: {err}"))
                })?
            }
        };

        let config: Self = serde_json::from_value(value)
            .map_err(|err| DatabaseError::ConfigParse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
