//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest budget any operator can run under: one input page per side plus
/// one output page.
pub const MIN_BUFFERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Buffer budget B: pages an operator may hold in memory at once.
    /// Operators must *never* exceed this.
    pub num_buffers: usize,

    /// Fixed page capacity, in records.
    pub records_per_page: usize,

    /// Directory for table/run pages (legacy local-path configuration).
    pub spill_dir: String,

    /// Optional fully-qualified storage URI (`file:///tmp/x` or `memory://`).
    pub spill_uri: Option<String>,

    /// Page codec name: `none`, `zstd` or `lz4`.
    pub page_codec: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_buffers: 32,
            records_per_page: 64,
            spill_dir: "/tmp/emjoin-spill".to_string(),
            spill_uri: None,
            page_codec: "none".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub uri: Option<String>,
    pub root: String,
}

impl StorageConfig {
    pub fn scheme(&self) -> Option<&str> {
        self.uri
            .as_deref()
            .and_then(|uri| uri.split_once("://"))
            .map(|(scheme, _)| scheme.trim())
            .filter(|s| !s.is_empty())
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `EMJOIN_NUM_BUFFERS`: buffer budget B (pages)
    /// - `EMJOIN_RECORDS_PER_PAGE`: page capacity in records
    /// - `EMJOIN_SPILL_DIR`: directory for table pages
    /// - `EMJOIN_SPILL_URI`: storage URI, overrides the directory
    /// - `EMJOIN_PAGE_CODEC`: page codec name
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("EMJOIN_NUM_BUFFERS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.num_buffers = v;
            }
        }

        if let Ok(s) = std::env::var("EMJOIN_RECORDS_PER_PAGE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.records_per_page = v;
            }
        }

        if let Ok(s) = std::env::var("EMJOIN_SPILL_DIR") {
            cfg.spill_dir = s;
        }

        if let Ok(s) = std::env::var("EMJOIN_SPILL_URI") {
            cfg.spill_uri = Some(s);
        }

        if let Ok(s) = std::env::var("EMJOIN_PAGE_CODEC") {
            cfg.page_codec = s;
        }

        cfg
    }

    /// Parse a JSON config document; missing keys take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: EngineConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject budgets and page sizes no operator can run under.
    pub fn validate(&self) -> Result<()> {
        if self.num_buffers < MIN_BUFFERS {
            return Err(Error::Config(format!(
                "num_buffers must be at least {MIN_BUFFERS}, got {}",
                self.num_buffers
            )));
        }
        if self.records_per_page == 0 {
            return Err(Error::Config("records_per_page must be positive".into()));
        }
        Ok(())
    }

    /// Produce a storage configuration snapshot used by the IO layer.
    pub fn storage_config(&self) -> StorageConfig {
        let root = match self.spill_uri.as_deref() {
            Some(uri) if uri.starts_with("file://") => {
                file_uri_to_path(uri).unwrap_or_else(|| self.spill_dir.clone())
            }
            Some(uri) if uri.contains("://") => uri.trim_end_matches('/').to_string(),
            _ => self.spill_dir.clone(),
        };

        StorageConfig {
            uri: self.spill_uri.clone(),
            root,
        }
    }
}

fn file_uri_to_path(uri: &str) -> Option<String> {
    let stripped = uri.strip_prefix("file://")?;
    if stripped.starts_with('/') {
        Some(stripped.to_string())
    } else {
        Some(format!("/{}", stripped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_budget_below_three_pages() {
        let cfg = EngineConfig {
            num_buffers: 2,
            ..EngineConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("at least 3"));
    }

    #[test]
    fn json_fills_missing_keys_with_defaults() {
        let cfg = EngineConfig::from_json_str(r#"{ "num_buffers": 5 }"#).unwrap();
        assert_eq!(cfg.num_buffers, 5);
        assert_eq!(cfg.records_per_page, EngineConfig::default().records_per_page);
    }

    #[test]
    fn file_uri_becomes_root_path() {
        let cfg = EngineConfig {
            spill_uri: Some("file://tmp/pages".into()),
            ..EngineConfig::default()
        };
        let storage = cfg.storage_config();
        assert_eq!(storage.scheme(), Some("file"));
        assert_eq!(storage.root, "/tmp/pages");
    }

    #[test]
    fn bare_dir_has_no_scheme() {
        let storage = EngineConfig::default().storage_config();
        assert_eq!(storage.scheme(), None);
        assert_eq!(storage.root, "/tmp/emjoin-spill");
    }
}
