use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::extract::ExtractOpts;
use crate::foundation::error::{AnimstreamError, AnimstreamResult};
use crate::preload::PreloadOpts;

/// Session-wide pipeline configuration.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "verify_disk_cache": true, "extract": { "batch_size": 50 } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Working directory for artifacts. `None` uses the per-process temp directory.
    pub work_dir: Option<PathBuf>,
    /// Check sidecar digests, not only their presence, before trusting cache blobs.
    pub verify_disk_cache: bool,
    pub extract: ExtractOpts,
    pub preload: PreloadOpts,
}

impl PipelineConfig {
    pub fn from_reader<R: std::io::Read>(r: R) -> AnimstreamResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| AnimstreamError::config_parse(format!("parse pipeline config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> AnimstreamResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    pub fn from_path(path: impl AsRef<Path>) -> AnimstreamResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| AnimstreamError::io(path, e))?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn to_json_pretty(&self) -> AnimstreamResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AnimstreamError::serde(format!("serialize pipeline config: {e}")))
    }

    pub fn validate(&self) -> AnimstreamResult<()> {
        self.extract.validate()?;
        self.preload.validate()
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
