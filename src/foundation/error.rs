use std::path::{Path, PathBuf};

/// Crate-wide result alias.
pub type AnimstreamResult<T> = Result<T, AnimstreamError>;

/// Error taxonomy for the frame pipeline.
///
/// Per-frame and per-artifact failures (`DecodeMiss`, `CacheInvalid`, `CorruptCache`) are absorbed
/// by the component that hits them. Only I/O on the working directory and whole-source decode
/// failures abort a job.
#[derive(thiserror::Error, Debug)]
pub enum AnimstreamError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("io error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache: {0}")]
    CorruptCache(String),

    #[error("cache invalid: {0}")]
    CacheInvalid(String),

    #[error("frame {index} decode miss: {reason}")]
    DecodeMiss { index: usize, reason: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("config parse error: {0}")]
    ConfigParse(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error("extraction job failed: {0}")]
    JobFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnimstreamError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn corrupt_cache(msg: impl Into<String>) -> Self {
        Self::CorruptCache(msg.into())
    }

    pub fn cache_invalid(msg: impl Into<String>) -> Self {
        Self::CacheInvalid(msg.into())
    }

    pub fn decode_miss(index: usize, reason: impl Into<String>) -> Self {
        Self::DecodeMiss {
            index,
            reason: reason.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn config_parse(msg: impl Into<String>) -> Self {
        Self::ConfigParse(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// `true` for failures that only affect one frame or one cache artifact.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DecodeMiss { .. } | Self::CacheInvalid(_) | Self::CorruptCache(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
