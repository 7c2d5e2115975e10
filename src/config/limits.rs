//! Input size limits.
//!
//! Logs are read fully into memory before scanning, so anything above the
//! configured size is rejected up front.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default maximum log size (64MB)
pub const DEFAULT_MAX_LOG_BYTES: u64 = 64 * 1024 * 1024;

fn default_max_log_bytes() -> u64 {
    DEFAULT_MAX_LOG_BYTES
}

/// Limits applied to input before extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLimits {
    /// Maximum log size in bytes (default: 64MB)
    #[serde(default = "default_max_log_bytes")]
    pub max_log_bytes: u64,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_log_bytes: default_max_log_bytes(),
        }
    }
}

impl InputLimits {
    /// Reject input larger than `max_log_bytes`
    pub fn validate_input(&self, input: &str) -> Result<(), InputError> {
        self.validate_len(input.len() as u64)
    }

    /// Same check from a byte count, e.g. file metadata
    pub fn validate_len(&self, size: u64) -> Result<(), InputError> {
        if size > self.max_log_bytes {
            return Err(InputError::TooLarge {
                actual: size,
                limit: self.max_log_bytes,
            });
        }
        Ok(())
    }
}

/// Input rejected before scanning
#[derive(Debug, Clone, Error)]
pub enum InputError {
    #[error("Maximum log bytes exceeded: {actual} > {limit}")]
    TooLarge { actual: u64, limit: u64 },
}
