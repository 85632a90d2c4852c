//! Log record model

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single structured log record. `id` and `real_time` are assigned by the
/// store at insert time; records are immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default)]
    pub id: u64,

    /// Logical timestamp supplied by the client
    #[serde(default)]
    pub log_time: Option<DateTime<Utc>>,

    /// Server receipt timestamp
    #[serde(default)]
    pub real_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub level: u32,

    #[serde(default)]
    pub message1: String,

    #[serde(default)]
    pub message2: String,

    #[serde(default)]
    pub message3: String,
}

impl LogRecord {
    pub fn validate(&self) -> Result<()> {
        if self.log_time.is_none() {
            return Err(Error::Validation("logTime is required".into()));
        }
        if self.level == 0 {
            return Err(Error::Validation("level is required".into()));
        }
        if self.message1.is_empty() {
            return Err(Error::Validation("message1 is required".into()));
        }

        Ok(())
    }
}
