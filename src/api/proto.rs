//! Protobuf wire messages for log record listings
//!
//! Hand-written `prost` messages; the field layout mirrors the JSON shape,
//! with timestamps carried as the well-known seconds/nanos pair.

use chrono::{DateTime, Utc};

use crate::model;

#[derive(Clone, PartialEq, prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogRecord {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(message, optional, tag = "2")]
    pub log_time: Option<Timestamp>,
    #[prost(message, optional, tag = "3")]
    pub real_time: Option<Timestamp>,
    #[prost(uint32, tag = "4")]
    pub level: u32,
    #[prost(string, tag = "5")]
    pub message1: String,
    #[prost(string, tag = "6")]
    pub message2: String,
    #[prost(string, tag = "7")]
    pub message3: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogRecords {
    #[prost(message, repeated, tag = "1")]
    pub records: Vec<LogRecord>,
    #[prost(bool, tag = "2")]
    pub limited: bool,
}

fn timestamp(time: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: time.timestamp(),
        nanos: time.timestamp_subsec_nanos() as i32,
    }
}

impl From<&model::LogRecord> for LogRecord {
    fn from(record: &model::LogRecord) -> Self {
        Self {
            id: record.id,
            log_time: record.log_time.map(timestamp),
            real_time: record.real_time.map(timestamp),
            level: record.level,
            message1: record.message1.clone(),
            message2: record.message2.clone(),
            message3: record.message3.clone(),
        }
    }
}

impl LogRecords {
    pub fn from_records(records: &[model::LogRecord], limited: bool) -> Self {
        Self {
            records: records.iter().map(LogRecord::from).collect(),
            limited,
        }
    }
}
