use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Source format of an import. The snake_case strings are what the API
/// accepts and what the `imports.source` column stores.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImportSource {
    GoogleSemanticHistory,
    GooglePhoneTakeout,
    GoogleRecords,
    Owntracks,
    Gpx,
    Geojson,
    ImmichApi,
    PhotoprismApi,
}

/// Lifecycle of an import. Stored as SMALLINT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Created = 0,
    Processing = 1,
    Completed = 2,
    Failed = 3,
}

impl ImportStatus {
    pub fn from_i16(value: i16) -> Self {
        match value {
            1 => ImportStatus::Processing,
            2 => ImportStatus::Completed,
            3 => ImportStatus::Failed,
            _ => ImportStatus::Created,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Import {
    pub id: Uuid,
    pub user_id: i64,
    pub source: String, // one of the ImportSource strings
    pub name: String,
    pub raw_data: String, // original upload, kept verbatim for replay
    pub status: i16,
    pub points_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Import {
    pub fn source_kind(&self) -> anyhow::Result<ImportSource> {
        ImportSource::from_str(&self.source)
            .map_err(|_| anyhow!("unknown import source: {}", self.source))
    }

    pub fn status_kind(&self) -> ImportStatus {
        ImportStatus::from_i16(self.status)
    }
}
