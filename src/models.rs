use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::validation::ValidationError;

/// One group as submitted by the caller, before validation.
///
/// Blank strings are treated the same as missing fields, since browser forms
/// send `""` for untouched inputs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupRequest {
    #[serde(default, deserialize_with = "non_blank")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "non_blank")]
    pub end_time: Option<String>,
}

fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// A group whose URL, dates and times have all been checked and parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedGroup {
    pub url: String,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
}

impl ValidatedGroup {
    /// Start of the collection window; a missing time means midnight.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.start_date
            .map(|date| date.and_time(self.start_time.unwrap_or_else(start_of_day)))
    }

    /// End of the collection window; a missing time means the last second of the day.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end_date
            .map(|date| date.and_time(self.end_time.unwrap_or_else(end_of_day)))
    }
}

pub fn start_of_day() -> NaiveTime {
    NaiveTime::MIN
}

pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).expect("23:59:59 is a valid time of day")
}

/// One entry of the body sent to the Brightdata trigger endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerGroup {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Snapshot states the upstream lets us filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus {
    Ready,
    Running,
    Failed,
}

impl SnapshotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotStatus::Ready => "ready",
            SnapshotStatus::Running => "running",
            SnapshotStatus::Failed => "failed",
        }
    }
}

impl FromStr for SnapshotStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(SnapshotStatus::Ready),
            "running" => Ok(SnapshotStatus::Running),
            "failed" => Ok(SnapshotStatus::Failed),
            _ => Err(ValidationError::InvalidStatus),
        }
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct TriggerQuery {
    #[serde(rename = "datasetId")]
    pub dataset_id: Option<String>,
    // Webhook URL the upstream calls when the snapshot finishes
    pub notify: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotsQuery {
    #[serde(rename = "datasetId")]
    pub dataset_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub format: Option<String>,
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
