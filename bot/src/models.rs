use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::statistics::rebuild_history;

/// A video as the source returns it, before its duration has been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceVideo {
    pub id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub raw_duration: String, // ISO 8601, e.g. PT1H2M3S
}

/// One row of the channel history. Field names on disk follow the CSV header
/// `id,title,publishedAt,duration,currentMean`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
    #[serde(rename = "currentMean")]
    pub running_mean_seconds: f64,
}

impl VideoRecord {
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

/// The full upload history of the monitored channel, oldest first, with the
/// running mean column filled in.
///
/// Only the statistic engine builds non-empty histories, so the ordering and
/// mean invariants hold for every value of this type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    records: Vec<VideoRecord>,
}

impl History {
    pub(crate) fn from_sorted(records: Vec<VideoRecord>) -> Self {
        History { records }
    }

    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recently published record.
    pub fn latest(&self) -> Option<&VideoRecord> {
        self.records.last()
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.records.iter().any(|record| record.id == video_id)
    }

    pub fn position(&self, video_id: &str) -> Option<usize> {
        self.records.iter().position(|record| record.id == video_id)
    }

    /// Returns a new history with `record` added and every running mean
    /// recomputed from scratch.
    pub fn with_appended(&self, record: VideoRecord) -> History {
        let mut records = self.records.clone();
        records.push(record);
        rebuild_history(records)
    }

    /// Same ids in the same order with the same derived means.
    pub fn same_as(&self, other: &History) -> bool {
        self.len() == other.len()
            && self
                .records
                .iter()
                .zip(other.records.iter())
                .all(|(a, b)| a.id == b.id && a.running_mean_seconds == b.running_mean_seconds)
    }
}

/// Outcome of diffing a fresh snapshot against the stored history.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideoDiff {
    /// Earliest new upload, as it appears in the fetched snapshot.
    pub candidate: VideoRecord,
    /// Further new uploads left for later cycles.
    pub pending: usize,
}

/// Everything the composer needs to describe one confirmed upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub duration_seconds: u64,
    pub url: String,
    pub previous_mean_seconds: f64,
    pub new_mean_seconds: f64,
}
