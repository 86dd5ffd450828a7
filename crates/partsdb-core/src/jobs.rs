use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::status;

/// External batch jobs the back office can launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Price and photo synchronization from supplier feeds.
    PricePhotoUpdate,
    /// Trast price parser.
    TrastPriceUpdate,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::PricePhotoUpdate, JobKind::TrastPriceUpdate];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::PricePhotoUpdate => "price_photo_update",
            JobKind::TrastPriceUpdate => "trast_price_update",
        }
    }

    /// Status-store entries the job's worker reports through.
    #[must_use]
    pub fn status_keys(self) -> &'static [&'static str] {
        match self {
            JobKind::PricePhotoUpdate => &[
                status::XML_UPDATE_STATUS,
                status::XML_UPDATE_TIME,
                status::YML_UPDATE_STATUS,
                status::YML_UPDATE_TIME,
            ],
            JobKind::TrastPriceUpdate => &[status::PARSER_STATUS, status::PARSER_UPDATE_TIME],
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown job kind '{s}'"))
    }
}

/// Lifecycle of a launched job: `queued → running → succeeded | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_round_trips_through_str() {
        for kind in JobKind::ALL {
            assert_eq!(kind.as_str().parse::<JobKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_job_kind_is_rejected() {
        assert!("reindex".parse::<JobKind>().is_err());
    }

    #[test]
    fn job_kind_deserializes_snake_case() {
        let kind: JobKind = serde_json::from_str("\"trast_price_update\"").unwrap();
        assert_eq!(kind, JobKind::TrastPriceUpdate);
    }

    #[test]
    fn price_photo_job_reports_xml_and_yml_flags() {
        let keys = JobKind::PricePhotoUpdate.status_keys();
        assert!(keys.contains(&"xml_update_status"));
        assert!(keys.contains(&"yml_update_time"));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
