use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Interviewing,
    Offer,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    /// Board column order.
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Interviewing,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Interviewing => "interviewing",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// Unknown or missing values read as `Applied`, matching how the board
    /// places rows with no recorded status.
    pub fn from_db(value: &str) -> Self {
        match value {
            "interviewing" => ApplicationStatus::Interviewing,
            "offer" => ApplicationStatus::Offer,
            "rejected" => ApplicationStatus::Rejected,
            "withdrawn" => ApplicationStatus::Withdrawn,
            _ => ApplicationStatus::Applied,
        }
    }

    /// Whether `next` follows the usual hiring progression from `self`.
    /// Informational only: status edits are never refused.
    pub fn is_nominal_transition(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Applied, Interviewing | Rejected | Withdrawn)
                | (Interviewing, Offer | Rejected | Withdrawn)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: Option<String>,
    pub title: String,
    pub company: String,
    pub status: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRow {
    pub fn status(&self) -> ApplicationStatus {
        ApplicationStatus::from_db(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_is_lowercase() {
        let json = serde_json::to_string(&ApplicationStatus::Interviewing).unwrap();
        assert_eq!(json, "\"interviewing\"");
        let status: ApplicationStatus = serde_json::from_str("\"withdrawn\"").unwrap();
        assert_eq!(status, ApplicationStatus::Withdrawn);
    }

    #[test]
    fn test_unknown_db_status_reads_as_applied() {
        assert_eq!(ApplicationStatus::from_db(""), ApplicationStatus::Applied);
        assert_eq!(ApplicationStatus::from_db("ghosted"), ApplicationStatus::Applied);
    }

    #[test]
    fn test_nominal_transitions() {
        use ApplicationStatus::*;
        assert!(Applied.is_nominal_transition(Interviewing));
        assert!(Interviewing.is_nominal_transition(Offer));
        assert!(!Applied.is_nominal_transition(Offer));
        assert!(!Offer.is_nominal_transition(Applied));
        assert!(!Rejected.is_nominal_transition(Interviewing));
    }
}
