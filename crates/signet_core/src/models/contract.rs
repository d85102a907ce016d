use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::certificate::CompletionCertificate;

/// Lifecycle of a contract: draft -> sent -> partially_signed -> completed.
/// No transition ever skips `sent` on the way to `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Sent,
    PartiallySigned,
    Completed,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::PartiallySigned => "partially_signed",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "partially_signed" => Some(Self::PartiallySigned),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Aggregate root for a signature request.
///
/// `signed_document_data` and `completion_certificate` are both None until
/// completion and are written together, exactly once. `completed_at` is set
/// iff status is Completed. Contracts are never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub title: String,
    pub status: ContractStatus,
    /// Contract-level capability for the public download link.
    pub share_token: String,
    #[serde(skip_serializing)]
    pub document_data: Vec<u8>,
    #[serde(skip_serializing)]
    pub signed_document_data: Option<Vec<u8>>,
    pub completion_certificate: Option<CompletionCertificate>,
    pub owner_id: Uuid,
    pub creator_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    /// The invariant from the data model: completion artifacts are all-or-nothing.
    pub fn completion_state_is_consistent(&self) -> bool {
        let completed = self.status == ContractStatus::Completed;
        self.signed_document_data.is_some() == completed
            && self.completion_certificate.is_some() == completed
            && self.completed_at.is_some() == completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            ContractStatus::Draft,
            ContractStatus::Sent,
            ContractStatus::PartiallySigned,
            ContractStatus::Completed,
        ] {
            assert_eq!(ContractStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ContractStatus::parse("voided"), None);
    }
}
