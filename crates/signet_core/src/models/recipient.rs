use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientRole {
    Signer,
    Viewer,
}

impl RecipientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signer => "signer",
            Self::Viewer => "viewer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "signer" => Some(Self::Signer),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Pending,
    Sent,
    Signed,
}

impl RecipientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Signed => "signed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "signed" => Some(Self::Signed),
            _ => None,
        }
    }
}

/// One party attached to a contract.
///
/// The auth token is minted at send time and is the bearer capability for the
/// signing link. Any signing action must match recipient id, contract id and
/// the exact token together; a miss on any of the three is reported as the
/// same uniform failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: RecipientRole,
    pub signing_order: i32,
    pub status: RecipientStatus,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Recipient {
    pub fn is_signer(&self) -> bool {
        self.role == RecipientRole::Signer
    }

    pub fn has_signed(&self) -> bool {
        self.status == RecipientStatus::Signed
    }
}
