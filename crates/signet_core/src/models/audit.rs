use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Sent,
    Signed,
    Completed,
    Downloaded,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Sent => "sent",
            Self::Signed => "signed",
            Self::Completed => "completed",
            Self::Downloaded => "downloaded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "sent" => Some(Self::Sent),
            "signed" => Some(Self::Signed),
            "completed" => Some(Self::Completed),
            "downloaded" => Some(Self::Downloaded),
            _ => None,
        }
    }
}

/// Append-only audit record. Never mutated or deleted; per-contract insertion
/// order is the audit trail ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub contract_id: Uuid,
    /// None for contract-level events such as `created`.
    pub recipient_id: Option<Uuid>,
    pub action: AuditAction,
    pub detail: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        contract_id: Uuid,
        recipient_id: Option<Uuid>,
        action: AuditAction,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_id,
            recipient_id,
            action,
            detail,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_network(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip;
        self.user_agent = user_agent;
        self
    }
}
