use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field::FieldKind;

/// Reusable document plus field layout, decoupled from any contract instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub document_data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Template fields bind to a signer slot by index rather than a recipient id;
/// instantiation maps `signer_index` onto the contract's concrete signer list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateField {
    pub id: Uuid,
    pub template_id: Uuid,
    pub signer_index: u32,
    pub kind: FieldKind,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub required: bool,
}
