use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Signature,
    Date,
    Text,
    Checkbox,
    Initial,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::Date => "date",
            Self::Text => "text",
            Self::Checkbox => "checkbox",
            Self::Initial => "initial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "signature" => Some(Self::Signature),
            "date" => Some(Self::Date),
            "text" => Some(Self::Text),
            "checkbox" => Some(Self::Checkbox),
            "initial" => Some(Self::Initial),
            _ => None,
        }
    }
}

/// A positioned placeholder on a document page, bound to exactly one recipient.
///
/// Geometry is normalized: x/y are fractions of the page size measured from
/// the top-left corner, width/height are fractions of the page size. All four
/// must lie in [0, 1]. `page` is 1-based. The value is written once during
/// signature submission and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub recipient_id: Uuid,
    pub kind: FieldKind,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub required: bool,
    pub value: Option<String>,
}

impl Field {
    pub fn geometry_is_normalized(&self) -> bool {
        geometry_is_normalized(self.x, self.y, self.width, self.height)
    }
}

pub fn geometry_is_normalized(x: f64, y: f64, width: f64, height: f64) -> bool {
    let in_unit = |v: f64| (0.0..=1.0).contains(&v);
    in_unit(x) && in_unit(y) && in_unit(width) && in_unit(height)
}
