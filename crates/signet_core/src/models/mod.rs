pub mod audit;
pub mod contract;
pub mod field;
pub mod recipient;
pub mod template;

pub use audit::{AuditAction, AuditLogEntry};
pub use contract::{Contract, ContractStatus};
pub use field::{Field, FieldKind};
pub use recipient::{Recipient, RecipientRole, RecipientStatus};
pub use template::{Template, TemplateField};
