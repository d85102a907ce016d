//! Persistence for the contract engine.
//!
//! `ContractStore` is the seam the service layer talks to. Two
//! implementations ship here: `MemoryStore` for tests and embedded use, and
//! `PgStore` over Postgres. The store owns referential checks that matter for
//! integrity (field-to-recipient ownership, the completion compare-and-swap);
//! everything else lives in the service.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use signet_core::certificate::CompletionCertificate;
use signet_core::models::{
    AuditLogEntry, Contract, ContractStatus, Field, Recipient, Template, TemplateField,
};

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Persist a new contract with its recipients and fields in one unit.
    async fn insert_contract(
        &self,
        contract: &Contract,
        recipients: &[Recipient],
        fields: &[Field],
    ) -> Result<()>;

    async fn fetch_contract(&self, id: Uuid) -> Result<Option<Contract>>;

    /// Contract-level capability lookup for the public download link.
    /// Both the id and the exact share token must match.
    async fn fetch_contract_by_share_token(
        &self,
        id: Uuid,
        share_token: &str,
    ) -> Result<Option<Contract>>;

    /// Conditional status transition: applies only while the stored status
    /// still equals `from`, and reports whether the write landed. A stale
    /// caller can therefore never downgrade a contract that moved on
    /// concurrently (in particular, `completed` is terminal).
    async fn transition_status(
        &self,
        id: Uuid,
        from: ContractStatus,
        to: ContractStatus,
    ) -> Result<bool>;

    /// Recipients ordered by signing_order ascending.
    async fn list_recipients(&self, contract_id: Uuid) -> Result<Vec<Recipient>>;

    /// Recipient-level capability lookup: contract id plus exact auth token.
    /// A miss on either yields None, with no hint of which half failed.
    async fn find_recipient_by_token(
        &self,
        contract_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Recipient>>;

    /// Store a freshly minted auth token and move the recipient to `sent`.
    async fn mark_recipient_sent(&self, recipient_id: Uuid, auth_token: &str) -> Result<()>;

    async fn mark_recipient_signed(
        &self,
        recipient_id: Uuid,
        signed_at: DateTime<Utc>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<()>;

    /// Fields ordered by creation order.
    async fn list_fields(&self, contract_id: Uuid) -> Result<Vec<Field>>;

    /// Write a field value scoped to (contract, field, recipient). A field
    /// that does not belong to that recipient is reported as NotFound, which
    /// blocks cross-recipient tampering.
    async fn set_field_value(
        &self,
        contract_id: Uuid,
        field_id: Uuid,
        recipient_id: Uuid,
        value: &str,
    ) -> Result<()>;

    /// Atomic completion: writes status, signed bytes, certificate and
    /// completed_at together, guarded by `status <> completed`. Returns false
    /// when a concurrent caller already completed the contract.
    async fn complete_contract(
        &self,
        id: Uuid,
        signed_document: &[u8],
        certificate: &CompletionCertificate,
        completed_at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn append_audit(&self, entry: &AuditLogEntry) -> Result<()>;

    /// Audit entries for a contract in insertion order.
    async fn list_audit(&self, contract_id: Uuid) -> Result<Vec<AuditLogEntry>>;

    async fn insert_template(&self, template: &Template, fields: &[TemplateField]) -> Result<()>;

    async fn fetch_template(&self, id: Uuid) -> Result<Option<(Template, Vec<TemplateField>)>>;
}
