//! In-memory store used by tests and embedded callers. A single mutex guards
//! all tables; `complete_contract` does its check-and-write while holding it,
//! which is the compare-and-swap the completion detector relies on.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use signet_core::certificate::CompletionCertificate;
use signet_core::models::{
    AuditLogEntry, Contract, ContractStatus, Field, Recipient, RecipientStatus, Template,
    TemplateField,
};

use crate::error::{Result, StoreError};
use crate::ContractStore;

#[derive(Default)]
struct Inner {
    contracts: HashMap<Uuid, Contract>,
    recipients: HashMap<Uuid, Recipient>,
    fields: HashMap<Uuid, Field>,
    field_order: Vec<Uuid>,
    audit: Vec<AuditLogEntry>,
    templates: HashMap<Uuid, (Template, Vec<TemplateField>)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned() -> StoreError {
    StoreError::Database("memory store mutex poisoned".to_string())
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn insert_contract(
        &self,
        contract: &Contract,
        recipients: &[Recipient],
        fields: &[Field],
    ) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        inner.contracts.insert(contract.id, contract.clone());
        for r in recipients {
            inner.recipients.insert(r.id, r.clone());
        }
        for f in fields {
            inner.fields.insert(f.id, f.clone());
            inner.field_order.push(f.id);
        }
        Ok(())
    }

    async fn fetch_contract(&self, id: Uuid) -> Result<Option<Contract>> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        Ok(inner.contracts.get(&id).cloned())
    }

    async fn fetch_contract_by_share_token(
        &self,
        id: Uuid,
        share_token: &str,
    ) -> Result<Option<Contract>> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        Ok(inner
            .contracts
            .get(&id)
            .filter(|c| c.share_token == share_token)
            .cloned())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: ContractStatus,
        to: ContractStatus,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let Some(contract) = inner.contracts.get_mut(&id) else {
            return Ok(false);
        };
        if contract.status != from {
            return Ok(false);
        }
        contract.status = to;
        Ok(true)
    }

    async fn list_recipients(&self, contract_id: Uuid) -> Result<Vec<Recipient>> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let mut out: Vec<Recipient> = inner
            .recipients
            .values()
            .filter(|r| r.contract_id == contract_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.signing_order);
        Ok(out)
    }

    async fn find_recipient_by_token(
        &self,
        contract_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Recipient>> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        Ok(inner
            .recipients
            .values()
            .find(|r| {
                r.contract_id == contract_id && r.auth_token.as_deref() == Some(auth_token)
            })
            .cloned())
    }

    async fn mark_recipient_sent(&self, recipient_id: Uuid, auth_token: &str) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let recipient = inner
            .recipients
            .get_mut(&recipient_id)
            .ok_or_else(|| StoreError::NotFound(format!("recipient {recipient_id}")))?;
        recipient.auth_token = Some(auth_token.to_string());
        recipient.status = RecipientStatus::Sent;
        Ok(())
    }

    async fn mark_recipient_signed(
        &self,
        recipient_id: Uuid,
        signed_at: DateTime<Utc>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let recipient = inner
            .recipients
            .get_mut(&recipient_id)
            .ok_or_else(|| StoreError::NotFound(format!("recipient {recipient_id}")))?;
        recipient.status = RecipientStatus::Signed;
        recipient.signed_at = Some(signed_at);
        recipient.ip_address = ip_address.map(String::from);
        recipient.user_agent = user_agent.map(String::from);
        Ok(())
    }

    async fn list_fields(&self, contract_id: Uuid) -> Result<Vec<Field>> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        Ok(inner
            .field_order
            .iter()
            .filter_map(|id| inner.fields.get(id))
            .filter(|f| f.contract_id == contract_id)
            .cloned()
            .collect())
    }

    async fn set_field_value(
        &self,
        contract_id: Uuid,
        field_id: Uuid,
        recipient_id: Uuid,
        value: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let field = inner
            .fields
            .get_mut(&field_id)
            .filter(|f| f.contract_id == contract_id && f.recipient_id == recipient_id)
            .ok_or_else(|| {
                StoreError::NotFound(format!("field {field_id} for recipient {recipient_id}"))
            })?;
        field.value = Some(value.to_string());
        Ok(())
    }

    async fn complete_contract(
        &self,
        id: Uuid,
        signed_document: &[u8],
        certificate: &CompletionCertificate,
        completed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let contract = inner
            .contracts
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("contract {id}")))?;
        if contract.status == ContractStatus::Completed {
            // A concurrent submission already won the race.
            return Ok(false);
        }
        contract.status = ContractStatus::Completed;
        contract.signed_document_data = Some(signed_document.to_vec());
        contract.completion_certificate = Some(certificate.clone());
        contract.completed_at = Some(completed_at);
        Ok(true)
    }

    async fn append_audit(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        inner.audit.push(entry.clone());
        Ok(())
    }

    async fn list_audit(&self, contract_id: Uuid) -> Result<Vec<AuditLogEntry>> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        Ok(inner
            .audit
            .iter()
            .filter(|e| e.contract_id == contract_id)
            .cloned()
            .collect())
    }

    async fn insert_template(&self, template: &Template, fields: &[TemplateField]) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        inner
            .templates
            .insert(template.id, (template.clone(), fields.to_vec()));
        Ok(())
    }

    async fn fetch_template(&self, id: Uuid) -> Result<Option<(Template, Vec<TemplateField>)>> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        Ok(inner.templates.get(&id).cloned())
    }
}
