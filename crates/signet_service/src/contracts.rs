//! The contract lifecycle: draft -> sent -> partially_signed -> completed.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use signet_core::certificate::{
    compute_security_hash, CertificateEvent, CertificateSigner, CompletionCertificate,
    SignatureRecord,
};
use signet_core::models::field::geometry_is_normalized;
use signet_core::models::{
    AuditAction, AuditLogEntry, Contract, ContractStatus, Field, FieldKind, Recipient,
    RecipientRole, RecipientStatus,
};
use signet_core::stamp::{stamp_document, DocumentStampMeta};
use signet_core::token::{generate_token, redacted_prefix};
use signet_core::validation::validate_pdf;
use signet_db::StoreError;

use crate::error::{Result, ServiceError};
use crate::notify;
use crate::ContractService;

#[derive(Debug, Clone)]
pub struct RecipientInput {
    pub name: String,
    pub email: String,
    pub role: RecipientRole,
    /// Defaults to the input position (1-based) when absent.
    pub signing_order: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct FieldInput {
    pub recipient_email: String,
    pub kind: FieldKind,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub required: bool,
}

#[derive(Debug)]
pub struct CreateContractParams {
    pub title: String,
    pub owner_id: Uuid,
    pub creator_id: Option<Uuid>,
    /// Original PDF bytes. Ignored when `template_id` is set.
    pub document: Vec<u8>,
    pub template_id: Option<Uuid>,
    pub expires_in_days: Option<i64>,
    pub recipients: Vec<RecipientInput>,
    /// Explicit field layout. When absent (and no template is used) one
    /// signature field per signer is synthesized, vertically stacked.
    pub fields: Option<Vec<FieldInput>>,
}

#[derive(Debug)]
pub struct SubmitSignatureParams {
    pub contract_id: Uuid,
    pub recipient_id: Uuid,
    pub auth_token: String,
    pub values: Vec<FieldValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FieldValue {
    pub field_id: Uuid,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureOutcome {
    /// Accepted, but other signers are still outstanding.
    PartiallySigned,
    /// This submission (or a concurrent one) completed the contract.
    Completed,
}

/// What an authenticated signer is shown when opening the signing link.
#[derive(Debug, Clone, Serialize)]
pub struct SigningSession {
    pub contract_id: Uuid,
    pub contract_title: String,
    pub contract_status: ContractStatus,
    pub recipient_id: Uuid,
    pub recipient_name: String,
    pub recipient_email: String,
    pub expires_at: Option<chrono::DateTime<Utc>>,
    pub fields: Vec<Field>,
}

#[derive(Debug)]
pub struct SignedDownload {
    pub title: String,
    pub document: Vec<u8>,
}

impl ContractService {
    /// Create a contract in `draft`. Validates the document, persists the
    /// aggregate, and emits the `created` audit entry. Nothing is sent yet;
    /// sending is a separate, explicit step.
    pub async fn create_contract(&self, params: CreateContractParams) -> Result<Contract> {
        // 1. Recipient sanity
        if params.recipients.is_empty() {
            return Err(ServiceError::Validation(
                "at least one recipient is required".to_string(),
            ));
        }
        if !params
            .recipients
            .iter()
            .any(|r| r.role == RecipientRole::Signer)
        {
            return Err(ServiceError::Validation(
                "at least one signer recipient is required".to_string(),
            ));
        }
        {
            let mut seen = std::collections::HashSet::new();
            for r in &params.recipients {
                if !seen.insert(r.email.to_ascii_lowercase()) {
                    return Err(ServiceError::Validation(format!(
                        "duplicate recipient email: {}",
                        r.email
                    )));
                }
            }
        }

        // 2. Resolve the document (template or direct upload) and validate it
        //    before anything is persisted.
        let template = match params.template_id {
            Some(template_id) => Some(
                self.store()
                    .fetch_template(template_id)
                    .await?
                    .ok_or(ServiceError::NotFound("template"))?,
            ),
            None => None,
        };
        let document = match &template {
            Some((template, _)) => template.document_data.clone(),
            None => params.document,
        };
        let summary = validate_pdf(&document)?;

        // 3. Assemble the aggregate
        let contract_id = Uuid::new_v4();
        let now = Utc::now();
        let contract = Contract {
            id: contract_id,
            title: params.title,
            status: ContractStatus::Draft,
            share_token: generate_token(),
            document_data: document,
            signed_document_data: None,
            completion_certificate: None,
            owner_id: params.owner_id,
            creator_id: params.creator_id,
            expires_at: params.expires_in_days.map(|days| now + Duration::days(days)),
            completed_at: None,
            created_at: now,
        };

        let recipients: Vec<Recipient> = params
            .recipients
            .iter()
            .enumerate()
            .map(|(i, input)| Recipient {
                id: Uuid::new_v4(),
                contract_id,
                name: input.name.clone(),
                email: input.email.clone(),
                role: input.role,
                signing_order: input.signing_order.unwrap_or(i as i32 + 1),
                status: RecipientStatus::Pending,
                auth_token: None,
                signed_at: None,
                ip_address: None,
                user_agent: None,
            })
            .collect();

        // 4. Field layout: template > explicit inputs > default stack
        let signers: Vec<&Recipient> = recipients.iter().filter(|r| r.is_signer()).collect();
        let fields = match (&template, &params.fields) {
            (Some(_), Some(_)) => {
                return Err(ServiceError::Validation(
                    "supply either a template or an explicit field layout, not both".to_string(),
                ))
            }
            (Some((_, template_fields)), None) => {
                instantiate_template_fields(contract_id, template_fields, &signers)?
            }
            (None, Some(inputs)) => {
                build_fields(contract_id, inputs, &recipients, summary.page_count)?
            }
            (None, None) => default_signature_fields(contract_id, &signers),
        };

        // 5. Persist, then audit
        self.store()
            .insert_contract(&contract, &recipients, &fields)
            .await?;
        self.store()
            .append_audit(&AuditLogEntry::new(
                contract_id,
                None,
                AuditAction::Created,
                json!({
                    "title": contract.title,
                    "recipients": recipients.len(),
                    "fields": fields.len(),
                }),
            ))
            .await?;

        Ok(contract)
    }

    /// Move a draft to `sent`: mint one fresh auth token per signer, notify
    /// each in signing order, then flip the contract status. A second send is
    /// rejected because the status is no longer `draft`.
    pub async fn send_contract(&self, contract_id: Uuid, owner_id: Uuid) -> Result<()> {
        let contract = self
            .store()
            .fetch_contract(contract_id)
            .await?
            .filter(|c| c.owner_id == owner_id)
            .ok_or(ServiceError::NotFound("contract"))?;

        if contract.status != ContractStatus::Draft {
            return Err(ServiceError::State(format!(
                "contract cannot be sent from status '{}'",
                contract.status.as_str()
            )));
        }

        // list_recipients returns signing_order ascending, which fixes both
        // the notification order and the audit-log order.
        let recipients = self.store().list_recipients(contract_id).await?;
        for recipient in recipients.iter().filter(|r| r.is_signer()) {
            let auth_token = generate_token();
            self.store()
                .mark_recipient_sent(recipient.id, &auth_token)
                .await?;

            let message =
                notify::signing_invitation(self.base_url(), &contract, recipient, &auth_token);
            if let Err(e) = self.notifier().send(&message).await {
                // Transport failures are logged and skipped; they never
                // abort the send or roll back the token that was minted.
                tracing::warn!(
                    recipient = %recipient.email,
                    error = %e,
                    "signing invitation delivery failed"
                );
            }

            self.store()
                .append_audit(&AuditLogEntry::new(
                    contract_id,
                    Some(recipient.id),
                    AuditAction::Sent,
                    json!({
                        "email": recipient.email,
                        "token_prefix": redacted_prefix(&auth_token),
                    }),
                ))
                .await?;
        }

        self.store()
            .transition_status(contract_id, ContractStatus::Draft, ContractStatus::Sent)
            .await?;
        Ok(())
    }

    /// Resolve a signing link. The lookup is keyed by (contract id, exact
    /// token); any mismatch yields None with no hint of which half failed.
    pub async fn get_signing_link(
        &self,
        contract_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<SigningSession>> {
        let Some(recipient) = self
            .store()
            .find_recipient_by_token(contract_id, auth_token)
            .await?
        else {
            return Ok(None);
        };
        let Some(contract) = self.store().fetch_contract(contract_id).await? else {
            return Ok(None);
        };

        let fields = self
            .store()
            .list_fields(contract_id)
            .await?
            .into_iter()
            .filter(|f| f.recipient_id == recipient.id)
            .collect();

        Ok(Some(SigningSession {
            contract_id,
            contract_title: contract.title,
            contract_status: contract.status,
            recipient_id: recipient.id,
            recipient_name: recipient.name,
            recipient_email: recipient.email,
            expires_at: contract.expires_at,
            fields,
        }))
    }

    /// Record a signer's submission and run the completion check.
    pub async fn submit_signature(
        &self,
        params: SubmitSignatureParams,
    ) -> Result<SignatureOutcome> {
        // 1. Three-way identity check: recipient id + contract id + token.
        //    Every mismatch collapses into the same uniform error.
        let recipient = self
            .store()
            .find_recipient_by_token(params.contract_id, &params.auth_token)
            .await?
            .filter(|r| r.id == params.recipient_id)
            .ok_or(ServiceError::InvalidSigningLink)?;
        let contract = self
            .store()
            .fetch_contract(params.contract_id)
            .await?
            .ok_or(ServiceError::InvalidSigningLink)?;

        // 2. State gates
        match contract.status {
            ContractStatus::Draft => {
                return Err(ServiceError::State(
                    "contract has not been sent yet".to_string(),
                ))
            }
            ContractStatus::Completed => {
                return Err(ServiceError::State(
                    "contract is already completed".to_string(),
                ))
            }
            ContractStatus::Sent | ContractStatus::PartiallySigned => {}
        }
        if let Some(expires_at) = contract.expires_at {
            if Utc::now() > expires_at {
                return Err(ServiceError::State("contract has expired".to_string()));
            }
        }
        if recipient.has_signed() {
            return Err(ServiceError::State(
                "recipient has already signed this contract".to_string(),
            ));
        }

        // 3. Write field values, scoped to this recipient. The store rejects
        //    a field bound to anyone else, which blocks cross-recipient
        //    tampering.
        for value in &params.values {
            self.store()
                .set_field_value(params.contract_id, value.field_id, recipient.id, &value.value)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound(_) => ServiceError::Validation(
                        "field does not belong to this recipient".to_string(),
                    ),
                    other => ServiceError::Store(other),
                })?;
        }

        // 4. Mark signed with the captured network metadata
        let signed_at = Utc::now();
        self.store()
            .mark_recipient_signed(
                recipient.id,
                signed_at,
                params.ip_address.as_deref(),
                params.user_agent.as_deref(),
            )
            .await?;
        self.store()
            .append_audit(
                &AuditLogEntry::new(
                    params.contract_id,
                    Some(recipient.id),
                    AuditAction::Signed,
                    json!({
                        "email": recipient.email,
                        "fields": params.values.len(),
                    }),
                )
                .with_network(params.ip_address.clone(), params.user_agent.clone()),
            )
            .await?;

        // 5. Completion check
        self.run_completion_check(params.contract_id).await
    }

    /// Runs after every submission. Promotes to `partially_signed` while
    /// signers are outstanding; once all have signed, generates the final
    /// document and certificate and commits them through the store's
    /// conditional completion write so the generation takes effect at most
    /// once even under concurrent last submissions.
    async fn run_completion_check(&self, contract_id: Uuid) -> Result<SignatureOutcome> {
        let recipients = self.store().list_recipients(contract_id).await?;
        let signers: Vec<&Recipient> = recipients.iter().filter(|r| r.is_signer()).collect();
        let all_signed = !signers.is_empty() && signers.iter().all(|r| r.has_signed());

        let contract = self
            .store()
            .fetch_contract(contract_id)
            .await?
            .ok_or(ServiceError::NotFound("contract"))?;

        if !all_signed {
            if signers.iter().any(|r| r.has_signed()) {
                // Conditional on the stored status still being `sent`: a
                // concurrent final submission may have completed the contract
                // after the recipients were read, and completion is terminal.
                self.store()
                    .transition_status(
                        contract_id,
                        ContractStatus::Sent,
                        ContractStatus::PartiallySigned,
                    )
                    .await?;
            }
            return Ok(SignatureOutcome::PartiallySigned);
        }
        if contract.status == ContractStatus::Completed {
            return Ok(SignatureOutcome::Completed);
        }

        // All signed: stamp the final document at each field's own stored
        // page and geometry, then hash and certify.
        let fields = self.store().list_fields(contract_id).await?;
        let signers_by_id: HashMap<Uuid, Recipient> = signers
            .iter()
            .map(|r| (r.id, (*r).clone()))
            .collect();
        let completed_at = Utc::now();

        let meta = DocumentStampMeta {
            title: contract.title.clone(),
            contract_id,
            signed_at: completed_at,
            signer_count: signers.len(),
        };
        let stamped = stamp_document(&contract.document_data, &fields, &signers_by_id, &meta)?;

        // Stable signature order: signers by signing_order, fields in
        // creation order within each signer. The certificate hash depends on
        // this ordering.
        let mut records = Vec::new();
        for signer in &signers {
            for field in fields.iter().filter(|f| f.recipient_id == signer.id) {
                if let Some(value) = &field.value {
                    records.push(SignatureRecord {
                        field_id: field.id,
                        value: value.clone(),
                        signed_at: signer.signed_at.unwrap_or(completed_at),
                        signer_email: signer.email.clone(),
                    });
                }
            }
        }
        let security_hash = compute_security_hash(&stamped, &records);

        let audit_trail = self
            .store()
            .list_audit(contract_id)
            .await?
            .into_iter()
            .filter(|e| e.action == AuditAction::Signed)
            .map(|e| CertificateEvent {
                action: e.action.as_str().to_string(),
                timestamp: e.created_at,
                detail: e.detail,
            })
            .collect();
        let certificate = CompletionCertificate {
            contract_id,
            completed_at,
            recipients: recipients
                .iter()
                .map(|r| CertificateSigner {
                    name: r.name.clone(),
                    email: r.email.clone(),
                    signed_at: r.signed_at,
                    ip_address: r.ip_address.clone(),
                    user_agent: r.user_agent.clone(),
                })
                .collect(),
            audit_trail,
            security_hash: security_hash.clone(),
        };

        // 6. The conditional write: only one concurrent caller wins.
        let won = self
            .store()
            .complete_contract(contract_id, &stamped, &certificate, completed_at)
            .await?;
        if !won {
            return Ok(SignatureOutcome::Completed);
        }

        self.store()
            .append_audit(&AuditLogEntry::new(
                contract_id,
                None,
                AuditAction::Completed,
                json!({
                    "signers": signers.len(),
                    "security_hash": security_hash,
                }),
            ))
            .await?;

        let mut completed_contract = contract;
        completed_contract.status = ContractStatus::Completed;
        completed_contract.completed_at = Some(completed_at);
        for recipient in &recipients {
            let message =
                notify::completion_notice(self.base_url(), &completed_contract, recipient);
            if let Err(e) = self.notifier().send(&message).await {
                tracing::warn!(
                    recipient = %recipient.email,
                    error = %e,
                    "completion notice delivery failed"
                );
            }
        }

        Ok(SignatureOutcome::Completed)
    }

    /// Public download by contract-level share token. Only completed
    /// contracts expose the signed artifact.
    pub async fn download_signed(
        &self,
        contract_id: Uuid,
        share_token: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<SignedDownload> {
        let contract = self
            .store()
            .fetch_contract_by_share_token(contract_id, share_token)
            .await?
            .ok_or(ServiceError::NotFound("contract"))?;

        let document = match (contract.status, contract.signed_document_data) {
            (ContractStatus::Completed, Some(bytes)) => bytes,
            _ => {
                return Err(ServiceError::State(
                    "contract is not completed yet".to_string(),
                ))
            }
        };

        self.store()
            .append_audit(
                &AuditLogEntry::new(
                    contract_id,
                    None,
                    AuditAction::Downloaded,
                    json!({ "bytes": document.len() }),
                )
                .with_network(ip_address, user_agent),
            )
            .await?;

        Ok(SignedDownload {
            title: contract.title,
            document,
        })
    }

    pub async fn get_contract(&self, id: Uuid) -> Result<Option<Contract>> {
        Ok(self.store().fetch_contract(id).await?)
    }

    pub async fn recipients(&self, contract_id: Uuid) -> Result<Vec<Recipient>> {
        Ok(self.store().list_recipients(contract_id).await?)
    }

    pub async fn audit_trail(&self, contract_id: Uuid) -> Result<Vec<AuditLogEntry>> {
        Ok(self.store().list_audit(contract_id).await?)
    }
}

/// One synthesized signature field per signer, vertically stacked on page 1.
fn default_signature_fields(contract_id: Uuid, signers: &[&Recipient]) -> Vec<Field> {
    signers
        .iter()
        .enumerate()
        .map(|(i, signer)| Field {
            id: Uuid::new_v4(),
            contract_id,
            recipient_id: signer.id,
            kind: FieldKind::Signature,
            page: 1,
            x: 0.1,
            y: (0.15 + 0.09 * i as f64).min(0.9),
            width: 0.35,
            height: 0.06,
            required: true,
            value: None,
        })
        .collect()
}

fn build_fields(
    contract_id: Uuid,
    inputs: &[FieldInput],
    recipients: &[Recipient],
    page_count: usize,
) -> Result<Vec<Field>> {
    let by_email: HashMap<String, &Recipient> = recipients
        .iter()
        .map(|r| (r.email.to_ascii_lowercase(), r))
        .collect();

    inputs
        .iter()
        .map(|input| {
            let recipient = by_email
                .get(&input.recipient_email.to_ascii_lowercase())
                .ok_or_else(|| {
                    ServiceError::Validation(format!(
                        "field references unknown recipient email: {}",
                        input.recipient_email
                    ))
                })?;
            if !geometry_is_normalized(input.x, input.y, input.width, input.height) {
                return Err(ServiceError::Validation(
                    "field geometry must be normalized to [0, 1]".to_string(),
                ));
            }
            if input.page == 0 || input.page as usize > page_count {
                return Err(ServiceError::Validation(format!(
                    "field page {} is outside the document ({} pages)",
                    input.page, page_count
                )));
            }
            Ok(Field {
                id: Uuid::new_v4(),
                contract_id,
                recipient_id: recipient.id,
                kind: input.kind,
                page: input.page,
                x: input.x,
                y: input.y,
                width: input.width,
                height: input.height,
                required: input.required,
                value: None,
            })
        })
        .collect()
}

fn instantiate_template_fields(
    contract_id: Uuid,
    template_fields: &[signet_core::models::TemplateField],
    signers: &[&Recipient],
) -> Result<Vec<Field>> {
    template_fields
        .iter()
        .map(|tf| {
            let signer = signers.get(tf.signer_index as usize).ok_or_else(|| {
                ServiceError::Validation(format!(
                    "template field targets signer slot {} but the contract has {} signers",
                    tf.signer_index,
                    signers.len()
                ))
            })?;
            Ok(Field {
                id: Uuid::new_v4(),
                contract_id,
                recipient_id: signer.id,
                kind: tf.kind,
                page: tf.page,
                x: tf.x,
                y: tf.y,
                width: tf.width,
                height: tf.height,
                required: tf.required,
                value: None,
            })
        })
        .collect()
}
