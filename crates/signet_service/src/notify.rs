//! Outbound notification boundary. Delivery is pluggable; the engine only
//! builds messages and hands them to a `NotificationSender`. Transport
//! failures are logged by the caller and never roll back a state transition.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use signet_core::models::{Contract, Recipient};

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Error)]
#[error("notification transport failed: {0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError>;
}

/// Default sender: logs the delivery instead of talking to a provider.
/// Production deployments wire in their own transport at the boundary.
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError> {
        tracing::info!(to = %message.to, subject = %message.subject, "email dispatched");
        Ok(())
    }
}

/// Test double that records every message it is asked to deliver.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("recording sender lock").clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), TransportError> {
        self.sent
            .lock()
            .expect("recording sender lock")
            .push(message.clone());
        Ok(())
    }
}

/// Test double that refuses every delivery, for exercising the
/// log-and-continue policy around transport failures.
pub struct FailingSender;

#[async_trait]
impl NotificationSender for FailingSender {
    async fn send(&self, _message: &EmailMessage) -> Result<(), TransportError> {
        Err(TransportError("simulated outage".to_string()))
    }
}

pub fn signing_link(base_url: &str, contract_id: uuid::Uuid, auth_token: &str) -> String {
    format!("{base_url}/public/contracts/sign/{contract_id}?token={auth_token}")
}

pub fn download_link(base_url: &str, contract_id: uuid::Uuid, share_token: &str) -> String {
    format!("{base_url}/public/contracts/download/{contract_id}?token={share_token}")
}

/// Invitation sent to each signer at send time. The auth token travels only
/// inside the link; it is never logged.
pub fn signing_invitation(
    base_url: &str,
    contract: &Contract,
    recipient: &Recipient,
    auth_token: &str,
) -> EmailMessage {
    let link = signing_link(base_url, contract.id, auth_token);
    let deadline = contract
        .expires_at
        .map(|at| format!("\nPlease sign before {}.", at.format("%Y-%m-%d")))
        .unwrap_or_default();

    EmailMessage {
        to: recipient.email.clone(),
        subject: format!("Contract Ready for Signature: {}", contract.title),
        html_body: format!(
            "<p>Hello {name},</p>\
             <p>The contract <strong>{title}</strong> is ready for your signature.</p>\
             <p><a href=\"{link}\">Review and sign</a></p>{deadline_html}",
            name = recipient.name,
            title = contract.title,
            link = link,
            deadline_html = contract
                .expires_at
                .map(|at| format!("<p>Please sign before {}.</p>", at.format("%Y-%m-%d")))
                .unwrap_or_default(),
        ),
        text_body: format!(
            "Hello {name},\n\nThe contract \"{title}\" is ready for your signature.\n\
             Sign here: {link}{deadline}\n",
            name = recipient.name,
            title = contract.title,
            link = link,
            deadline = deadline,
        ),
    }
}

/// Completion notice sent to every recipient once the contract is completed.
pub fn completion_notice(
    base_url: &str,
    contract: &Contract,
    recipient: &Recipient,
) -> EmailMessage {
    let link = download_link(base_url, contract.id, &contract.share_token);
    let completed_on = contract
        .completed_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    EmailMessage {
        to: recipient.email.clone(),
        subject: format!("Contract Completed: {}", contract.title),
        html_body: format!(
            "<p>Hello {name},</p>\
             <p>The contract <strong>{title}</strong> was completed on {completed_on}.</p>\
             <p><a href=\"{link}\">Download the signed document</a></p>",
            name = recipient.name,
            title = contract.title,
        ),
        text_body: format!(
            "Hello {name},\n\nThe contract \"{title}\" was completed on {completed_on}.\n\
             Download the signed document: {link}\n",
            name = recipient.name,
            title = contract.title,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use signet_core::models::{ContractStatus, RecipientRole, RecipientStatus};
    use uuid::Uuid;

    fn fixtures() -> (Contract, Recipient) {
        let contract = Contract {
            id: Uuid::new_v4(),
            title: "Creator Agreement".to_string(),
            status: ContractStatus::Sent,
            share_token: "aabbccddeeff00112233445566778899".to_string(),
            document_data: vec![],
            signed_document_data: None,
            completion_certificate: None,
            owner_id: Uuid::new_v4(),
            creator_id: None,
            expires_at: None,
            completed_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        let recipient = Recipient {
            id: Uuid::new_v4(),
            contract_id: contract.id,
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            role: RecipientRole::Signer,
            signing_order: 1,
            status: RecipientStatus::Sent,
            auth_token: None,
            signed_at: None,
            ip_address: None,
            user_agent: None,
        };
        (contract, recipient)
    }

    #[test]
    fn invitation_carries_the_token_bearing_link() {
        let (contract, recipient) = fixtures();
        let message =
            signing_invitation("https://app.example.com", &contract, &recipient, "tok123");
        assert_eq!(message.to, "jane@example.com");
        assert_eq!(
            message.subject,
            "Contract Ready for Signature: Creator Agreement"
        );
        let expected = format!(
            "https://app.example.com/public/contracts/sign/{}?token=tok123",
            contract.id
        );
        assert!(message.text_body.contains(&expected));
        assert!(message.html_body.contains(&expected));
    }

    #[test]
    fn completion_notice_links_the_share_token_download() {
        let (contract, recipient) = fixtures();
        let message = completion_notice("https://app.example.com", &contract, &recipient);
        assert_eq!(message.subject, "Contract Completed: Creator Agreement");
        let expected = format!(
            "https://app.example.com/public/contracts/download/{}?token={}",
            contract.id, contract.share_token
        );
        assert!(message.text_body.contains(&expected));
    }
}
