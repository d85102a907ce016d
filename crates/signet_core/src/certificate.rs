use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// One signature captured for hashing, in stable (signing_order, field) order.
/// The canonical form is the serde_json encoding of this struct; field order
/// follows the declaration order below and must not change, or previously
/// issued hashes stop verifying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub field_id: Uuid,
    pub value: String,
    pub signed_at: DateTime<Utc>,
    pub signer_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateSigner {
    pub name: String,
    pub email: String,
    pub signed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateEvent {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub detail: serde_json::Value,
}

/// Derived completion artifact: who signed, when, from where, plus the
/// tamper-evidence hash over the final document and signature data.
/// Generated exactly once, when the last required signer submits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionCertificate {
    pub contract_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub recipients: Vec<CertificateSigner>,
    pub audit_trail: Vec<CertificateEvent>,
    pub security_hash: String,
}

impl CompletionCertificate {
    /// Recompute the hash from the same inputs and compare. Any change to the
    /// document bytes or to a single signature value breaks verification.
    pub fn verify(&self, final_document: &[u8], signatures: &[SignatureRecord]) -> bool {
        compute_security_hash(final_document, signatures) == self.security_hash
    }
}

/// SHA-256 over the final document bytes followed by the canonical JSON of
/// each signature in stable order.
pub fn compute_security_hash(final_document: &[u8], signatures: &[SignatureRecord]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(final_document);
    for record in signatures {
        // serde_json emits struct fields in declaration order, so this
        // encoding is deterministic for identical inputs.
        let canonical = serde_json::to_vec(record).expect("signature record serializes");
        hasher.update(&canonical);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(value: &str, email: &str) -> SignatureRecord {
        SignatureRecord {
            field_id: Uuid::nil(),
            value: value.to_string(),
            signed_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            signer_email: email.to_string(),
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let doc = b"%PDF-1.5 final bytes";
        let sigs = vec![record("Jane Doe", "jane@example.com")];
        assert_eq!(
            compute_security_hash(doc, &sigs),
            compute_security_hash(doc, &sigs)
        );
    }

    #[test]
    fn hash_changes_when_a_value_changes() {
        let doc = b"%PDF-1.5 final bytes";
        let original = vec![record("Jane Doe", "jane@example.com")];
        let tampered = vec![record("Jane Doe Jr", "jane@example.com")];
        assert_ne!(
            compute_security_hash(doc, &original),
            compute_security_hash(doc, &tampered)
        );
    }

    #[test]
    fn hash_changes_when_document_changes() {
        let sigs = vec![record("Jane Doe", "jane@example.com")];
        assert_ne!(
            compute_security_hash(b"doc-a", &sigs),
            compute_security_hash(b"doc-b", &sigs)
        );
    }

    #[test]
    fn hash_is_order_sensitive() {
        let doc = b"doc";
        let a = record("A", "a@example.com");
        let b = record("B", "b@example.com");
        assert_ne!(
            compute_security_hash(doc, &[a.clone(), b.clone()]),
            compute_security_hash(doc, &[b, a])
        );
    }

    #[test]
    fn certificate_verifies_against_its_inputs() {
        let doc = b"final";
        let sigs = vec![record("Jane Doe", "jane@example.com")];
        let cert = CompletionCertificate {
            contract_id: Uuid::new_v4(),
            completed_at: Utc::now(),
            recipients: vec![],
            audit_trail: vec![],
            security_hash: compute_security_hash(doc, &sigs),
        };
        assert!(cert.verify(doc, &sigs));
        assert!(!cert.verify(b"other", &sigs));
    }
}
