//! Postgres-backed store. Runtime-bound queries throughout; the completion
//! compare-and-swap is a conditional UPDATE checked via rows_affected.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use signet_core::certificate::CompletionCertificate;
use signet_core::models::{
    AuditAction, AuditLogEntry, Contract, ContractStatus, Field, FieldKind, Recipient,
    RecipientRole, RecipientStatus, Template, TemplateField,
};

use crate::error::{Result, StoreError};
use crate::ContractStore;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn corrupt(what: &str, value: &str) -> StoreError {
    StoreError::Corrupt(format!("unrecognized {what}: {value}"))
}

fn contract_from_row(row: &PgRow) -> Result<Contract> {
    let status_text: String = row.try_get("status").map_err(db_err)?;
    let status = ContractStatus::parse(&status_text)
        .ok_or_else(|| corrupt("contract status", &status_text))?;

    let certificate_text: Option<String> =
        row.try_get("completion_certificate").map_err(db_err)?;
    let completion_certificate = match certificate_text {
        Some(text) => Some(
            serde_json::from_str::<CompletionCertificate>(&text)
                .map_err(|e| StoreError::Corrupt(format!("completion certificate: {e}")))?,
        ),
        None => None,
    };

    Ok(Contract {
        id: row.try_get("id").map_err(db_err)?,
        title: row.try_get("title").map_err(db_err)?,
        status,
        share_token: row.try_get("share_token").map_err(db_err)?,
        document_data: row.try_get("document_data").map_err(db_err)?,
        signed_document_data: row.try_get("signed_document_data").map_err(db_err)?,
        completion_certificate,
        owner_id: row.try_get("owner_id").map_err(db_err)?,
        creator_id: row.try_get("creator_id").map_err(db_err)?,
        expires_at: row.try_get("expires_at").map_err(db_err)?,
        completed_at: row.try_get("completed_at").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn recipient_from_row(row: &PgRow) -> Result<Recipient> {
    let role_text: String = row.try_get("role").map_err(db_err)?;
    let status_text: String = row.try_get("status").map_err(db_err)?;
    Ok(Recipient {
        id: row.try_get("id").map_err(db_err)?,
        contract_id: row.try_get("contract_id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        role: RecipientRole::parse(&role_text).ok_or_else(|| corrupt("role", &role_text))?,
        signing_order: row.try_get("signing_order").map_err(db_err)?,
        status: RecipientStatus::parse(&status_text)
            .ok_or_else(|| corrupt("recipient status", &status_text))?,
        auth_token: row.try_get("auth_token").map_err(db_err)?,
        signed_at: row.try_get("signed_at").map_err(db_err)?,
        ip_address: row.try_get("ip_address").map_err(db_err)?,
        user_agent: row.try_get("user_agent").map_err(db_err)?,
    })
}

fn field_from_row(row: &PgRow) -> Result<Field> {
    let kind_text: String = row.try_get("kind").map_err(db_err)?;
    let page: i32 = row.try_get("page").map_err(db_err)?;
    Ok(Field {
        id: row.try_get("id").map_err(db_err)?,
        contract_id: row.try_get("contract_id").map_err(db_err)?,
        recipient_id: row.try_get("recipient_id").map_err(db_err)?,
        kind: FieldKind::parse(&kind_text).ok_or_else(|| corrupt("field kind", &kind_text))?,
        page: page as u32,
        x: row.try_get("x").map_err(db_err)?,
        y: row.try_get("y").map_err(db_err)?,
        width: row.try_get("width").map_err(db_err)?,
        height: row.try_get("height").map_err(db_err)?,
        required: row.try_get("required").map_err(db_err)?,
        value: row.try_get("value").map_err(db_err)?,
    })
}

fn audit_from_row(row: &PgRow) -> Result<AuditLogEntry> {
    let action_text: String = row.try_get("action").map_err(db_err)?;
    let detail_text: String = row.try_get("detail").map_err(db_err)?;
    Ok(AuditLogEntry {
        id: row.try_get("id").map_err(db_err)?,
        contract_id: row.try_get("contract_id").map_err(db_err)?,
        recipient_id: row.try_get("recipient_id").map_err(db_err)?,
        action: AuditAction::parse(&action_text)
            .ok_or_else(|| corrupt("audit action", &action_text))?,
        detail: serde_json::from_str(&detail_text)
            .map_err(|e| StoreError::Corrupt(format!("audit detail: {e}")))?,
        ip_address: row.try_get("ip_address").map_err(db_err)?,
        user_agent: row.try_get("user_agent").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

#[async_trait]
impl ContractStore for PgStore {
    async fn insert_contract(
        &self,
        contract: &Contract,
        recipients: &[Recipient],
        fields: &[Field],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO contracts
            (id, title, status, share_token, document_data, owner_id, creator_id,
             expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(contract.id)
        .bind(&contract.title)
        .bind(contract.status.as_str())
        .bind(&contract.share_token)
        .bind(&contract.document_data)
        .bind(contract.owner_id)
        .bind(contract.creator_id)
        .bind(contract.expires_at)
        .bind(contract.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for r in recipients {
            sqlx::query(
                r#"
                INSERT INTO contract_recipients
                (id, contract_id, name, email, role, signing_order, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(r.id)
            .bind(r.contract_id)
            .bind(&r.name)
            .bind(&r.email)
            .bind(r.role.as_str())
            .bind(r.signing_order)
            .bind(r.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        for f in fields {
            sqlx::query(
                r#"
                INSERT INTO contract_fields
                (id, contract_id, recipient_id, kind, page, x, y, width, height, required)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(f.id)
            .bind(f.contract_id)
            .bind(f.recipient_id)
            .bind(f.kind.as_str())
            .bind(f.page as i32)
            .bind(f.x)
            .bind(f.y)
            .bind(f.width)
            .bind(f.height)
            .bind(f.required)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn fetch_contract(&self, id: Uuid) -> Result<Option<Contract>> {
        let row = sqlx::query("SELECT * FROM contracts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(contract_from_row).transpose()
    }

    async fn fetch_contract_by_share_token(
        &self,
        id: Uuid,
        share_token: &str,
    ) -> Result<Option<Contract>> {
        let row = sqlx::query("SELECT * FROM contracts WHERE id = $1 AND share_token = $2")
            .bind(id)
            .bind(share_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(contract_from_row).transpose()
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: ContractStatus,
        to: ContractStatus,
    ) -> Result<bool> {
        // The guard on the current status keeps stale writers out: zero rows
        // means the contract already left `from`.
        let result = sqlx::query("UPDATE contracts SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_recipients(&self, contract_id: Uuid) -> Result<Vec<Recipient>> {
        let rows = sqlx::query(
            "SELECT * FROM contract_recipients WHERE contract_id = $1 ORDER BY signing_order",
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(recipient_from_row).collect()
    }

    async fn find_recipient_by_token(
        &self,
        contract_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Recipient>> {
        let row = sqlx::query(
            "SELECT * FROM contract_recipients WHERE contract_id = $1 AND auth_token = $2",
        )
        .bind(contract_id)
        .bind(auth_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(recipient_from_row).transpose()
    }

    async fn mark_recipient_sent(&self, recipient_id: Uuid, auth_token: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE contract_recipients SET auth_token = $2, status = 'sent' WHERE id = $1",
        )
        .bind(recipient_id)
        .bind(auth_token)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("recipient {recipient_id}")));
        }
        Ok(())
    }

    async fn mark_recipient_signed(
        &self,
        recipient_id: Uuid,
        signed_at: DateTime<Utc>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE contract_recipients
            SET status = 'signed', signed_at = $2, ip_address = $3, user_agent = $4
            WHERE id = $1
            "#,
        )
        .bind(recipient_id)
        .bind(signed_at)
        .bind(ip_address)
        .bind(user_agent)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("recipient {recipient_id}")));
        }
        Ok(())
    }

    async fn list_fields(&self, contract_id: Uuid) -> Result<Vec<Field>> {
        let rows =
            sqlx::query("SELECT * FROM contract_fields WHERE contract_id = $1 ORDER BY seq")
                .bind(contract_id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.iter().map(field_from_row).collect()
    }

    async fn set_field_value(
        &self,
        contract_id: Uuid,
        field_id: Uuid,
        recipient_id: Uuid,
        value: &str,
    ) -> Result<()> {
        // Ownership is enforced in the WHERE clause: a field bound to another
        // recipient simply matches zero rows.
        let result = sqlx::query(
            r#"
            UPDATE contract_fields
            SET value = $4
            WHERE id = $2 AND contract_id = $1 AND recipient_id = $3
            "#,
        )
        .bind(contract_id)
        .bind(field_id)
        .bind(recipient_id)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "field {field_id} for recipient {recipient_id}"
            )));
        }
        Ok(())
    }

    async fn complete_contract(
        &self,
        id: Uuid,
        signed_document: &[u8],
        certificate: &CompletionCertificate,
        completed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let certificate_text = serde_json::to_string(certificate)
            .map_err(|e| StoreError::Corrupt(format!("completion certificate: {e}")))?;

        // The CAS: zero rows updated means a concurrent submission already
        // completed this contract.
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET status = 'completed',
                signed_document_data = $2,
                completion_certificate = $3,
                completed_at = $4
            WHERE id = $1 AND status <> 'completed'
            "#,
        )
        .bind(id)
        .bind(signed_document)
        .bind(certificate_text)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn append_audit(&self, entry: &AuditLogEntry) -> Result<()> {
        let detail_text = serde_json::to_string(&entry.detail)
            .map_err(|e| StoreError::Corrupt(format!("audit detail: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO contract_audit_logs
            (id, contract_id, recipient_id, action, detail, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.contract_id)
        .bind(entry.recipient_id)
        .bind(entry.action.as_str())
        .bind(detail_text)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_audit(&self, contract_id: Uuid) -> Result<Vec<AuditLogEntry>> {
        let rows =
            sqlx::query("SELECT * FROM contract_audit_logs WHERE contract_id = $1 ORDER BY seq")
                .bind(contract_id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.iter().map(audit_from_row).collect()
    }

    async fn insert_template(&self, template: &Template, fields: &[TemplateField]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO contract_templates (id, name, document_data, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(template.id)
        .bind(&template.name)
        .bind(&template.document_data)
        .bind(template.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for f in fields {
            sqlx::query(
                r#"
                INSERT INTO contract_template_fields
                (id, template_id, signer_index, kind, page, x, y, width, height, required)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(f.id)
            .bind(f.template_id)
            .bind(f.signer_index as i32)
            .bind(f.kind.as_str())
            .bind(f.page as i32)
            .bind(f.x)
            .bind(f.y)
            .bind(f.width)
            .bind(f.height)
            .bind(f.required)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn fetch_template(&self, id: Uuid) -> Result<Option<(Template, Vec<TemplateField>)>> {
        let row = sqlx::query("SELECT * FROM contract_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let template = Template {
            id: row.try_get("id").map_err(db_err)?,
            name: row.try_get("name").map_err(db_err)?,
            document_data: row.try_get("document_data").map_err(db_err)?,
            created_at: row.try_get("created_at").map_err(db_err)?,
        };

        let field_rows =
            sqlx::query("SELECT * FROM contract_template_fields WHERE template_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        let fields = field_rows
            .iter()
            .map(|row| {
                let kind_text: String = row.try_get("kind").map_err(db_err)?;
                let signer_index: i32 = row.try_get("signer_index").map_err(db_err)?;
                let page: i32 = row.try_get("page").map_err(db_err)?;
                Ok(TemplateField {
                    id: row.try_get("id").map_err(db_err)?,
                    template_id: row.try_get("template_id").map_err(db_err)?,
                    signer_index: signer_index as u32,
                    kind: FieldKind::parse(&kind_text)
                        .ok_or_else(|| corrupt("field kind", &kind_text))?,
                    page: page as u32,
                    x: row.try_get("x").map_err(db_err)?,
                    y: row.try_get("y").map_err(db_err)?,
                    width: row.try_get("width").map_err(db_err)?,
                    height: row.try_get("height").map_err(db_err)?,
                    required: row.try_get("required").map_err(db_err)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some((template, fields)))
    }
}
