//! Embedded schema, applied in a single transaction. The DDL lives next to
//! the repository code so the store and its tables change together.

use sqlx::{Executor, PgPool};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contracts (
    id                      UUID PRIMARY KEY,
    title                   TEXT NOT NULL,
    status                  TEXT NOT NULL,
    share_token             TEXT NOT NULL UNIQUE,
    document_data           BYTEA NOT NULL,
    signed_document_data    BYTEA,
    completion_certificate  TEXT,
    owner_id                UUID NOT NULL,
    creator_id              UUID,
    expires_at              TIMESTAMPTZ,
    completed_at            TIMESTAMPTZ,
    created_at              TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS contract_recipients (
    id             UUID PRIMARY KEY,
    contract_id    UUID NOT NULL REFERENCES contracts(id),
    name           TEXT NOT NULL,
    email          TEXT NOT NULL,
    role           TEXT NOT NULL,
    signing_order  INTEGER NOT NULL,
    status         TEXT NOT NULL,
    auth_token     TEXT,
    signed_at      TIMESTAMPTZ,
    ip_address     TEXT,
    user_agent     TEXT
);

CREATE INDEX IF NOT EXISTS idx_recipients_contract
    ON contract_recipients (contract_id, signing_order);

CREATE TABLE IF NOT EXISTS contract_fields (
    id            UUID PRIMARY KEY,
    contract_id   UUID NOT NULL REFERENCES contracts(id),
    recipient_id  UUID NOT NULL REFERENCES contract_recipients(id),
    kind          TEXT NOT NULL,
    page          INTEGER NOT NULL,
    x             DOUBLE PRECISION NOT NULL,
    y             DOUBLE PRECISION NOT NULL,
    width         DOUBLE PRECISION NOT NULL,
    height        DOUBLE PRECISION NOT NULL,
    required      BOOLEAN NOT NULL,
    value         TEXT,
    seq           BIGSERIAL
);

CREATE TABLE IF NOT EXISTS contract_templates (
    id             UUID PRIMARY KEY,
    name           TEXT NOT NULL,
    document_data  BYTEA NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS contract_template_fields (
    id            UUID PRIMARY KEY,
    template_id   UUID NOT NULL REFERENCES contract_templates(id),
    signer_index  INTEGER NOT NULL,
    kind          TEXT NOT NULL,
    page          INTEGER NOT NULL,
    x             DOUBLE PRECISION NOT NULL,
    y             DOUBLE PRECISION NOT NULL,
    width         DOUBLE PRECISION NOT NULL,
    height        DOUBLE PRECISION NOT NULL,
    required      BOOLEAN NOT NULL
);

CREATE TABLE IF NOT EXISTS contract_audit_logs (
    id            UUID PRIMARY KEY,
    contract_id   UUID NOT NULL REFERENCES contracts(id),
    recipient_id  UUID,
    action        TEXT NOT NULL,
    detail        TEXT NOT NULL,
    ip_address    TEXT,
    user_agent    TEXT,
    created_at    TIMESTAMPTZ NOT NULL,
    seq           BIGSERIAL
);

CREATE INDEX IF NOT EXISTS idx_audit_contract
    ON contract_audit_logs (contract_id, seq);
"#;

/// Create all tables if they do not exist yet.
pub async fn rebuild_database(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    (&mut *tx).execute(SCHEMA).await?;
    tx.commit().await?;
    Ok(())
}
