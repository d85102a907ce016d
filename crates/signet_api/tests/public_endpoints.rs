//! Endpoint tests over the in-memory store, driven through the router with
//! tower's oneshot so no socket is involved.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use signet_api::routes::app_router;
use signet_api::AppState;
use signet_core::models::RecipientRole;
use signet_core::stamp::test_support::minimal_pdf;
use signet_db::{ContractStore, MemoryStore};
use signet_service::contracts::{CreateContractParams, RecipientInput};
use signet_service::notify::RecordingSender;
use signet_service::ContractService;

struct Harness {
    app: Router,
    service: ContractService,
    store: Arc<MemoryStore>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let service = ContractService::new(
        store.clone(),
        Arc::new(RecordingSender::new()),
        "https://app.example.test",
    );
    let app = app_router(AppState {
        service: service.clone(),
    });
    Harness {
        app,
        service,
        store,
    }
}

/// Creates and sends a single-signer contract, returning
/// (contract id, share token, recipient id, auth token, field id).
async fn sent_contract(h: &Harness) -> (Uuid, String, Uuid, String, Uuid) {
    let owner_id = Uuid::new_v4();
    let contract = h
        .service
        .create_contract(CreateContractParams {
            title: "API Test Agreement".to_string(),
            owner_id,
            creator_id: None,
            document: minimal_pdf(1),
            template_id: None,
            expires_in_days: None,
            recipients: vec![RecipientInput {
                name: "Alice Chen".to_string(),
                email: "alice@example.com".to_string(),
                role: RecipientRole::Signer,
                signing_order: None,
            }],
            fields: None,
        })
        .await
        .unwrap();
    h.service.send_contract(contract.id, owner_id).await.unwrap();

    let recipient = h.store.list_recipients(contract.id).await.unwrap().remove(0);
    let field = h.store.list_fields(contract.id).await.unwrap().remove(0);
    (
        contract.id,
        contract.share_token,
        recipient.id,
        recipient.auth_token.unwrap(),
        field.id,
    )
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_answers() {
    let h = harness();
    let response = h
        .app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn signing_session_requires_the_exact_token() {
    let h = harness();
    let (contract_id, _, recipient_id, token, _) = sent_contract(&h).await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::get(format!("/public/contracts/sign/{contract_id}?token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = body_json(response).await;
    assert_eq!(session["recipient_id"], json!(recipient_id));
    assert_eq!(session["recipient_email"], json!("alice@example.com"));
    assert_eq!(session["fields"].as_array().unwrap().len(), 1);

    let response = h
        .app
        .oneshot(
            Request::get(format!("/public/contracts/sign/{contract_id}?token=wrong"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submission_completes_a_single_signer_contract() {
    let h = harness();
    let (contract_id, _, recipient_id, token, field_id) = sent_contract(&h).await;

    let body = json!({
        "recipient_id": recipient_id,
        "token": token,
        "values": [{ "field_id": field_id, "value": "Alice Chen" }],
    });
    let response = h
        .app
        .clone()
        .oneshot(
            Request::post(format!("/public/contracts/sign/{contract_id}"))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::USER_AGENT, "endpoint-test")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], json!("completed"));

    // The forwarded address and agent made it into the recipient record.
    let recipient = h.store.list_recipients(contract_id).await.unwrap().remove(0);
    assert_eq!(recipient.ip_address.as_deref(), Some("203.0.113.9"));
    assert_eq!(recipient.user_agent.as_deref(), Some("endpoint-test"));

    // A second submission is a conflict, not a repeat.
    let body = json!({
        "recipient_id": recipient_id,
        "token": recipient.auth_token,
        "values": [],
    });
    let response = h
        .app
        .oneshot(
            Request::post(format!("/public/contracts/sign/{contract_id}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn download_serves_the_signed_pdf_only_after_completion() {
    let h = harness();
    let (contract_id, share_token, recipient_id, token, field_id) = sent_contract(&h).await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::get(format!(
                "/public/contracts/download/{contract_id}?token={share_token}"
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = json!({
        "recipient_id": recipient_id,
        "token": token,
        "values": [{ "field_id": field_id, "value": "Alice Chen" }],
    });
    h.app
        .clone()
        .oneshot(
            Request::post(format!("/public/contracts/sign/{contract_id}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = h
        .app
        .clone()
        .oneshot(
            Request::get(format!(
                "/public/contracts/download/{contract_id}?token={share_token}"
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.starts_with(b"%PDF"));

    // The wrong share token is indistinguishable from a missing contract.
    let response = h
        .app
        .oneshot(
            Request::get(format!(
                "/public/contracts/download/{contract_id}?token=wrong"
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
