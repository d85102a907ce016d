//! The token-gated public endpoints: signing session lookup, signature
//! submission, and signed-document download. No user accounts here; the
//! tokens in the links are the whole capability.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use signet_service::contracts::{
    FieldValue, SignatureOutcome, SigningSession, SubmitSignatureParams,
};
use signet_service::ServiceError;

use crate::AppState;

#[derive(Deserialize)]
pub struct TokenQuery {
    token: String,
}

#[derive(Deserialize)]
pub struct SubmitBody {
    recipient_id: Uuid,
    token: String,
    values: Vec<ValueBody>,
}

#[derive(Deserialize)]
pub struct ValueBody {
    field_id: Uuid,
    value: String,
}

pub async fn get_signing_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<SigningSession>, (StatusCode, String)> {
    match state.service.get_signing_link(id, &query.token).await {
        Ok(Some(session)) => Ok(Json(session)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "invalid signing link".to_string())),
        Err(e) => Err(map_error(e)),
    }
}

pub async fn submit_signature(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<SubmitBody>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let (ip_address, user_agent) = client_network(&headers);

    let outcome = state
        .service
        .submit_signature(SubmitSignatureParams {
            contract_id: id,
            recipient_id: body.recipient_id,
            auth_token: body.token,
            values: body
                .values
                .into_iter()
                .map(|v| FieldValue {
                    field_id: v.field_id,
                    value: v.value,
                })
                .collect(),
            ip_address,
            user_agent,
        })
        .await
        .map_err(map_error)?;

    let status = match outcome {
        SignatureOutcome::PartiallySigned => "partially_signed",
        SignatureOutcome::Completed => "completed",
    };
    Ok(Json(json!({ "status": status })))
}

pub async fn download_signed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let (ip_address, user_agent) = client_network(&headers);

    let download = state
        .service
        .download_signed(id, &query.token, ip_address, user_agent)
        .await
        .map_err(map_error)?;

    let filename = download.title.replace(['"', '\\'], "_");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename} (signed).pdf\""),
            ),
        ],
        download.document,
    )
        .into_response())
}

fn map_error(e: ServiceError) -> (StatusCode, String) {
    match e {
        ServiceError::InvalidSigningLink | ServiceError::NotFound(_) => {
            (StatusCode::NOT_FOUND, e.to_string())
        }
        ServiceError::State(_) => (StatusCode::CONFLICT, e.to_string()),
        ServiceError::Validation(_) | ServiceError::Document(_) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        ServiceError::Stamp(_) | ServiceError::Store(_) => {
            tracing::error!("request failed: {e:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

/// Best-effort client metadata for the audit trail. Proxies are expected to
/// set X-Forwarded-For; only the first hop is recorded.
fn client_network(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    (ip, user_agent)
}
