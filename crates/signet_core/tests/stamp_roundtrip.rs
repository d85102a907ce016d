use std::collections::HashMap;

use chrono::Utc;
use lopdf::content::Content;
use lopdf::{Document, Object};
use uuid::Uuid;

use signet_core::models::{Field, FieldKind, Recipient, RecipientRole, RecipientStatus};
use signet_core::stamp::test_support::minimal_pdf;
use signet_core::stamp::{stamp_document, DocumentStampMeta, StampError};

fn signer(contract_id: Uuid) -> Recipient {
    Recipient {
        id: Uuid::new_v4(),
        contract_id,
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        role: RecipientRole::Signer,
        signing_order: 1,
        status: RecipientStatus::Signed,
        auth_token: Some("aabbccddeeff00112233445566778899".to_string()),
        signed_at: Some(Utc::now()),
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: Some("integration-test".to_string()),
    }
}

fn field(
    contract_id: Uuid,
    recipient_id: Uuid,
    kind: FieldKind,
    page: u32,
    y: f64,
    value: Option<&str>,
) -> Field {
    Field {
        id: Uuid::new_v4(),
        contract_id,
        recipient_id,
        kind,
        page,
        x: 0.1,
        y,
        width: 0.35,
        height: 0.06,
        required: true,
        value: value.map(String::from),
    }
}

fn meta(contract_id: Uuid) -> DocumentStampMeta {
    DocumentStampMeta {
        title: "Creator Agreement".to_string(),
        contract_id,
        signed_at: Utc::now(),
        signer_count: 1,
    }
}

/// Decode every content stream of every page and collect the rendered text.
fn rendered_text(pdf: &[u8]) -> String {
    let doc = Document::load_mem(pdf).expect("stamped PDF parses");
    let mut collected = String::new();
    for (_, page_id) in doc.get_pages() {
        let data = doc.get_page_content(page_id).expect("page content");
        let content = Content::decode(&data).expect("content decodes");
        for op in content.operations {
            if op.operator == "Tj" {
                for operand in &op.operands {
                    if let Object::String(bytes, _) = operand {
                        collected.push_str(&String::from_utf8_lossy(bytes));
                        collected.push('\n');
                    }
                }
            }
        }
    }
    collected
}

#[test]
fn stamped_values_round_trip_into_page_content() {
    let contract_id = Uuid::new_v4();
    let signer = signer(contract_id);
    let fields = vec![
        field(
            contract_id,
            signer.id,
            FieldKind::Signature,
            1,
            0.2,
            Some("Jane Doe"),
        ),
        field(
            contract_id,
            signer.id,
            FieldKind::Text,
            1,
            0.4,
            Some("Acme Studios LLC"),
        ),
        field(
            contract_id,
            signer.id,
            FieldKind::Date,
            2,
            0.3,
            Some("2026-03-01"),
        ),
    ];
    let mut signers = HashMap::new();
    signers.insert(signer.id, signer.clone());

    let original = minimal_pdf(2);
    let stamped = stamp_document(&original, &fields, &signers, &meta(contract_id)).unwrap();

    let text = rendered_text(&stamped);
    assert!(text.contains("Jane Doe"), "signature value missing: {text}");
    assert!(text.contains("Acme Studios LLC"), "text value missing");
    assert!(text.contains("2026-03-01"), "date value missing");
    assert!(text.contains("Signed on:"), "signature caption missing");
}

#[test]
fn unchecked_checkbox_renders_no_mark_text_and_parses() {
    let contract_id = Uuid::new_v4();
    let signer = signer(contract_id);
    let fields = vec![field(
        contract_id,
        signer.id,
        FieldKind::Checkbox,
        1,
        0.5,
        Some("false"),
    )];
    let mut signers = HashMap::new();
    signers.insert(signer.id, signer.clone());

    let stamped =
        stamp_document(&minimal_pdf(1), &fields, &signers, &meta(contract_id)).unwrap();

    // The output must stay a valid PDF; the box is stroked but no text is drawn.
    let text = rendered_text(&stamped);
    assert!(text.is_empty());
}

#[test]
fn document_metadata_is_written() {
    let contract_id = Uuid::new_v4();
    let signer = signer(contract_id);
    let fields = vec![field(
        contract_id,
        signer.id,
        FieldKind::Signature,
        1,
        0.2,
        Some("Jane Doe"),
    )];
    let mut signers = HashMap::new();
    signers.insert(signer.id, signer.clone());

    let stamped =
        stamp_document(&minimal_pdf(1), &fields, &signers, &meta(contract_id)).unwrap();

    let doc = Document::load_mem(&stamped).unwrap();
    let info_ref = doc.trailer.get(b"Info").expect("Info entry");
    let info = doc
        .get_dictionary(info_ref.as_reference().expect("Info is a reference"))
        .expect("Info dictionary");

    let keywords = info.get(b"Keywords").unwrap().as_str().unwrap();
    let keywords = String::from_utf8_lossy(keywords);
    assert!(keywords.contains(&format!("contract:{contract_id}")));
    assert!(keywords.contains("signers:1"));
}

#[test]
fn field_on_a_missing_page_is_rejected() {
    let contract_id = Uuid::new_v4();
    let signer = signer(contract_id);
    let fields = vec![field(
        contract_id,
        signer.id,
        FieldKind::Signature,
        9,
        0.2,
        Some("Jane Doe"),
    )];
    let mut signers = HashMap::new();
    signers.insert(signer.id, signer.clone());

    let err = stamp_document(&minimal_pdf(1), &fields, &signers, &meta(contract_id)).unwrap_err();
    assert!(matches!(err, StampError::PageOutOfRange { page: 9 }));
}
