//! Renders recorded field values onto the contract PDF.
//!
//! Every field is drawn at its own stored page and normalized geometry,
//! scaled against that page's MediaBox. Coordinates are stored as fractions
//! from the top-left corner; PDF user space runs from the bottom-left, so the
//! y axis is flipped here.

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Field, FieldKind, Recipient};

/// Font resource key registered on every stamped page.
const FONT_KEY: &str = "Sg1";

#[derive(Debug, Error)]
pub enum StampError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("field targets page {page}, which the document does not have")]
    PageOutOfRange { page: u32 },

    #[error("field is bound to unknown recipient {0}")]
    UnknownRecipient(Uuid),
}

/// Document-level metadata written after all fields are stamped.
#[derive(Debug, Clone)]
pub struct DocumentStampMeta {
    pub title: String,
    pub contract_id: Uuid,
    pub signed_at: DateTime<Utc>,
    pub signer_count: usize,
}

/// Stamp all recorded field values onto `original` and return the new bytes.
///
/// The input payload is never modified; callers store the returned bytes as
/// the signed document exactly once.
pub fn stamp_document(
    original: &[u8],
    fields: &[Field],
    signers_by_id: &HashMap<Uuid, Recipient>,
    meta: &DocumentStampMeta,
) -> Result<Vec<u8>, StampError> {
    let mut doc = Document::load_mem(original)?;
    let pages = doc.get_pages();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    // Group fields per page so each page gets a single appended content stream.
    let mut per_page: BTreeMap<u32, Vec<&Field>> = BTreeMap::new();
    for field in fields {
        per_page.entry(field.page).or_default().push(field);
    }

    for (page_no, page_fields) in per_page {
        let page_id = *pages
            .get(&page_no)
            .ok_or(StampError::PageOutOfRange { page: page_no })?;
        let (page_w, page_h) = page_size(&doc, page_id);

        let mut ops = Vec::new();
        for field in page_fields {
            let signer = signers_by_id
                .get(&field.recipient_id)
                .ok_or(StampError::UnknownRecipient(field.recipient_id))?;
            ops.extend(field_operations(field, signer, meta.signed_at, page_w, page_h));
        }
        if ops.is_empty() {
            continue;
        }

        ensure_page_font(&mut doc, page_id, font_id)?;
        append_content(&mut doc, page_id, ops)?;
    }

    set_document_metadata(&mut doc, meta);

    let mut out = Cursor::new(Vec::new());
    doc.save_to(&mut out)?;
    Ok(out.into_inner())
}

/// Uppercased first letter of each whitespace-separated name token.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

fn field_operations(
    field: &Field,
    signer: &Recipient,
    signed_at: DateTime<Utc>,
    page_w: f64,
    page_h: f64,
) -> Vec<Operation> {
    // Box in PDF user space. Degenerate geometry gets a small floor so the
    // render stays visible.
    let bx = field.x * page_w;
    let bw = (field.width * page_w).max(4.0);
    let bh = (field.height * page_h).max(8.0);
    let b_top = page_h - field.y * page_h;
    let b_bottom = b_top - bh;

    let mut ops = Vec::new();
    match field.kind {
        FieldKind::Signature => {
            let text = field.value.as_deref().unwrap_or(&signer.name);
            text_ops(&mut ops, text, bx + 2.0, b_bottom + bh * 0.45, 14.0);
            // Underline across the field width.
            ops.push(Operation::new(
                "m",
                vec![real(bx), real(b_bottom + bh * 0.32)],
            ));
            ops.push(Operation::new(
                "l",
                vec![real(bx + bw), real(b_bottom + bh * 0.32)],
            ));
            ops.push(Operation::new("S", vec![]));
            let caption = format!("Signed on: {}", signed_at.format("%Y-%m-%d"));
            text_ops(&mut ops, &caption, bx + 2.0, b_bottom + bh * 0.08, 7.0);
        }
        FieldKind::Date | FieldKind::Text => {
            if let Some(value) = field.value.as_deref() {
                text_ops(&mut ops, value, bx + 2.0, b_bottom + bh * 0.3, 11.0);
            }
        }
        FieldKind::Checkbox => {
            let side = bw.min(bh);
            ops.push(Operation::new(
                "re",
                vec![real(bx), real(b_bottom), real(side), real(side)],
            ));
            ops.push(Operation::new("S", vec![]));
            if is_checked(field.value.as_deref()) {
                ops.push(Operation::new(
                    "m",
                    vec![real(bx + side * 0.2), real(b_bottom + side * 0.5)],
                ));
                ops.push(Operation::new(
                    "l",
                    vec![real(bx + side * 0.42), real(b_bottom + side * 0.25)],
                ));
                ops.push(Operation::new(
                    "l",
                    vec![real(bx + side * 0.8), real(b_bottom + side * 0.72)],
                ));
                ops.push(Operation::new("S", vec![]));
            }
        }
        FieldKind::Initial => {
            let derived;
            let text = match field.value.as_deref() {
                Some(v) if !v.trim().is_empty() => v,
                _ => {
                    derived = initials(&signer.name);
                    &derived
                }
            };
            text_ops(&mut ops, text, bx + 2.0, b_bottom + bh * 0.3, 12.0);
        }
    }
    ops
}

fn is_checked(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true") | Some("checked")
    )
}

fn text_ops(ops: &mut Vec<Operation>, text: &str, x: f64, y: f64, size: f64) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![FONT_KEY.into(), real(size)]));
    ops.push(Operation::new("Td", vec![real(x), real(y)]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    ops.push(Operation::new("ET", vec![]));
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// MediaBox may live on the page or be inherited from the Pages tree.
/// Falls back to US Letter if neither carries one.
fn page_size(doc: &Document, page_id: ObjectId) -> (f64, f64) {
    let mut current = page_id;
    for _ in 0..8 {
        let Ok(dict) = doc.get_dictionary(current) else {
            break;
        };
        if let Ok(media_box) = dict.get(b"MediaBox") {
            if let Ok(arr) = media_box.as_array() {
                let nums: Vec<f64> = arr.iter().filter_map(as_number).collect();
                if nums.len() == 4 {
                    return (nums[2] - nums[0], nums[3] - nums[1]);
                }
            }
        }
        match dict.get(b"Parent").and_then(|p| p.as_reference()) {
            Ok(parent) => current = parent,
            Err(_) => break,
        }
    }
    (612.0, 792.0)
}

fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Register the stamping font on the page's Resources dictionary. Resources
/// and its Font entry may each be direct, referenced, or missing; the result
/// is inlined on the page so a shared dictionary is never mutated.
fn ensure_page_font(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<(), StampError> {
    let mut resources: Dictionary = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(rid)) => doc.get_dictionary(*rid)?.clone(),
            Ok(Object::Dictionary(d)) => d.clone(),
            _ => Dictionary::new(),
        }
    };
    let mut fonts: Dictionary = match resources.get(b"Font") {
        Ok(Object::Reference(rid)) => doc.get_dictionary(*rid)?.clone(),
        Ok(Object::Dictionary(d)) => d.clone(),
        _ => Dictionary::new(),
    };
    fonts.set(FONT_KEY, font_id);
    resources.set("Font", fonts);
    doc.get_dictionary_mut(page_id)?.set("Resources", resources);
    Ok(())
}

/// Append an extra content stream to the page, preserving existing content.
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    ops: Vec<Operation>,
) -> Result<(), StampError> {
    let encoded = Content { operations: ops }.encode()?;
    let stream_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    let new_ref: Object = stream_id.into();

    let existing = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();
    let contents = match existing {
        Some(Object::Array(mut arr)) => {
            arr.push(new_ref);
            Object::Array(arr)
        }
        Some(reference @ Object::Reference(_)) => Object::Array(vec![reference, new_ref]),
        Some(other) => {
            let kept = doc.add_object(other);
            Object::Array(vec![kept.into(), new_ref])
        }
        None => new_ref,
    };
    doc.get_dictionary_mut(page_id)?.set("Contents", contents);
    Ok(())
}

fn set_document_metadata(doc: &mut Document, meta: &DocumentStampMeta) {
    let info = dictionary! {
        "Title" => Object::string_literal(meta.title.as_str()),
        "Producer" => Object::string_literal("Signet Forge"),
        "Creator" => Object::string_literal("Signet Forge Contract Engine"),
        "CreationDate" => Object::string_literal(pdf_date(meta.signed_at)),
        "ModDate" => Object::string_literal(pdf_date(meta.signed_at)),
        "Keywords" => Object::string_literal(format!(
            "contract:{} signed:{} signers:{}",
            meta.contract_id,
            meta.signed_at.to_rfc3339(),
            meta.signer_count,
        )),
    };
    let info_id = doc.add_object(Object::Dictionary(info));
    doc.trailer.set("Info", info_id);
}

fn pdf_date(t: DateTime<Utc>) -> String {
    format!("D:{}Z", t.format("%Y%m%d%H%M%S"))
}

/// Fixture builders shared by unit and integration tests.
pub mod test_support {
    use lopdf::content::Content;
    use lopdf::{dictionary, Document, Object, Stream};
    use std::io::Cursor;

    /// A well-formed empty PDF with `pages` US Letter pages.
    pub fn minimal_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids: Vec<Object> = Vec::new();
        for _ in 0..pages {
            let content = Content { operations: vec![] };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Cursor::new(Vec::new());
        doc.save_to(&mut buf).expect("minimal PDF serializes");
        buf.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecipientRole, RecipientStatus};

    fn signer(name: &str) -> Recipient {
        Recipient {
            id: Uuid::new_v4(),
            contract_id: Uuid::new_v4(),
            name: name.to_string(),
            email: "signer@example.com".to_string(),
            role: RecipientRole::Signer,
            signing_order: 1,
            status: RecipientStatus::Signed,
            auth_token: None,
            signed_at: Some(Utc::now()),
            ip_address: None,
            user_agent: None,
        }
    }

    fn field(kind: FieldKind, value: Option<&str>) -> Field {
        Field {
            id: Uuid::new_v4(),
            contract_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            kind,
            page: 1,
            x: 0.1,
            y: 0.5,
            width: 0.3,
            height: 0.05,
            required: true,
            value: value.map(String::from),
        }
    }

    #[test]
    fn initials_take_first_letter_of_each_token() {
        assert_eq!(initials("Jane Doe"), "JD");
        assert_eq!(initials("maria de la cruz"), "MDLC");
        assert_eq!(initials("  Solo  "), "S");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn checked_checkbox_draws_a_mark_and_unchecked_does_not() {
        let s = signer("Jane Doe");
        let checked = field_operations(
            &field(FieldKind::Checkbox, Some("true")),
            &s,
            Utc::now(),
            612.0,
            792.0,
        );
        let unchecked = field_operations(
            &field(FieldKind::Checkbox, Some("false")),
            &s,
            Utc::now(),
            612.0,
            792.0,
        );
        // Both draw the box; only the checked one adds the mark strokes.
        assert!(checked.len() > unchecked.len());
        let line_ops = |ops: &[Operation]| ops.iter().filter(|o| o.operator == "l").count();
        assert_eq!(line_ops(&checked), 2);
        assert_eq!(line_ops(&unchecked), 0);
    }

    #[test]
    fn checked_accepts_the_checked_spelling() {
        assert!(is_checked(Some("true")));
        assert!(is_checked(Some("checked")));
        assert!(is_checked(Some(" TRUE ")));
        assert!(!is_checked(Some("false")));
        assert!(!is_checked(None));
    }

    #[test]
    fn signature_field_falls_back_to_signer_name() {
        let s = signer("Jane Doe");
        let ops = field_operations(
            &field(FieldKind::Signature, None),
            &s,
            Utc::now(),
            612.0,
            792.0,
        );
        let rendered: Vec<&Object> = ops
            .iter()
            .filter(|o| o.operator == "Tj")
            .flat_map(|o| o.operands.iter())
            .collect();
        assert!(rendered.iter().any(|obj| match obj {
            Object::String(bytes, _) => bytes[..] == b"Jane Doe"[..],
            _ => false,
        }));
    }

    #[test]
    fn initial_field_derives_from_name_when_empty() {
        let s = signer("Jane Q Doe");
        let ops = field_operations(
            &field(FieldKind::Initial, None),
            &s,
            Utc::now(),
            612.0,
            792.0,
        );
        assert!(ops.iter().any(|o| {
            o.operator == "Tj"
                && o.operands
                    .iter()
                    .any(|obj| matches!(obj, Object::String(b, _) if b[..] == b"JQD"[..]))
        }));
    }
}
