pub mod certificate;
pub mod models;
pub mod stamp;
pub mod token;
pub mod validation;

pub use certificate::{compute_security_hash, CompletionCertificate, SignatureRecord};
pub use validation::{validate_pdf, DocumentError, PdfSummary};
