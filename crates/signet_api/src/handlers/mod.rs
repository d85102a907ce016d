mod public;

pub use public::{download_signed, get_signing_session, submit_signature};

/// Liveness probe.
pub async fn health_check() -> &'static str {
    "ok"
}
