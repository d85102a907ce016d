use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use uuid::Uuid;

use signet_core::models::RecipientRole;
use signet_service::contracts::{CreateContractParams, RecipientInput};
use signet_service::ContractService;

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Contract title
    #[arg(long)]
    pub title: String,

    /// Path to the PDF document
    #[arg(long)]
    pub document: PathBuf,

    /// Owning user id
    #[arg(long)]
    pub owner: Uuid,

    /// Signer, as "Name <email>". Repeat for multiple signers;
    /// signing order follows the argument order.
    #[arg(long = "signer")]
    pub signers: Vec<String>,

    /// Read-only recipient, as "Name <email>"
    #[arg(long = "viewer")]
    pub viewers: Vec<String>,

    /// Days until the contract expires
    #[arg(long)]
    pub expires_days: Option<i64>,
}

pub async fn execute(service: ContractService, args: CreateArgs) -> Result<()> {
    println!("📄 Creating Contract: {}", args.title);

    let document = std::fs::read(&args.document)
        .with_context(|| format!("reading {}", args.document.display()))?;

    let mut recipients = Vec::new();
    for spec in &args.signers {
        recipients.push(parse_recipient(spec, RecipientRole::Signer)?);
    }
    for spec in &args.viewers {
        recipients.push(parse_recipient(spec, RecipientRole::Viewer)?);
    }

    let contract = service
        .create_contract(CreateContractParams {
            title: args.title,
            owner_id: args.owner,
            creator_id: None,
            document,
            template_id: None,
            expires_in_days: args.expires_days,
            recipients,
            fields: None,
        })
        .await?;

    println!("✅ Contract created as draft.");
    println!("🔑 Contract ID: {}", contract.id);
    println!("🔗 Share Token: {}", contract.share_token);
    if let Some(expires_at) = contract.expires_at {
        println!("⏳ Expires:     {}", expires_at.format("%Y-%m-%d"));
    }
    println!("📝 Next: 'signet send --contract {}' to dispatch it.", contract.id);

    Ok(())
}

/// Accepts "Name <email>" or a bare email address.
fn parse_recipient(spec: &str, role: RecipientRole) -> Result<RecipientInput> {
    let spec = spec.trim();
    let (name, email) = match (spec.find('<'), spec.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            (spec[..open].trim(), spec[open + 1..close].trim())
        }
        (None, None) => (spec, spec),
        _ => bail!("malformed recipient (expected \"Name <email>\"): {spec}"),
    };
    if email.is_empty() || !email.contains('@') {
        bail!("recipient has no usable email address: {spec}");
    }
    Ok(RecipientInput {
        name: name.to_string(),
        email: email.to_string(),
        role,
        signing_order: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_email() {
        let r = parse_recipient("Alice Chen <alice@example.com>", RecipientRole::Signer).unwrap();
        assert_eq!(r.name, "Alice Chen");
        assert_eq!(r.email, "alice@example.com");
    }

    #[test]
    fn bare_email_doubles_as_name() {
        let r = parse_recipient("bob@example.com", RecipientRole::Viewer).unwrap();
        assert_eq!(r.name, "bob@example.com");
        assert_eq!(r.email, "bob@example.com");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_recipient("Alice Chen <", RecipientRole::Signer).is_err());
        assert!(parse_recipient("no-at-sign", RecipientRole::Signer).is_err());
    }
}
