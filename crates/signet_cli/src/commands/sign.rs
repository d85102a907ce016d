use anyhow::{bail, Context, Result};
use clap::Args;
use uuid::Uuid;

use signet_service::contracts::{FieldValue, SignatureOutcome, SubmitSignatureParams};
use signet_service::ContractService;

#[derive(Debug, Args)]
pub struct SignArgs {
    /// Contract id
    #[arg(long)]
    pub contract: Uuid,

    /// Recipient id
    #[arg(long)]
    pub recipient: Uuid,

    /// Auth token from the signing link
    #[arg(long)]
    pub token: String,

    /// Field value, as "<field-uuid>=<value>". Repeatable.
    #[arg(long = "value")]
    pub values: Vec<String>,
}

pub async fn execute(service: ContractService, args: SignArgs) -> Result<()> {
    println!("✍️  Submitting signature for contract {}...", args.contract);

    let values = args
        .values
        .iter()
        .map(|pair| parse_value(pair))
        .collect::<Result<Vec<_>>>()?;

    let outcome = service
        .submit_signature(SubmitSignatureParams {
            contract_id: args.contract,
            recipient_id: args.recipient,
            auth_token: args.token,
            values,
            ip_address: None,
            user_agent: Some("signet-cli".to_string()),
        })
        .await?;

    match outcome {
        SignatureOutcome::PartiallySigned => {
            println!("✅ Signature recorded. Waiting on remaining signers.");
        }
        SignatureOutcome::Completed => {
            println!("🎉 Signature recorded. Contract is now completed.");
        }
    }
    Ok(())
}

fn parse_value(pair: &str) -> Result<FieldValue> {
    let Some((field, value)) = pair.split_once('=') else {
        bail!("malformed field value (expected \"<field-uuid>=<value>\"): {pair}");
    };
    Ok(FieldValue {
        field_id: Uuid::parse_str(field.trim())
            .with_context(|| format!("invalid field id: {field}"))?,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_the_first_equals_only() {
        let id = Uuid::new_v4();
        let parsed = parse_value(&format!("{id}=a=b")).unwrap();
        assert_eq!(parsed.field_id, id);
        assert_eq!(parsed.value, "a=b");
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(parse_value("no-separator").is_err());
    }
}
