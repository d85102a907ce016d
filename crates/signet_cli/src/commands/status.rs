use anyhow::{bail, Result};
use clap::Args;
use uuid::Uuid;

use signet_core::models::{ContractStatus, RecipientStatus};
use signet_service::ContractService;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Contract id
    #[arg(long)]
    pub contract: Uuid,
}

pub async fn execute(service: ContractService, args: StatusArgs) -> Result<()> {
    let Some(contract) = service.get_contract(args.contract).await? else {
        bail!("contract {} not found", args.contract);
    };
    let recipients = service.recipients(args.contract).await?;

    println!("📄 {}", contract.title);
    println!("   Status:  {} {}", status_icon(contract.status), contract.status.as_str());
    println!("   Created: {}", contract.created_at.format("%Y-%m-%d %H:%M UTC"));
    if let Some(expires_at) = contract.expires_at {
        println!("   Expires: {}", expires_at.format("%Y-%m-%d"));
    }
    if let Some(completed_at) = contract.completed_at {
        println!("   Completed: {}", completed_at.format("%Y-%m-%d %H:%M UTC"));
    }

    println!("👥 Recipients:");
    for r in &recipients {
        let signed = r
            .signed_at
            .map(|at| format!(" at {}", at.format("%Y-%m-%d %H:%M UTC")))
            .unwrap_or_default();
        println!(
            "   {:>2}. {} {} <{}> ({}) {}{}",
            r.signing_order,
            recipient_icon(r.status),
            r.name,
            r.email,
            r.role.as_str(),
            r.status.as_str(),
            signed,
        );
    }

    if let Some(certificate) = &contract.completion_certificate {
        println!("🔏 Security Hash: {}", certificate.security_hash);
    }

    Ok(())
}

fn status_icon(status: ContractStatus) -> &'static str {
    match status {
        ContractStatus::Draft => "📝",
        ContractStatus::Sent => "📨",
        ContractStatus::PartiallySigned => "✍️ ",
        ContractStatus::Completed => "✅",
    }
}

fn recipient_icon(status: RecipientStatus) -> &'static str {
    match status {
        RecipientStatus::Pending => "⏳",
        RecipientStatus::Sent => "📨",
        RecipientStatus::Signed => "✅",
    }
}
