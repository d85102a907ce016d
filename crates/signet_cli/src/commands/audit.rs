use anyhow::Result;
use clap::Args;
use uuid::Uuid;

use signet_service::ContractService;

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Contract id
    #[arg(long)]
    pub contract: Uuid,
}

pub async fn execute(service: ContractService, args: AuditArgs) -> Result<()> {
    let entries = service.audit_trail(args.contract).await?;
    if entries.is_empty() {
        println!("No audit entries for {}", args.contract);
        return Ok(());
    }

    println!("📜 Audit trail for {}:", args.contract);
    for entry in entries {
        let network = entry
            .ip_address
            .as_deref()
            .map(|ip| format!(" from {ip}"))
            .unwrap_or_default();
        println!(
            "   {} {:<10} {}{}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.action.as_str(),
            serde_json::to_string(&entry.detail)?,
            network,
        );
    }
    Ok(())
}
