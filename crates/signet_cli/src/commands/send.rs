use anyhow::Result;
use clap::Args;
use uuid::Uuid;

use signet_service::ContractService;

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Contract id
    #[arg(long)]
    pub contract: Uuid,

    /// Owning user id
    #[arg(long)]
    pub owner: Uuid,
}

pub async fn execute(service: ContractService, args: SendArgs) -> Result<()> {
    println!("📨 Sending Contract {}...", args.contract);
    service.send_contract(args.contract, args.owner).await?;
    println!("✅ Contract sent. Signing invitations dispatched in signing order.");
    Ok(())
}
