use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use signet_service::ContractService;

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Contract id
    #[arg(long)]
    pub contract: Uuid,

    /// Contract share token
    #[arg(long)]
    pub token: String,

    /// Output path for the signed PDF
    #[arg(long, default_value = "signed.pdf")]
    pub output: PathBuf,
}

pub async fn execute(service: ContractService, args: DownloadArgs) -> Result<()> {
    println!("📥 Downloading signed document for {}...", args.contract);

    let download = service
        .download_signed(args.contract, &args.token, None, Some("signet-cli".to_string()))
        .await?;

    std::fs::write(&args.output, &download.document)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "✅ Wrote \"{}\" ({} bytes) to {}",
        download.title,
        download.document.len(),
        args.output.display()
    );
    Ok(())
}
