use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    wallet_sync_service::run().await?;
    Ok(())
}
