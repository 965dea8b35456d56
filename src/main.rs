#[tokio::main]
async fn main() -> anyhow::Result<()> {
    receipt_scanner_lib::run().await?;
    Ok(())
}
