use anyhow::Result;
use ips_assistant::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
