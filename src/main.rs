use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    soulselector_cli::cli::run().await
}
