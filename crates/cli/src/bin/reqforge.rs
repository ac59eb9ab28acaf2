use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    reqforge_cli::main_entry().await
}
