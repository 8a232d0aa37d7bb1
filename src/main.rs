#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vibeverse_lib::run().await
}
