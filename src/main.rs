#[tokio::main]
async fn main() -> anyhow::Result<()> {
    festival_front_lib::run().await
}
