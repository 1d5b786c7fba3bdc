#[tokio::main]
async fn main() -> anyhow::Result<()> {
    timetrail_lib::run().await
}
