#[tokio::main]
async fn main() -> std::io::Result<()> {
    race_netcode::run_with_config().await
}
