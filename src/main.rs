#[tokio::main]
async fn main() -> std::io::Result<()> {
    platformer_server::run_with_config().await
}
