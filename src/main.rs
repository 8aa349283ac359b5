#[tokio::main]
async fn main() {
    if let Err(e) = vibe_orchestrator_lib::run().await {
        eprintln!("vibe-orchestrator: {}", e);
        std::process::exit(1);
    }
}
