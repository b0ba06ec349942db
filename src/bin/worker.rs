#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quizdeck::run_worker().await {
        eprintln!("quizdeck-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
