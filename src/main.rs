#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = pte_core_rust::run().await {
        eprintln!("pte-core-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
