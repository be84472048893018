#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    if let Err(e) = pte_core_rust::run_seed(path).await {
        eprintln!("pte-core-seed fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
