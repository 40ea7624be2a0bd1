#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = gradepoint::run().await {
        eprintln!("gradepoint fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
