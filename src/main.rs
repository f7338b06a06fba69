#[tokio::main]
async fn main() {
    if let Err(e) = carebook_lib::run().await {
        eprintln!("carebook: {e}");
        std::process::exit(1);
    }
}
