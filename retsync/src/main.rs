#[tokio::main]
async fn main() {
    let code = retsync::run_cli().await;
    std::process::exit(code);
}
