use bidcache::core::CoreApp;

#[tokio::main]
async fn main() {
    if let Err(e) = CoreApp::run().await {
        eprintln!("\nError: {e:#}\n");
        std::process::exit(1);
    }
}
