/// Loom CLI
///
/// Runs, checks and inspects workflow documents from the command line.

use loom_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
