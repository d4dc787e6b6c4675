/// Mortar command-line front end
///
/// Runs scripts, evaluates one-liners and checks script completeness.

use mortar_core::cli;

fn main() {
    dotenvy::dotenv().ok();
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
