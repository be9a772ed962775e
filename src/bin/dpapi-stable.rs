//! dpapi-stable - check that previously protected values still decrypt
//!
//! The first run writes a fixture next to the working directory; later runs
//! (for example after a reboot) decrypt it and compare.

use clap::Parser;
use std::path::PathBuf;
use std::process;

use dpapi::{Protector, Result, stable};

#[derive(Parser)]
#[command(name = "dpapi-stable")]
#[command(version)]
#[command(about = "Verify that DPAPI-protected values survive across runs.", long_about = None)]
struct Cli {
    /// Fixture file to use instead of DOMAIN.HOST.USER.stable.json in the current directory
    #[arg(long, value_name = "FILE")]
    file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e.display_chain());
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let path = match cli.file {
        Some(path) => path,
        None => {
            let cwd = std::env::current_dir().map_err(|e| {
                dpapi::DpapiError::with_source(
                    dpapi::ErrorCategory::Internal,
                    dpapi::ErrorKind::Io,
                    "failed to determine working directory",
                    e,
                )
            })?;
            stable::default_fixture_path(&cwd)?
        }
    };
    stable::run(&Protector::system(), &path, &mut std::io::stdout().lock())
}
