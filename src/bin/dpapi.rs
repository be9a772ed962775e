//! dpapi CLI - encrypt and decrypt values with the Windows Data Protection API

use clap::{Parser, Subcommand};
use std::process;

use dpapi::protector::plaintext_into_string;
use dpapi::{Protector, Result, Scope, armor};
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "dpapi")]
#[command(version)]
#[command(about = "Encrypt and decrypt values with the Windows Data Protection API.", long_about = None)]
struct Cli {
    /// Additional entropy that must match between encrypt and decrypt
    #[arg(long, global = true, env = "DPAPI_ENTROPY", hide_env_values = true)]
    entropy: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a string and/or hex encoded bytes
    #[command(alias = "e")]
    Encrypt {
        /// Hex string to encrypt
        #[arg(long, value_name = "HEX", default_value = "01020304")]
        hex: String,

        /// String to encrypt
        #[arg(long, value_name = "TEXT", default_value = "test")]
        string: String,

        /// Allow any user on this machine to decrypt
        #[arg(long)]
        machine_local: bool,
    },

    /// Decrypt a base64 encoded blob
    #[command(alias = "d")]
    Decrypt {
        /// Base64 blob to decrypt
        #[arg(long, value_name = "BASE64")]
        base64: String,

        /// Print the plaintext as hex instead of text
        #[arg(long)]
        hex_output: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let protector = Protector::system();
    let entropy = cli.entropy.as_deref().map(str::as_bytes);

    let result = match cli.command {
        Commands::Encrypt {
            hex,
            string,
            machine_local,
        } => {
            let scope = if machine_local {
                Scope::LocalMachine
            } else {
                Scope::CurrentUser
            };
            encrypt(&protector, &hex, &string, scope, entropy)
        }
        Commands::Decrypt { base64, hex_output } => {
            decrypt(&protector, &base64, hex_output, entropy)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e.display_chain());
        process::exit(1);
    }
}

fn encrypt(
    protector: &Protector,
    hex: &str,
    string: &str,
    scope: Scope,
    entropy: Option<&[u8]>,
) -> Result<()> {
    if hex.is_empty() && string.is_empty() {
        println!("usage: dpapi encrypt --hex 01020304 --string test");
        return Ok(());
    }

    // Decode before touching the platform so bad input protects nothing.
    let bytes = armor::from_hex(hex).map_err(|e| e.with_context("invalid --hex value"))?;

    if !string.is_empty() {
        let blob = protector.protect(string.as_bytes(), scope, entropy)?;
        println!("\"{}\" => (string) {}", string, armor::wrap(&blob));
    }

    if !hex.is_empty() {
        let blob = protector.protect(&bytes, scope, entropy)?;
        let digits = armor::strip_hex_prefix(hex);
        println!("0x{} => (hex) 0x{}", digits, armor::to_hex(&blob));
        println!("0x{} => (base64) {}", digits, armor::wrap(&blob));
    }
    Ok(())
}

fn decrypt(
    protector: &Protector,
    base64: &str,
    hex_output: bool,
    entropy: Option<&[u8]>,
) -> Result<()> {
    let blob = armor::unwrap(base64).map_err(|e| e.with_context("invalid --base64 value"))?;
    let plaintext = protector.unprotect(&blob, entropy)?;
    if hex_output {
        let plaintext = Zeroizing::new(plaintext);
        println!("{}", Zeroizing::new(armor::to_hex(&plaintext)).as_str());
    } else {
        let text = Zeroizing::new(plaintext_into_string(plaintext)?);
        println!("{}", text.as_str());
    }
    Ok(())
}
