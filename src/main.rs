// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `liam-keygen`: generate a P-256 key pair for LIAM API authentication.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use liam_client::config::{
    DEFAULT_PRIVATE_KEY_FILE, DEFAULT_PUBLIC_KEY_FILE, PRIVATE_KEY_PATH_ENV,
};
use liam_client::crypto::generate_key_files;
use liam_client::logging::init_tracing;

/// Generate an ECDSA P-256 key pair for signing LIAM API requests.
#[derive(Parser, Debug)]
#[command(name = "liam-keygen", version, about)]
struct Args {
    /// Where to write the private key (PKCS#8 PEM, mode 0600)
    #[arg(short = 'p', long = "private", default_value = DEFAULT_PRIVATE_KEY_FILE)]
    private_key: PathBuf,

    /// Where to write the public key (SubjectPublicKeyInfo PEM)
    #[arg(short = 'u', long = "public", default_value = DEFAULT_PUBLIC_KEY_FILE)]
    public_key: PathBuf,

    /// Overwrite existing key files
    #[arg(short, long)]
    force: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match generate_key_files(&args.private_key, &args.public_key, args.force) {
        Ok(pair) => {
            println!("Generated ECDSA P-256 key pair");
            println!("  Private key: {}", args.private_key.display());
            println!("  Public key:  {}", args.public_key.display());
            println!("  Key id:      {}", pair.key_id());
            println!();
            println!("Next steps:");
            println!("  1. Keep {} secret; never commit it.", args.private_key.display());
            println!(
                "  2. Register the contents of {} with your LIAM connector.",
                args.public_key.display()
            );
            println!(
                "  3. Export {PRIVATE_KEY_PATH_ENV}={} and LIAM_API_KEY=<your api key>.",
                args.private_key.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, code = e.error_code(), "Key generation failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
