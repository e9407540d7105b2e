//! Build script for playsync.
//!
//! Places the `.env.example` template into the local data directory next to
//! where `config::load_env` looks for `.env`, so a fresh install has a
//! template to copy from.

use std::{env, fs, path::PathBuf};

/// Copies `.env.example` from the crate root to `<data_local_dir>/playsync/`.
///
/// - Linux: `~/.local/share/playsync/.env.example`
/// - macOS: `~/Library/Application Support/playsync/.env.example`
/// - Windows: `%LOCALAPPDATA%/playsync/.env.example`
///
/// A missing template only produces a cargo warning. Directory or write
/// failures fail the build.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let template = manifest_dir.join(".env.example");

    if !template.is_file() {
        println!(
            "cargo:warning=.env.example not found at {}",
            template.display()
        );
        return Ok(());
    }

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("playsync");
    fs::create_dir_all(&out_dir)?;
    fs::copy(&template, out_dir.join(".env.example"))?;

    Ok(())
}
