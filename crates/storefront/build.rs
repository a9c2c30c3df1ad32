//! Build script for the storefront crate.
//!
//! Fingerprints `static/css/main.css` so the layout can link a copy whose
//! name changes with its content. The copy lives in `static/css/derived/`
//! (ignored by git) and the short hash is exported as `STOREFRONT_CSS_HASH`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Hex characters kept from the digest.
const HASH_LEN: usize = 10;

fn main() {
    let manifest_dir = PathBuf::from(
        env::var_os("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo"),
    );
    let stylesheet = manifest_dir.join("static/css/main.css");
    println!("cargo:rerun-if-changed={}", stylesheet.display());

    let hash = match fingerprint(&stylesheet) {
        Ok(hash) => hash,
        Err(e) => {
            // The layout falls back to the unhashed file
            println!("cargo:warning=stylesheet not fingerprinted: {e}");
            String::new()
        }
    };
    println!("cargo:rustc-env=STOREFRONT_CSS_HASH={hash}");
}

/// Hash the stylesheet and write `derived/main.{hash}.css` next to it.
fn fingerprint(stylesheet: &Path) -> io::Result<String> {
    let content = fs::read(stylesheet)?;
    let digest = format!("{:x}", Sha256::digest(&content));
    let hash = digest.get(..HASH_LEN).unwrap_or(&digest).to_string();

    let derived = stylesheet
        .parent()
        .map_or_else(|| PathBuf::from("derived"), |dir| dir.join("derived"));
    fs::create_dir_all(&derived)?;
    fs::write(derived.join(format!("main.{hash}.css")), &content)?;

    Ok(hash)
}
