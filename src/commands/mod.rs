//! CLI command implementations for capstore.
//!
//! - [`entry`] - Single-entry commands over the capability gateway
//! - [`sweep`] - One-shot and periodic retention sweeps
//!
//! There is no command that lists entries.

pub mod entry;
pub mod sweep;

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Open a content source: `-` is stdin, anything else a file path.
fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    Ok(Box::new(file))
}
