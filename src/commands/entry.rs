//! Single-entry commands.
//!
//! Every command takes exactly one id. Unknown and malformed ids produce
//! the same "entry not found" error.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;

use capstore::storage::{AccessMode, Gateway};

use super::open_input;

/// Create an entry, optionally fill it, and print the id.
pub fn create(
    gateway: &Gateway,
    name: Option<&str>,
    content_type: Option<&str>,
    input: Option<&Path>,
) -> Result<()> {
    let id = create_filled(gateway, name, content_type, input)?;
    println!("{id}");
    Ok(())
}

/// Create an entry and write its initial content.
///
/// The id is only handed out once the content is in place. If writing
/// fails the entry is deleted again, since nobody would ever learn its id.
fn create_filled(
    gateway: &Gateway,
    name: Option<&str>,
    content_type: Option<&str>,
    input: Option<&Path>,
) -> Result<String> {
    let id = gateway.create(name, content_type)?.to_string();

    let Some(input) = input else {
        return Ok(id);
    };

    match fill(gateway, &id, AccessMode::WriteTruncate, input) {
        Ok(written) => {
            tracing::debug!(id = %id, bytes = written, "Initial content written");
            Ok(id)
        },
        Err(e) => {
            if let Err(cleanup) = gateway.delete_one(&id) {
                tracing::error!(error = %cleanup, "Failed to delete entry after write failure");
            }
            Err(e)
        },
    }
}

/// Print name, content type and size as JSON.
pub fn info(gateway: &Gateway, id: &str) -> Result<()> {
    let stat = gateway.stat(id)?;
    let json = serde_json::to_string_pretty(&stat).context("Failed to encode entry info")?;
    println!("{json}");
    Ok(())
}

/// Copy the entry's content to stdout.
pub fn cat(gateway: &Gateway, id: &str) -> Result<()> {
    let mut resolved = gateway.resolve(id)?;
    let mut stdout = io::stdout().lock();
    io::copy(&mut resolved.file, &mut stdout).context("Failed to write entry to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Replace or append to the entry's content.
pub fn write(gateway: &Gateway, id: &str, append: bool, input: &Path) -> Result<()> {
    let mode = if append {
        AccessMode::WriteAppend
    } else {
        AccessMode::WriteTruncate
    };
    let written = fill(gateway, id, mode, input)?;
    tracing::info!(bytes = written, append, "Entry content written");
    Ok(())
}

/// Print the content type (the default type for unknown ids).
pub fn content_type(gateway: &Gateway, id: &str) -> Result<()> {
    println!("{}", gateway.content_type(id)?);
    Ok(())
}

pub fn set_content_type(gateway: &Gateway, id: &str, content_type: &str) -> Result<()> {
    gateway.update_content_type(id, content_type)?;
    Ok(())
}

/// Delete the entry and print the number of rows removed (0 or 1).
pub fn delete(gateway: &Gateway, id: &str) -> Result<()> {
    println!("{}", gateway.delete_one(id)?);
    Ok(())
}

fn fill(gateway: &Gateway, id: &str, mode: AccessMode, input: &Path) -> Result<u64> {
    let mut source = open_input(input)?;
    let mut file = gateway.open(id, mode)?;
    let written = io::copy(&mut source, &mut file).context("Failed to write entry content")?;
    file.sync_all().context("Failed to sync entry content")?;
    Ok(written)
}
