//! Path utilities for capstore.
//!
//! # Base Directory
//! - [`get_base_dir`] - where the index and backing files live
//!
//! # Store Layout
//! - [`get_index_path`] - `<base>/index.redb`
//! - [`get_files_dir`] - `<base>/files/`
//!
//! # Configuration
//! - [`get_config_path`] - `<config dir>/capstore/capstore.toml`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_FILE_NAME, FILES_DIR_NAME, HOME_ENV_VAR, INDEX_FILE_NAME};

// =============================================================================
// Base Directory
// =============================================================================

/// Get the store's base directory.
///
/// Resolution order:
/// 1. `cli` (the `--home` flag), if given
/// 2. `CAPSTORE_HOME` environment variable, if set and non-empty
/// 3. `configured` (`storage.base_dir` from the config file), if given
/// 4. `<cache dir>/capstore` (default)
///
/// The default lives under the user cache directory because entries are
/// transient and safe to lose.
pub fn get_base_dir(cli: Option<&Path>, configured: Option<&Path>) -> Result<PathBuf> {
    let env = std::env::var_os(HOME_ENV_VAR).map(PathBuf::from);
    resolve_base_dir(cli, env.as_deref(), configured)
}

fn resolve_base_dir(
    cli: Option<&Path>,
    env: Option<&Path>,
    configured: Option<&Path>,
) -> Result<PathBuf> {
    let explicit = [cli, env, configured]
        .into_iter()
        .flatten()
        .find(|path| !path.as_os_str().is_empty());

    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let cache = dirs::cache_dir().context("Failed to get cache directory")?;
    Ok(cache.join("capstore"))
}

// =============================================================================
// Store Layout
// =============================================================================

/// Get the index database path: `<base>/index.redb`
pub fn get_index_path(base_dir: &Path) -> PathBuf {
    base_dir.join(INDEX_FILE_NAME)
}

/// Get the backing files directory: `<base>/files/`
pub fn get_files_dir(base_dir: &Path) -> PathBuf {
    base_dir.join(FILES_DIR_NAME)
}

// =============================================================================
// Configuration Files
// =============================================================================

/// Get the default config path: `<config dir>/capstore/capstore.toml`
pub fn get_config_path() -> Result<PathBuf> {
    let config = dirs::config_dir().context("Failed to get config directory")?;
    Ok(config.join("capstore").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The environment variable itself is not set here: std::env::set_var is
    // unsafe in Rust 2024 and races with parallel tests. Resolution order is
    // tested through resolve_base_dir instead.

    #[test]
    fn test_cli_flag_wins() {
        let dir = resolve_base_dir(
            Some(Path::new("/cli")),
            Some(Path::new("/env")),
            Some(Path::new("/config")),
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/cli"));
    }

    #[test]
    fn test_env_before_config() {
        let dir = resolve_base_dir(None, Some(Path::new("/env")), Some(Path::new("/config")))
            .unwrap();
        assert_eq!(dir, PathBuf::from("/env"));
    }

    #[test]
    fn test_empty_env_is_ignored() {
        let dir = resolve_base_dir(None, Some(Path::new("")), Some(Path::new("/config"))).unwrap();
        assert_eq!(dir, PathBuf::from("/config"));
    }

    #[test]
    fn test_default_under_cache_dir() {
        if let Some(cache) = dirs::cache_dir() {
            let dir = resolve_base_dir(None, None, None).unwrap();
            assert_eq!(dir, cache.join("capstore"));
        }
    }

    #[test]
    fn test_layout_paths() {
        let base = Path::new("/tmp/capstore");
        assert_eq!(get_index_path(base), base.join("index.redb"));
        assert_eq!(get_files_dir(base), base.join("files"));
    }

    #[test]
    fn test_config_path_file_name() {
        if let Ok(path) = get_config_path() {
            assert!(path.ends_with("capstore/capstore.toml"));
        }
    }
}
