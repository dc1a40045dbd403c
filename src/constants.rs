//! Shared constants for the capability store.

/// Content type reported for entries that never had one set.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Default time-to-live for stored entries (24 hours).
pub const DEFAULT_TTL_SECS: u64 = 24 * 60 * 60;

/// Largest accepted time-to-live (100 years).
pub const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Default interval between background sweeps (1 hour).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// Name of the metadata database inside the base directory.
pub const INDEX_FILE_NAME: &str = "index.redb";

/// Name of the directory holding backing files inside the base directory.
pub const FILES_DIR_NAME: &str = "files";

/// Name of the configuration file inside the user config directory.
pub const CONFIG_FILE_NAME: &str = "capstore.toml";

/// Environment variable overriding the base directory.
pub const HOME_ENV_VAR: &str = "CAPSTORE_HOME";
