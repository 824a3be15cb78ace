//! Configuration loading and root folder resolution
//!
//! Root folder resolution priority order:
//! 1. Command-line argument (handled by the caller, highest priority)
//! 2. Environment variable (WRRL_ROOT_FOLDER, then WRRL_ROOT)
//! 3. Per-module TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Missing or malformed config files never terminate startup: the resolver
//! degrades to the compiled default and logs a warning.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;

/// Compiled per-platform defaults used when no configuration is present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            // ~/.local/share/wrrl (or /var/lib/wrrl for system-wide)
            dirs::data_local_dir()
                .map(|d| d.join("wrrl"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/wrrl"))
        } else if cfg!(target_os = "macos") {
            // ~/Library/Application Support/wrrl
            dirs::data_dir()
                .map(|d| d.join("wrrl"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/wrrl"))
        } else if cfg!(target_os = "windows") {
            // %LOCALAPPDATA%\wrrl
            dirs::data_local_dir()
                .map(|d| d.join("wrrl"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\wrrl"))
        } else {
            PathBuf::from("./wrrl_data")
        };

        CompiledDefaults {
            root_folder,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Logging section of the per-module TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Per-module TOML config file schema
///
/// All fields are optional so older config files keep deserializing as the
/// schema grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    /// Identity of the permanent bootstrap administrator
    #[serde(default)]
    pub bootstrap_admin: Option<Uuid>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Resolves the WRRL root folder for one module
pub struct RootFolderResolver {
    module_name: String,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        RootFolderResolver {
            module_name: module_name.to_string(),
        }
    }

    /// Resolve the root folder: environment, then TOML, then compiled default.
    /// A command-line override, when present, should be applied by the caller
    /// before consulting this resolver.
    pub fn resolve(&self) -> PathBuf {
        if let Ok(path) = std::env::var("WRRL_ROOT_FOLDER") {
            return PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("WRRL_ROOT") {
            return PathBuf::from(path);
        }

        if let Some(config) = self.load_toml_config() {
            if let Some(root_folder) = config.root_folder {
                return root_folder;
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }

    /// Load this module's TOML config, if one exists and parses.
    /// Returns None (with a warning for parse failures) otherwise.
    pub fn load_toml_config(&self) -> Option<TomlConfig> {
        let path = self.config_file_path()?;
        let content = std::fs::read_to_string(&path).ok()?;
        match toml::from_str::<TomlConfig>(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring malformed config file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Per-platform config file location for this module
    fn config_file_path(&self) -> Option<PathBuf> {
        let file_name = format!("{}.toml", self.module_name);

        if cfg!(target_os = "linux") {
            // ~/.config/wrrl/<module>.toml, then /etc/wrrl/<module>.toml
            if let Some(user_config) = dirs::config_dir().map(|d| d.join("wrrl").join(&file_name))
            {
                if user_config.exists() {
                    return Some(user_config);
                }
            }
            let system_config = PathBuf::from("/etc/wrrl").join(&file_name);
            if system_config.exists() {
                return Some(system_config);
            }
            None
        } else {
            let path = dirs::config_dir()?.join("wrrl").join(&file_name);
            if path.exists() {
                Some(path)
            } else {
                None
            }
        }
    }
}

/// Prepares a resolved root folder for use
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        RootFolderInitializer { root_folder }
    }

    /// Create the root folder (and parents) if missing. Idempotent.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    /// Path of the shared WRRL database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("wrrl.db")
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}
