//! Configuration schema for autobackup
//!
//! Configuration is stored at `~/.config/autobackup/config.toml`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Export pipeline settings
    pub export: ExportConfig,

    /// Linked-record discovery settings
    pub link: LinkConfig,

    /// Host platform data sources
    pub platform: PlatformConfig,

    /// Static capability grants for the bundled authorizer
    pub access: AccessConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (host:port)
    pub listen: String,

    /// Cache lifetime hint sent with served downloads, in seconds
    pub download_cache_secs: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8460".to_string(),
            download_cache_secs: 300,
        }
    }
}

/// Export pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Exporter command argv; `{subject}` is replaced with the subject id.
    /// The command must write the export package to stdout.
    pub command: Vec<String>,

    /// How long a generated artifact stays fresh, in hours
    pub freshness_hours: u64,

    /// Artifact storage directory (defaults to the state dir)
    pub storage_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            command: vec![],
            freshness_hours: 24,
            storage_dir: None,
        }
    }
}

/// Linked-record discovery configuration
///
/// Both ids default to 0 (unset), which disables link resolution entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Id of the record module holding linkable records
    pub record_module_id: u64,

    /// Id of the field whose content references subjects
    pub field_id: u64,

    /// Suffix searched for in field content; `{subject}` is replaced with
    /// the subject id being viewed
    pub reference_suffix: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            record_module_id: 0,
            field_id: 0,
            reference_suffix: "/view?id={subject}".to_string(),
        }
    }
}

impl LinkConfig {
    /// Whether link resolution is configured at all
    pub fn is_enabled(&self) -> bool {
        self.record_module_id != 0 && self.field_id != 0
    }

    /// Build the search suffix for a subject
    pub fn suffix_for(&self, subject_id: u64) -> String {
        self.reference_suffix
            .replace("{subject}", &subject_id.to_string())
    }
}

/// Host platform data sources for the bundled collaborators
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// JSON file listing exportable subjects (id + display name)
    pub subjects_file: Option<PathBuf>,

    /// JSON file listing field records for link discovery
    pub records_file: Option<PathBuf>,
}

/// Static capability grants
///
/// Maps capability name to actor ids; the entry `"*"` grants everyone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub grants: HashMap<String, Vec<String>>,
}
