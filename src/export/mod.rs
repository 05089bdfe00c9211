//! Export pipeline seam
//!
//! The actual export engine belongs to the host platform; this module
//! defines the capability boundary (`Exporter`), the fixed sanitization
//! settings every export runs with, and the filename convention for the
//! produced package.

pub mod command;

pub use command::CommandExporter;

use crate::error::BackupResult;
use async_trait::async_trait;

/// Fixed package extension for generated exports
pub const PACKAGE_EXTENSION: &str = ".mbz";

/// Sanitization settings handed to the exporter
///
/// The export is always restricted: no personal/user data, no block-level
/// content, no content filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSettings {
    pub include_users: bool,
    pub include_blocks: bool,
    pub include_filters: bool,
}

impl ExportSettings {
    /// The restricted settings used for every on-demand export
    pub fn restricted() -> Self {
        Self {
            include_users: false,
            include_blocks: false,
            include_filters: false,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::restricted()
    }
}

/// Opaque export capability provided by the host platform
///
/// `export` may be slow; it is the only operation in the system allowed to
/// block for a long duration. Implementations must honor the sanitization
/// settings.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Produce the export package bytes for a subject
    async fn export(&self, subject_id: u64, settings: &ExportSettings) -> BackupResult<Vec<u8>>;
}

/// Derive the artifact filename from a subject display name
///
/// ASCII-folds accented characters, lowercases, turns spaces into
/// underscores and drops anything else outside `[a-z0-9_.-]`, then appends
/// the package extension. "Intro Quiz" becomes `intro_quiz.mbz`.
pub fn backup_filename(display_name: &str) -> String {
    let mut stem = String::with_capacity(display_name.len());

    for c in display_name.chars() {
        if let Some(folded) = fold_char(c) {
            stem.push_str(folded);
        } else if c == ' ' {
            stem.push('_');
        } else if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if matches!(c, '_' | '.' | '-') {
            stem.push(c);
        }
    }

    if stem.is_empty() {
        stem.push_str("export");
    }

    stem.push_str(PACKAGE_EXTENSION);
    stem
}

/// Fold common accented Latin characters to their ASCII base
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c.to_lowercase().next().unwrap_or(c) {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => "a",
        'ç' => "c",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => "o",
        'ú' | 'ù' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}
