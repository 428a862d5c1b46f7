//! Format detection, file discovery and deserialization for data files.
//!
//! Mission and catalog files may be RON, JSON or TOML; the format is picked
//! from the file extension.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading mission or catalog data.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// A field without which no mission can be built is absent.
    #[error("missing required field '{field}' in {file}")]
    MissingField { file: PathBuf, field: &'static str },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A field entry names a kind other than farmland, pen or pond.
    #[error("unknown field kind {kind} in {file}")]
    UnknownFieldKind { file: PathBuf, kind: u32 },

    /// The same id is listed twice.
    #[error("duplicate {kind} id {id} in {file}")]
    DuplicateId {
        file: PathBuf,
        kind: &'static str,
        id: u32,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    pub const EXTENSIONS: [(&'static str, Format); 3] =
        [("ron", Format::Ron), ("toml", Format::Toml), ("json", Format::Json)];
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::EXTENSIONS
        .iter()
        .find(|(name, _)| Some(*name) == ext)
        .map(|(_, format)| *format)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for (ext, _) in &Format::EXTENSIONS {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

/// Base name of the data file for mission `level`, e.g. `mission_3`.
pub fn mission_file_name(level: u32) -> String {
    format!("mission_{level}")
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `file` only labels errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}
