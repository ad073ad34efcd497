// Application settings
// Loaded from ~/.config/gridsearch/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Formula
    /// Longest chain of formula cells followed through references
    #[serde(rename = "formula.maxResolutionDepth")]
    pub max_resolution_depth: usize,

    /// Most cells one range reference may cover
    #[serde(rename = "formula.maxRangeCells")]
    pub max_range_cells: usize,

    /// Unknown characters and trailing tokens are syntax errors
    #[serde(rename = "formula.strictSyntax")]
    pub strict_syntax: bool,

    // Grid
    #[serde(rename = "grid.defaultRows")]
    pub default_rows: usize,

    #[serde(rename = "grid.defaultColumns")]
    pub default_columns: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Formula
            max_resolution_depth: 256,
            max_range_cells: 1_000_000,
            strict_syntax: false,
            // Grid
            default_rows: 1000,
            default_columns: 26,
        }
    }
}

const DEFAULT_CONFIG: &str = r#"{
    // Formula evaluation
    // Longest chain of formulas followed through cell references
    "formula.maxResolutionDepth": 256,
    // Larger ranges evaluate to an error instead of being expanded
    "formula.maxRangeCells": 1000000,
    // true = unknown characters and leftover tokens are syntax errors
    "formula.strictSyntax": false,

    // Grid size
    "grid.defaultRows": 1000,
    "grid.defaultColumns": 26
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridsearch");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults.
    /// A missing file is created with commented defaults.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            if let Err(e) = Self::create_default_file(&path) {
                log::warn!("Error writing default settings.json: {}", e);
            }
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load settings from `path`, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}. Using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|e| e.to_string())
    }

    /// Save current settings to the default location
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Write the commented default settings file
    pub fn create_default_file(path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Error creating config directory: {}", e))?;
        }
        fs::write(path, DEFAULT_CONFIG).map_err(|e| e.to_string())
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
