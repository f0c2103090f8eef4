use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

const DEFAULT_TITLE: &str = "Financial Report";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: String,
    /// Owner recorded on new transactions and used to scope reads.
    /// Empty means single-tenant.
    pub user_name: String,
    pub report_title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: home().join("Documents").join("tally").to_string_lossy().into_owned(),
            user_name: String::new(),
            report_title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl Settings {
    pub fn owner(&self) -> Option<&str> {
        Some(self.user_name.trim()).filter(|name| !name.is_empty())
    }

    pub fn db_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("tally.db")
    }

    /// Missing file means defaults; a file that does not parse is logged and ignored.
    fn load_from(path: &Path) -> Settings {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Settings::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
            Settings::default()
        })
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| TallyError::Settings(e.to_string()))?;
        std::fs::write(path, format!("{json}\n"))?;
        Ok(())
    }
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn settings_path() -> PathBuf {
    home().join(".config").join("tally").join("settings.json")
}

pub fn load_settings() -> Settings {
    Settings::load_from(&settings_path())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    settings.save_to(&settings_path())
}

/// Expand a leading `~` and anchor relative paths at the working directory,
/// so the stored data dir stays valid wherever tally is run from.
pub fn expand_data_dir(raw: &str) -> String {
    let path = match raw.strip_prefix('~') {
        Some(rest) => home().join(rest.trim_start_matches('/')),
        None => PathBuf::from(raw),
    };
    let path = if path.is_relative() {
        std::env::current_dir().map(|cwd| cwd.join(&path)).unwrap_or(path)
    } else {
        path
    };
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            user_name: "Alice".to_string(),
            report_title: "Household".to_string(),
        };
        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.report_title, "Household");
        assert_eq!(loaded.owner(), Some("Alice"));
    }

    #[test]
    fn test_missing_and_corrupt_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Settings::load_from(&dir.path().join("absent.json"));
        assert_eq!(missing.report_title, DEFAULT_TITLE);

        let corrupt = dir.path().join("settings.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        let loaded = Settings::load_from(&corrupt);
        assert_eq!(loaded.owner(), None);
        assert!(loaded.db_path().ends_with("tally.db"));
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "user_name": "  "}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.report_title, DEFAULT_TITLE);
        assert_eq!(s.owner(), None);
    }

    #[test]
    fn test_expand_data_dir() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_data_dir("~/books"), home.join("books").to_string_lossy());
        assert_eq!(expand_data_dir("/srv/tally"), "/srv/tally");
        assert!(Path::new(&expand_data_dir("books")).is_absolute());
    }
}
