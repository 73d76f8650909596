use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Persisted user preferences. Markers are deliberately not part of this:
/// the A/B range belongs to one practice session, not to the install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefs {
    pub zoom: f32,
    pub last_dir: Option<PathBuf>,
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            last_dir: None,
        }
    }
}

impl Prefs {
    /// Load from the platform config dir; any failure falls back to defaults.
    pub fn load() -> Self {
        let Some(path) = prefs_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("ignoring malformed preferences at {}: {err}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persist to the platform config dir. Failures are logged, not surfaced;
    /// preferences are a convenience, not session data.
    pub fn save(&self) {
        let Some(path) = prefs_path() else { return };
        if let Err(err) = self.save_to(&path) {
            warn!("could not save preferences to {}: {err}", path.display());
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, contents)
    }
}

fn prefs_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("woodshed").join("prefs.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let prefs = Prefs {
            zoom: 2.5,
            last_dir: Some(PathBuf::from("/music")),
        };
        prefs.save_to(&path).unwrap();
        assert_eq!(Prefs::load_from(&path), prefs);
    }

    #[test]
    fn test_missing_or_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("nope.json");
        assert_eq!(Prefs::load_from(&missing), Prefs::default());

        let malformed = dir.path().join("bad.json");
        fs::write(&malformed, "{not json").unwrap();
        assert_eq!(Prefs::load_from(&malformed), Prefs::default());
    }
}
