//! Persisted user preferences for cellmark.
//!
//! Everything the panel remembers between sessions lives in one TOML file:
//! theme and custom primary color, panel geometry, the selected field, the
//! local markdown override used for testing, and license state. The engine
//! itself holds none of this; it reads the override through the
//! [`OverrideSource`] port implemented by [`SharedPreferences`].

mod license;
mod theme;

pub use license::License;
pub use theme::{Theme, lighten_hex};

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use cellmark_engine::OverrideSource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_PANEL_WIDTH: u32 = 240;
pub const MAX_PANEL_WIDTH: u32 = 640;
pub const DEFAULT_PANEL_WIDTH: u32 = 300;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Failed to read preferences file at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse preferences file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub custom_primary: String,
    pub panel_width: u32,
    pub panel_visible: bool,
    /// Field the user pinned in the host table, if any.
    pub field_id: Option<String>,
    /// Local markdown override; used verbatim in place of the fetched cell
    /// text while present.
    pub markdown_override: Option<String>,
    pub license: License,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            custom_primary: "#2fb888".to_string(),
            panel_width: DEFAULT_PANEL_WIDTH,
            panel_visible: true,
            field_id: None,
            markdown_override: None,
            license: License::default(),
        }
    }
}

impl Preferences {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Option<Self>, PreferencesError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|source| PreferencesError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut preferences: Preferences =
            toml::from_str(&content).map_err(|source| PreferencesError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        preferences.panel_width = preferences.panel_width.clamp(MIN_PANEL_WIDTH, MAX_PANEL_WIDTH);

        Ok(Some(preferences))
    }

    pub fn load() -> Result<Option<Self>, PreferencesError> {
        Self::load_from_path(Self::preferences_path())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path(Self::preferences_path())
    }

    pub fn preferences_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/cellmark");
        PathBuf::from(config_dir.as_ref()).join("preferences.toml")
    }

    /// Set the panel width, keeping it inside the layout's bounds.
    pub fn set_panel_width(&mut self, width: u32) {
        self.panel_width = width.clamp(MIN_PANEL_WIDTH, MAX_PANEL_WIDTH);
    }

    /// CSS variable block for the active theme.
    pub fn theme_css(&self) -> String {
        self.theme.css_variables(&self.custom_primary)
    }
}

/// Shared, thread-safe preference handle. Clones see the same state; the
/// engine reads the markdown override through this handle's port
/// implementation while the UI mutates it.
#[derive(Debug, Clone, Default)]
pub struct SharedPreferences(Arc<RwLock<Preferences>>);

impl SharedPreferences {
    pub fn new(preferences: Preferences) -> Self {
        Self(Arc::new(RwLock::new(preferences)))
    }

    pub fn snapshot(&self) -> Preferences {
        self.0.read().map(|guard| guard.clone()).unwrap_or_default()
    }

    pub fn update(&self, apply: impl FnOnce(&mut Preferences)) {
        if let Ok(mut guard) = self.0.write() {
            apply(&mut guard);
        }
    }
}

impl OverrideSource for SharedPreferences {
    fn markdown_override(&self) -> Option<String> {
        self.0
            .read()
            .ok()
            .and_then(|guard| guard.markdown_override.clone())
            .filter(|text| !text.is_empty())
    }
}
