//! Application settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared::Controls;
use tracing::warn;

use crate::export::encoder::ClipFormat;
use crate::export::gltf::AssetFormat;

/// Render surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceSettings {
    pub width: u32,
    pub height: u32,
    /// Background color RGB
    pub background_color: [u8; 3],
    /// Camera orbit angles in degrees
    #[serde(default)]
    pub camera_yaw: f32,
    #[serde(default)]
    pub camera_pitch: f32,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            width: 480,
            height: 360,
            background_color: [17, 17, 17],
            camera_yaw: 0.0,
            camera_pitch: 0.0,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Where artifacts are written; the working directory when unset
    pub output_dir: Option<PathBuf>,
    pub asset_format: AssetFormat,
    #[serde(default)]
    pub clip_format: ClipFormat,
}

/// All application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    /// Initial control values
    pub controls: Controls,
    /// Start with the animation paused
    #[serde(default)]
    pub start_paused: bool,
    #[serde(default)]
    pub surface: SurfaceSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

impl AppSettings {
    /// Default location of `settings.json`
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "svg3d", "svg3d-studio")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return default if not found
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load from an explicit path; unreadable or invalid files give defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<AppSettings>(&json) {
            Ok(settings) => Self {
                controls: settings.controls.clamped(),
                ..settings
            },
            Err(e) => {
                warn!(path = %path.display(), "ignoring invalid settings: {}", e);
                Self::default()
            }
        }
    }

    /// Save settings to file
    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Err(e) = self.save_to(&path) {
                warn!(path = %path.display(), "failed to save settings: {}", e);
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
