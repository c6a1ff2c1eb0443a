//! Explorer settings with persistence
//!
//! Settings are saved to `~/.config/vista/settings.toml`

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vista_assets::LoadConfig;
use vista_render::{ColorFormat, DepthFormat, RenderTargets};

/// All explorer settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub loading: LoadSettings,
    pub targets: TargetSettings,
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vista"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                warn!("Failed to parse settings: {}, using defaults", e);
                Self::default()
            }),
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(dir) = Self::config_dir() else {
            anyhow::bail!("Could not determine config directory");
        };

        let path = dir.join("settings.toml");

        // Create config directory if it doesn't exist
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// How documents are loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSettings {
    /// Decode embedded images on worker threads
    pub parallel_images: bool,
    /// Dedicated image worker pool size (0 = shared global pool)
    pub image_workers: usize,
    /// Log document members that are ignored
    pub log_unsupported: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        let config = LoadConfig::default();
        Self {
            parallel_images: config.parallel_images,
            image_workers: config.image_workers,
            log_unsupported: config.log_unsupported,
        }
    }
}

impl LoadSettings {
    pub fn to_config(&self) -> LoadConfig {
        LoadConfig {
            log_unsupported: self.log_unsupported,
            parallel_images: self.parallel_images,
            image_workers: self.image_workers,
        }
    }
}

/// Render target formats for the scene passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSettings {
    pub color_format: ColorFormat,
    pub depth_format: DepthFormat,
    pub shadow_depth_format: DepthFormat,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            color_format: ColorFormat::Rgba8Unorm,
            depth_format: DepthFormat::Depth32Float,
            shadow_depth_format: DepthFormat::Depth32Float,
        }
    }
}

impl TargetSettings {
    pub fn to_targets(&self) -> RenderTargets {
        RenderTargets::new(self.color_format, self.depth_format, self.shadow_depth_format)
    }
}
