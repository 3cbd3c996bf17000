//! Render settings (`render.toml` in the platform config directory).
//!
//! These are the quality and feature toggles that effect variants and
//! consumers read as external inputs. Nothing here changes which variant
//! negotiation selects, except `device.chipset_override`, which replaces
//! adapter classification.

use anyhow::{Context, Result};
use ridgeline_shared::ChipsetId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "render.toml";

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RenderConfig {
    /// Terrain texture filtering and noise layers
    #[serde(default)]
    pub terrain: TerrainConfig,
    /// Adapter classification overrides
    #[serde(default)]
    pub device: DeviceConfig,
    /// Fog-of-war shroud
    #[serde(default)]
    pub shroud: ShroudConfig,
    /// Screen filter timing
    #[serde(default)]
    pub filters: FilterConfig,
}

/// Terrain rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Bilinear filtering of terrain textures (default: true)
    #[serde(default = "default_true")]
    pub bilinear: bool,
    /// Trilinear filtering of terrain textures, implies bilinear (default: false)
    #[serde(default)]
    pub trilinear: bool,
    /// Draw scrolling cloud shadows (default: true)
    #[serde(default = "default_true")]
    pub use_cloud_map: bool,
    /// Draw the static light/noise map (default: true)
    #[serde(default = "default_true")]
    pub use_light_map: bool,
    /// Cloud texture scroll in texture units per second (default: [-0.02, -0.03])
    #[serde(default = "default_cloud_slide")]
    pub cloud_slide_per_second: [f32; 2],
}

/// Device classification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeviceConfig {
    /// Force a chipset family, by short name ("GF3", "PS11", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chipset_override: Option<ChipsetId>,
}

/// Shroud settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShroudConfig {
    /// Minimum visibility level of any shroud cell (default: 0)
    #[serde(default)]
    pub shroud_alpha: u8,
    /// Colour a fully lit cell is scaled from (default: white)
    #[serde(default = "default_shroud_color")]
    pub shroud_color: [u8; 3],
    /// Fog level change per millisecond (default: 255/1000, one second black to lit)
    #[serde(default = "default_interpolation_rate")]
    pub interpolation_rate_per_ms: f32,
    /// Bilinear filter the shroud texture (default: true)
    #[serde(default = "default_true")]
    pub filter: bool,
    /// Blend the shroud as an alpha sprite instead of multiplying (default: false)
    #[serde(default)]
    pub fog_of_war: bool,
}

/// Screen filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Frames to fade the black and white filter in or out (default: 30)
    #[serde(default = "default_fade_frames")]
    pub bw_fade_frames: u32,
    /// Frames to run a crossfade (default: 30)
    #[serde(default = "default_fade_frames")]
    pub crossfade_frames: u32,
}

fn default_true() -> bool {
    true
}
fn default_cloud_slide() -> [f32; 2] {
    [-0.02, -0.03]
}
fn default_shroud_color() -> [u8; 3] {
    [255, 255, 255]
}
fn default_interpolation_rate() -> f32 {
    255.0 / 1000.0
}
fn default_fade_frames() -> u32 {
    30
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            bilinear: default_true(),
            trilinear: false,
            use_cloud_map: default_true(),
            use_light_map: default_true(),
            cloud_slide_per_second: default_cloud_slide(),
        }
    }
}

impl Default for ShroudConfig {
    fn default() -> Self {
        Self {
            shroud_alpha: 0,
            shroud_color: default_shroud_color(),
            interpolation_rate_per_ms: default_interpolation_rate(),
            filter: default_true(),
            fog_of_war: false,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            bw_fade_frames: default_fade_frames(),
            crossfade_frames: default_fade_frames(),
        }
    }
}

impl TerrainConfig {
    /// Linear min/mag filtering is on.
    pub fn linear_filtering(&self) -> bool {
        self.bilinear || self.trilinear
    }
}

impl RenderConfig {
    /// Loads from a file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Writes to a file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize render config")?;
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Settings that are legal but probably not what was meant.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.terrain.trilinear && !self.terrain.bilinear {
            warnings.push("terrain.trilinear enables bilinear filtering as well".to_string());
        }
        if self.shroud.interpolation_rate_per_ms <= 0.0 {
            warnings.push(format!(
                "shroud.interpolation_rate_per_ms {} freezes fog changes",
                self.shroud.interpolation_rate_per_ms
            ));
        }
        if self.filters.bw_fade_frames == 0 || self.filters.crossfade_frames == 0 {
            warnings.push("filter fades of 0 frames complete immediately".to_string());
        }
        warnings
    }
}

/// Returns the platform-specific configuration directory.
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "ridgeline", "Ridgeline")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the render configuration, falling back to defaults if the file
/// is missing or unreadable.
pub fn load() -> RenderConfig {
    let Some(path) = config_dir().map(|dir| dir.join(CONFIG_FILE)) else {
        return RenderConfig::default();
    };
    match RenderConfig::load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{e:#}, using default render settings");
            RenderConfig::default()
        }
    }
}

/// Saves the render configuration to the platform config directory.
pub fn save(config: &RenderConfig) -> Result<()> {
    if let Some(dir) = config_dir() {
        config.save_to(&dir.join(CONFIG_FILE))?;
    }
    Ok(())
}
