use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub strip: StripConfig,
    #[serde(default)]
    pub drag: DragConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Strip geometry: seat count, axis, and measured cell size in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripConfig {
    #[serde(default = "StripConfig::default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default = "StripConfig::default_cell_width")]
    pub cell_width: f32,
    #[serde(default = "StripConfig::default_cell_height")]
    pub cell_height: f32,
    #[serde(default = "StripConfig::default_padding")]
    pub padding: f32,
    #[serde(default = "StripConfig::default_icon_size")]
    pub icon_size_px: f32,
}

impl StripConfig {
    fn default_capacity() -> usize { 5 }
    fn default_cell_width() -> f32 { 96.0 }
    fn default_cell_height() -> f32 { 96.0 }
    fn default_padding() -> f32 { 8.0 }
    fn default_icon_size() -> f32 { 48.0 }
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            orientation: Orientation::Horizontal,
            cell_width: 96.0,
            cell_height: 96.0,
            padding: 8.0,
            icon_size_px: 48.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DragConfig {
    /// Delay before a hover commits to the pending-create-folder mode.
    #[serde(default = "DragConfig::default_folder_delay")]
    pub folder_delay_ms: u64,
    /// Delay before a hover triggers a seat reorder.
    #[serde(default = "DragConfig::default_reorder_delay")]
    pub reorder_delay_ms: u64,
}

impl DragConfig {
    fn default_folder_delay() -> u64 { 0 }
    fn default_reorder_delay() -> u64 { 50 }
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            folder_delay_ms: 0,
            reorder_delay_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Layout file location. Defaults to the user data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Payload center must be within this radius of a seat center before any
    /// folder intent is considered.
    pub fn folder_accept_radius(&self) -> f32 {
        0.55 * self.strip.icon_size_px
    }

    /// Wider radius inside which a hover schedules a seat reorder.
    pub fn swap_radius(&self) -> f32 {
        self.strip.icon_size_px * 5.0 / 6.0
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("perchd")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "parsing config TOML")
    }

    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.store.path {
            return path.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("/var/lib"))
            .join("perchd")
            .join("layout.json")
    }
}

pub fn socket_path() -> PathBuf {
    // PERCHD_SOCK env var overrides for testing.
    // Default: /run/perchd/perchd.sock (created by RuntimeDirectory=perchd in systemd).
    if let Ok(path) = std::env::var("PERCHD_SOCK") {
        return PathBuf::from(path);
    }
    PathBuf::from("/run/perchd/perchd.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- defaults ---

    #[test]
    fn default_capacity_is_5() {
        let config = Config::default();
        assert_eq!(config.strip.capacity, 5);
    }

    #[test]
    fn default_orientation_is_horizontal() {
        let config = Config::default();
        assert_eq!(config.strip.orientation, Orientation::Horizontal);
    }

    #[test]
    fn default_folder_delay_is_0() {
        let config = Config::default();
        assert_eq!(config.drag.folder_delay_ms, 0);
    }

    #[test]
    fn default_reorder_delay_is_50() {
        let config = Config::default();
        assert_eq!(config.drag.reorder_delay_ms, 50);
    }

    #[test]
    fn default_store_path_is_unset() {
        let config = Config::default();
        assert!(config.store.path.is_none());
    }

    // --- derived radii ---

    #[test]
    fn folder_radius_is_55_percent_of_icon() {
        let config = Config::default();
        assert!((config.folder_accept_radius() - 0.55 * 48.0).abs() < f32::EPSILON);
    }

    #[test]
    fn swap_radius_is_wider_than_folder_radius() {
        let config = Config::default();
        assert!(config.swap_radius() > config.folder_accept_radius());
    }

    // --- TOML parsing ---

    #[test]
    fn parse_minimal_toml() {
        let toml = "";
        let config: Config = toml::from_str(toml).unwrap();
        // All defaults should apply
        assert_eq!(config.strip.capacity, 5);
        assert_eq!(config.drag.reorder_delay_ms, 50);
    }

    #[test]
    fn parse_custom_capacity() {
        let toml = r#"
[strip]
capacity = 7
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.strip.capacity, 7);
        // Other fields should still be defaults
        assert_eq!(config.strip.orientation, Orientation::Horizontal);
    }

    #[test]
    fn parse_vertical_orientation() {
        let toml = r#"
[strip]
orientation = "vertical"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.strip.orientation, Orientation::Vertical);
    }

    #[test]
    fn parse_custom_delays() {
        let toml = r#"
[drag]
folder_delay_ms = 120
reorder_delay_ms = 80
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.drag.folder_delay_ms, 120);
        assert_eq!(config.drag.reorder_delay_ms, 80);
    }

    #[test]
    fn parse_store_path() {
        let toml = r#"
[store]
path = "/tmp/layout.json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.store_path(), PathBuf::from("/tmp/layout.json"));
    }

    // --- socket path ---

    #[test]
    fn socket_path_ends_with_perchd_sock() {
        let path = socket_path();
        assert_eq!(path.file_name().unwrap(), "perchd.sock");
    }
}
