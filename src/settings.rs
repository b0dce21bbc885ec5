//! Demo settings with persistence
//!
//! Settings are saved to `~/.config/tether/settings.toml`

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tether_core::ClockConfig;
use tether_game::CharacterConfig;
use tether_physics::PhysicsConfig;
use tracing::{info, warn};

/// All demo settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub clock: ClockConfig,
    pub world: WorldSettings,
    pub character: CharacterConfig,
}

impl Settings {
    /// Path of the settings file
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tether").join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load settings from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
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
        let Some(path) = Self::path() else {
            anyhow::bail!("Could not determine config directory");
        };
        self.save_to(&path)
    }

    /// Save settings to a specific file, creating its directory
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Physics configuration for both peers' worlds
    pub fn physics(&self) -> PhysicsConfig {
        PhysicsConfig {
            gravity: Vec3::new(0.0, -self.world.gravity, 0.0),
        }
    }
}

/// Demo world settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Gravity magnitude in m/s²
    pub gravity: f32,
    /// Simulated length of the scripted demo in seconds
    pub demo_seconds: f32,
    /// Where the target dummy stands
    pub dummy_position: Vec3,
    /// Where the grapple point hangs
    pub grapple_position: Vec3,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            demo_seconds: 4.0,
            dummy_position: Vec3::new(0.0, 1.0, -8.0),
            grapple_position: Vec3::new(4.0, 4.0, -6.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::parse(
            r#"
            [world]
            gravity = 4.0
            demo_seconds = 1.0
            dummy_position = [0.0, 1.0, -3.0]
            grapple_position = [0.0, 5.0, 0.0]

            [character.lock_on]
            break_distance = 12.0
            "#,
        )
        .unwrap();

        assert_eq!(settings.world.gravity, 4.0);
        assert_eq!(settings.physics().gravity, Vec3::new(0.0, -4.0, 0.0));
        assert_eq!(settings.character.lock_on.break_distance, 12.0);
        assert_eq!(settings.character.lock_on.detection_radius, 20.0);
        assert_eq!(settings.clock.tick_rate, 60);
    }

    #[test]
    fn test_saved_file_loads_back() {
        let dir = std::env::temp_dir().join(format!("tether-settings-{}", std::process::id()));
        let path = dir.join("nested").join("settings.toml");
        let mut settings = Settings::default();
        settings.world.demo_seconds = 9.5;
        settings.character.lock_on.break_distance = 7.0;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.world.demo_seconds, 9.5);
        assert_eq!(loaded.character.lock_on.break_distance, 7.0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load_from(Path::new("/nonexistent/tether/settings.toml"));
        assert_eq!(settings.world.demo_seconds, 4.0);
    }
}
