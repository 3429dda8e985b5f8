//! Arena configuration.
//!
//! Holds population, arena geometry and every tuning block. Loaded from a
//! TOML file; a missing or unreadable file falls back to defaults.

use arena_common::ArenaError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::bot::BotTuning;
use crate::projectile::ProjectileTuning;
use crate::scene::ColliderSpec;
use crate::steering::SteeringConfig;

/// Configuration file name.
pub const CONFIG_FILE: &str = "arena.toml";

/// Error types for configuration I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("Config I/O failed: {0}")]
    Io(#[from] io::Error),
    /// File contents are not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    /// Config could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl From<ConfigError> for ArenaError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(err) => Self::Io(err),
            other => Self::Config(other.to_string()),
        }
    }
}

/// Arena configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    // === Simulation ===
    /// RNG seed (None = random)
    pub seed: Option<u64>,
    /// Fixed time step in seconds
    pub fixed_dt: f32,
    /// Global speed multiplier
    pub speed_multiplier: f32,
    /// Level of the human player
    pub player_level: u32,

    // === Population ===
    /// Bots kept in play
    pub population: usize,
    /// Spawn a replacement after each despawn
    pub respawn: bool,
    /// Fixed spawn points; empty = random points inside the arena
    pub spawn_points: Vec<Vec3>,

    // === Arena ===
    /// Half the side length of the square arena
    pub half_extent: f32,
    /// Optional catalog file; the built-in catalog is used when unset
    pub catalog_path: Option<PathBuf>,
    /// Static colliders
    pub obstacles: Vec<ColliderSpec>,

    // === Tuning ===
    /// Per-bot tuning
    pub bot: BotTuning,
    /// Direction selector probe
    pub steering: SteeringConfig,
    /// Projectile flight
    pub projectile: ProjectileTuning,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            seed: None,
            fixed_dt: 1.0 / 60.0,
            speed_multiplier: 1.0,
            player_level: 1,

            population: 8,
            respawn: true,
            spawn_points: Vec::new(),

            half_extent: 20.0,
            catalog_path: None,
            obstacles: Vec::new(),

            bot: BotTuning::default(),
            steering: SteeringConfig::default(),
            projectile: ProjectileTuning::default(),
        }
    }
}

impl ArenaConfig {
    /// Parses a configuration from TOML and validates it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(contents)?;
        config.validate();
        Ok(config)
    }

    /// Loads configuration from `path`, falling back to defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match Self::from_toml_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Saves configuration to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamps values into usable ranges.
    pub fn validate(&mut self) {
        // Simulation
        self.fixed_dt = self.fixed_dt.clamp(0.001, 0.25);
        self.speed_multiplier = self.speed_multiplier.clamp(0.0, 10.0);
        self.player_level = self.player_level.max(1);

        // Arena
        self.half_extent = self.half_extent.clamp(2.0, 1000.0);
        self.population = self.population.min(1024);

        // Tuning
        self.bot.radius = self.bot.radius.clamp(0.05, 5.0);
        self.bot.despawn_delay = self.bot.despawn_delay.max(0.0);
        self.bot.motor.linear_speed = self.bot.motor.linear_speed.max(0.0);
        self.bot.motor.angular_speed = self.bot.motor.angular_speed.max(0.0);
        self.bot.behavior.validate();
        self.steering.max_attempts = self.steering.max_attempts.clamp(1, 1024);
        self.projectile.validate();
    }
}
