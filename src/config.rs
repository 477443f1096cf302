// Global configuration and constants

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config extension: {0}")]
    UnsupportedFormat(String),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

const DEFAULT_CONFIG_PATHS: [&str; 3] = ["config.yaml", "config.yml", "config.json"];

// Configuration struct for simulation parameters
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub terrain: TerrainConfig,
    pub pheromones: PheromoneConfig,
    pub colony: ColonyConfig,
    pub ants: AntConfig,
    pub spiders: SpiderConfig,
    pub caterpillars: CaterpillarConfig,
    pub food: FoodConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    /// Seed for reproducible runs; entropy is used when absent.
    pub rng_seed: Option<u64>,
    pub initial_food_clusters: usize,
    pub initial_caterpillars: usize,
    // Spatial index
    pub bucket_size: f32,
    pub neighbor_radius: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            rng_seed: None,
            initial_food_clusters: 30,
            initial_caterpillars: 6,
            bucket_size: 50.0,
            neighbor_radius: 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    pub cell_size: f32,
    pub rock_blobs: usize,
    pub rock_max_radius: i32,
    pub water_blobs: usize,
    pub water_max_radius: i32,
    /// Blobs never cover cells this close (in cells) to a mound.
    pub mound_safe_radius: f32,
    pub max_placement_attempts: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            cell_size: 5.0,
            rock_blobs: 15,
            rock_max_radius: 5,
            water_blobs: 10,
            water_max_radius: 8,
            mound_safe_radius: 12.0,
            max_placement_attempts: 10_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PheromoneConfig {
    pub decay_interval: u64,
    pub trail_retention: f32,
    pub alarm_retention: f32,
    pub home_deposit: f32,
    pub food_deposit: f32,
    pub alarm_threshold: f32,
    pub alarm_boost: f32,
    // Dying ant
    pub death_alarm: f32,
    pub death_alarm_falloff: f32,
    pub death_alarm_radius: i32,
    // Spider strike
    pub strike_alarm: f32,
    pub strike_alarm_falloff: f32,
    pub strike_alarm_radius: i32,
    // Monster deaths wipe the fear signature
    pub caterpillar_clear_radius: i32,
    pub spider_clear_radius: i32,
}

impl Default for PheromoneConfig {
    fn default() -> Self {
        Self {
            decay_interval: 5,
            trail_retention: 0.975,
            alarm_retention: 0.95,
            home_deposit: 5.0,
            food_deposit: 20.0,
            alarm_threshold: 10.0,
            alarm_boost: 50.0,
            death_alarm: 255.0,
            death_alarm_falloff: 12.0,
            death_alarm_radius: 15,
            strike_alarm: 150.0,
            strike_alarm_falloff: 20.0,
            strike_alarm_radius: 5,
            caterpillar_clear_radius: 15,
            spider_clear_radius: 25,
        }
    }
}

/// Placement and look of one colony; the mound is given as a fraction of the world size.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ColonySpec {
    pub name: String,
    pub color: String,
    pub mound: [f32; 2],
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColonyConfig {
    pub colonies: Vec<ColonySpec>,
    pub initial_food: f32,
    pub initial_ants: usize,
    pub economy_interval: u64,
    pub upkeep_per_ant: f32,
    pub max_population: usize,
    pub spawn_threshold_low: f32,
    pub spawn_threshold_mid: f32,
    pub spawn_threshold_high: f32,
    pub spawn_cost: f32,
    pub worker_ratio: f32,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            colonies: vec![ColonySpec {
                name: "Black".to_owned(),
                color: "#111111".to_owned(),
                mound: [0.5, 0.5],
            }],
            initial_food: 20.0,
            initial_ants: 30,
            economy_interval: 60,
            upkeep_per_ant: 0.05,
            max_population: 150,
            spawn_threshold_low: 25.0,
            spawn_threshold_mid: 50.0,
            spawn_threshold_high: 100.0,
            spawn_cost: 10.0,
            worker_ratio: 0.8,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AntConfig {
    // Castes
    pub worker_health: f32,
    pub worker_damage: f32,
    pub soldier_health: f32,
    pub soldier_damage: f32,
    pub min_age: u32,
    pub age_spread: u32,

    // Speeds
    pub worker_speed: f32,
    pub soldier_speed: f32,
    pub returning_speed: f32,
    pub guarding_speed: f32,
    pub attacking_soldier_speed: f32,
    pub attacking_worker_speed: f32,

    // Combat
    pub look_ahead: f32,
    pub attack_vision: f32,
    pub strike_range: f32,
    pub homing_gain: f32,
    pub monster_stick_jitter: f32,
    pub ant_stick_jitter: f32,
    pub worker_aggro_radius: f32,
    pub soldier_aggro_radius: f32,

    // Foraging
    pub grab_range: f32,
    pub bite_size: f32,
    pub guard_leash: f32,
    pub guard_gain: f32,
    pub mound_arrival_radius: f32,
    pub homeward_near_radius: f32,
    pub homeward_near_gain: f32,
    pub homeward_far_gain: f32,
    pub wander_jitter: f32,

    // Pheromone sensors
    pub sensor_look_ahead: f32,
    pub sensor_angle: f32,
    pub sensor_turn: f32,
}

impl Default for AntConfig {
    fn default() -> Self {
        Self {
            worker_health: 15.0,
            worker_damage: 0.1,
            soldier_health: 80.0,
            soldier_damage: 2.0,
            min_age: 18_000,
            age_spread: 12_000,
            worker_speed: 1.5,
            soldier_speed: 1.2,
            returning_speed: 2.0,
            guarding_speed: 1.0,
            attacking_soldier_speed: 2.0,
            attacking_worker_speed: 2.5,
            look_ahead: 8.0,
            attack_vision: 100.0,
            strike_range: 20.0,
            homing_gain: 0.08,
            monster_stick_jitter: 15.0,
            ant_stick_jitter: 10.0,
            worker_aggro_radius: 50.0,
            soldier_aggro_radius: 150.0,
            grab_range: 10.0,
            bite_size: 5.0,
            guard_leash: 200.0,
            guard_gain: 0.1,
            mound_arrival_radius: 40.0,
            homeward_near_radius: 150.0,
            homeward_near_gain: 0.2,
            homeward_far_gain: 0.05,
            wander_jitter: 0.2,
            sensor_look_ahead: 12.0,
            sensor_angle: std::f32::consts::FRAC_PI_4,
            sensor_turn: 0.15,
        }
    }
}

impl AntConfig {
    pub fn attack_vision_sq(&self) -> f32 {
        self.attack_vision * self.attack_vision
    }

    pub fn strike_range_sq(&self) -> f32 {
        self.strike_range * self.strike_range
    }

    pub fn grab_range_sq(&self) -> f32 {
        self.grab_range * self.grab_range
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpiderConfig {
    pub health: f32,
    pub speed: f32,
    pub min_speed: f32,
    pub slowdown_per_attacker: f32,
    pub vision: f32,
    pub swarm_radius: f32,
    pub strike_range: f32,
    pub damage: f32,
    pub attack_cooldown: u32,
    pub hunger_threshold: u32,
    pub look_ahead: f32,
    pub homing_gain: f32,
    pub wander_jitter: f32,
    /// Total ants (all colonies) needed before the first spider appears.
    pub first_spawn_population: usize,
    pub mound_exclusion: f32,
    pub respawn_delay_ticks: u64,
    pub corpse_food: f32,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            health: 300.0,
            speed: 0.6,
            min_speed: 0.1,
            slowdown_per_attacker: 0.15,
            vision: 100.0,
            swarm_radius: 20.0,
            strike_range: 20.0,
            damage: 15.0,
            attack_cooldown: 60,
            hunger_threshold: 600,
            look_ahead: 15.0,
            homing_gain: 0.1,
            wander_jitter: 0.1,
            first_spawn_population: 60,
            mound_exclusion: 150.0,
            respawn_delay_ticks: 3_600,
            corpse_food: 200.0,
        }
    }
}

impl SpiderConfig {
    pub fn vision_sq(&self) -> f32 {
        self.vision * self.vision
    }

    pub fn swarm_radius_sq(&self) -> f32 {
        self.swarm_radius * self.swarm_radius
    }

    pub fn strike_range_sq(&self) -> f32 {
        self.strike_range * self.strike_range
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaterpillarConfig {
    pub health: f32,
    pub speed: f32,
    pub look_ahead: f32,
    pub wander_jitter: f32,
    pub max_population: usize,
    pub spawn_interval: u64,
    pub edge_inset: f32,
    pub corpse_food: f32,
}

impl Default for CaterpillarConfig {
    fn default() -> Self {
        Self {
            health: 100.0,
            speed: 0.3,
            look_ahead: 12.0,
            wander_jitter: 0.05,
            max_population: 8,
            spawn_interval: 600,
            edge_inset: 20.0,
            corpse_food: 100.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FoodConfig {
    pub min_cluster_amount: u32,
    pub max_cluster_amount: u32,
    /// Amount used by player food drops when none is given.
    pub player_amount: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            min_cluster_amount: 20,
            max_cluster_amount: 69,
            player_amount: 50.0,
        }
    }
}

impl SimulationConfig {
    /// Load a config file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config: Self = match extension.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&text)?,
            "json" => serde_json::from_str(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_owned())),
        };
        config.validate()?;
        Ok(config)
    }

    /// Search the working directory for a config file, falling back to defaults.
    pub fn from_default_paths() -> Self {
        for candidate in DEFAULT_CONFIG_PATHS {
            if !Path::new(candidate).exists() {
                continue;
            }
            match Self::from_file(candidate) {
                Ok(config) => {
                    log::info!("loaded configuration from {candidate}");
                    return config;
                }
                Err(err) => log::warn!("ignoring {candidate}: {err}"),
            }
        }
        log::info!("no config file found, using defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.world.width) || !positive(self.world.height) {
            return Err(ConfigError::Invalid("world dimensions must be positive"));
        }
        if self.terrain.cell_size <= 0.0 || self.world.bucket_size <= 0.0 {
            return Err(ConfigError::Invalid(
                "terrain cell_size and bucket_size must be positive",
            ));
        }
        if self.terrain.max_placement_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_placement_attempts must be non-zero",
            ));
        }
        if self.pheromones.decay_interval == 0
            || self.colony.economy_interval == 0
            || self.caterpillars.spawn_interval == 0
        {
            return Err(ConfigError::Invalid("periodic intervals must be non-zero"));
        }
        let retention_ok = |r: f32| r > 0.0 && r < 1.0;
        if !retention_ok(self.pheromones.trail_retention)
            || !retention_ok(self.pheromones.alarm_retention)
        {
            return Err(ConfigError::Invalid(
                "pheromone retention factors must lie in (0, 1)",
            ));
        }
        if self.colony.colonies.is_empty() {
            return Err(ConfigError::Invalid("at least one colony is required"));
        }
        if self
            .colony
            .colonies
            .iter()
            .flat_map(|spec| spec.mound)
            .any(|f| !(0.0..=1.0).contains(&f))
        {
            return Err(ConfigError::Invalid(
                "colony mound fractions must lie in [0, 1]",
            ));
        }
        if self.colony.max_population == 0 {
            return Err(ConfigError::Invalid("max_population must be non-zero"));
        }
        if self.food.min_cluster_amount > self.food.max_cluster_amount {
            return Err(ConfigError::Invalid(
                "min_cluster_amount cannot exceed max_cluster_amount",
            ));
        }
        Ok(())
    }
}
