//! Ant colony ecosystem simulation: pheromone-driven ants, predators, prey and food,
//! advanced one deterministic tick at a time.

pub mod ant;
pub mod api;
pub mod caterpillar;
pub mod colony;
pub mod config;
pub mod food;
pub mod pheromones;
pub mod schedule;
pub mod simulation;
pub mod snapshot;
pub mod spatial;
pub mod spider;
pub mod steering;
pub mod terrain;
pub mod types;

pub use config::{ConfigError, SimulationConfig};
pub use simulation::Simulation;
pub use snapshot::{SimulationSnapshot, SimulationStats};
