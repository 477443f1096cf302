use rand::Rng;
use slotmap::SlotMap;

use crate::ant::Ant;
use crate::config::SimulationConfig;
use crate::pheromones::{Channel, PheromoneField};
use crate::terrain::Terrain;
use crate::types::{AntId, Caste, ColonyId};

/// What one economy pass did to a colony.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EconomyOutcome {
    /// Upkeep overdrew the stockpile; one ant was lost if any remained.
    Starved { removed: bool },
    Spawned(usize),
    Idle,
}

pub struct Colony {
    pub id: ColonyId,
    pub name: String,
    pub color: String,
    pub mound: (f32, f32),
    pub food_stored: f32,
    pub ants: SlotMap<AntId, Ant>,
    pub pheromones: PheromoneField,
}

impl Colony {
    pub fn new(
        id: ColonyId,
        name: impl Into<String>,
        color: impl Into<String>,
        mound: (f32, f32),
        cols: usize,
        rows: usize,
        config: &SimulationConfig,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            mound,
            food_stored: config.colony.initial_food,
            ants: SlotMap::with_key(),
            pheromones: PheromoneField::new(cols, rows),
        }
    }

    pub fn population(&self) -> usize {
        self.ants.len()
    }

    pub fn worker_count(&self) -> usize {
        self.ants
            .values()
            .filter(|ant| ant.caste == Caste::Worker)
            .count()
    }

    pub fn soldier_count(&self) -> usize {
        self.population() - self.worker_count()
    }

    pub fn distance_sq_to_mound(&self, x: f32, y: f32) -> f32 {
        let dx = self.mound.0 - x;
        let dy = self.mound.1 - y;
        dx * dx + dy * dy
    }

    /// Hatch one ant at the mound. Soldiers are chosen while workers exceed the target ratio.
    pub fn spawn_ant<R: Rng>(&mut self, config: &SimulationConfig, rng: &mut R) -> AntId {
        let total = self.population().max(1);
        let worker_fraction = self.worker_count() as f32 / total as f32;
        let caste = if worker_fraction > config.colony.worker_ratio {
            Caste::Soldier
        } else {
            Caste::Worker
        };
        let ant = Ant::new(self.mound.0, self.mound.1, self.id, caste, &config.ants, rng);
        self.ants.insert(ant)
    }

    /// Periodic upkeep: feed the population, starve one ant on shortfall, otherwise hatch.
    pub fn run_economy<R: Rng>(&mut self, config: &SimulationConfig, rng: &mut R) -> EconomyOutcome {
        let cc = &config.colony;
        self.food_stored -= self.population() as f32 * cc.upkeep_per_ant;

        if self.food_stored < 0.0 {
            self.food_stored = 0.0;
            let victim = (!self.ants.is_empty())
                .then(|| self.ants.keys().nth(rng.gen_range(0..self.ants.len())))
                .flatten();
            let removed = victim.and_then(|id| self.ants.remove(id)).is_some();
            return EconomyOutcome::Starved { removed };
        }

        if self.food_stored <= cc.spawn_threshold_low || self.population() >= cc.max_population {
            return EconomyOutcome::Idle;
        }

        let wanted = if self.food_stored > cc.spawn_threshold_high {
            3
        } else if self.food_stored > cc.spawn_threshold_mid {
            2
        } else {
            1
        };
        let mut spawned = 0;
        for _ in 0..wanted {
            if self.population() < cc.max_population && self.food_stored >= cc.spawn_cost {
                self.food_stored -= cc.spawn_cost;
                self.spawn_ant(config, rng);
                spawned += 1;
            }
        }
        EconomyOutcome::Spawned(spawned)
    }
}

/// Wipe the alarm signature around a world point for every colony.
pub(crate) fn clear_alarm_around(colonies: &mut [Colony], terrain: &Terrain, x: f32, y: f32, radius: i32) {
    let (gx, gy) = terrain.world_to_grid(x, y);
    for colony in colonies {
        colony
            .pheromones
            .clear_square(Channel::Alarm, gx, gy, radius);
    }
}
