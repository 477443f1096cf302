use rand::Rng;
use rayon::prelude::*;
use slotmap::SlotMap;

use crate::ant::{update_ants, AntWorld};
use crate::caterpillar::{edge_spawn_point, update_caterpillars, Caterpillar, CaterpillarWorld};
use crate::colony::{Colony, EconomyOutcome};
use crate::config::{ConfigError, SimulationConfig};
use crate::food::{random_amount, FoodCluster};
use crate::pheromones::Retention;
use crate::schedule::{EventQueue, ScheduledEvent};
use crate::snapshot::{SimulationSnapshot, SimulationStats, TerrainSnapshot};
use crate::spatial::SpatialIndex;
use crate::spider::{spawn_point, update_spiders, Spider, SpiderWorld};
use crate::terrain::Terrain;
use crate::types::{CaterpillarId, ColonyId, FoodId, SpiderId};

pub const MIN_SPEED_MULTIPLIER: f32 = 0.1;
pub const MAX_SPEED_MULTIPLIER: f32 = 10.0;

// Simulation state - everything a tick mutates
pub struct SimulationState {
    pub terrain: Terrain,
    /// Bucket grid as of the start of the current tick; never re-sorted mid-tick.
    pub index: SpatialIndex,
    pub colonies: Vec<Colony>,
    pub foods: SlotMap<FoodId, FoodCluster>,
    pub spiders: SlotMap<SpiderId, Spider>,
    pub caterpillars: SlotMap<CaterpillarId, Caterpillar>,
    pub tick: u64,
    pub first_spider_spawned: bool,
    pub events: EventQueue,
}

impl SimulationState {
    /// Lay out terrain around the configured mounds, then populate the world.
    pub fn build<R: Rng>(config: &SimulationConfig, rng: &mut R) -> Self {
        let (width, height) = (config.world.width, config.world.height);
        let mounds: Vec<(f32, f32)> = config
            .colony
            .colonies
            .iter()
            .map(|spec| (spec.mound[0] * width, spec.mound[1] * height))
            .collect();
        let terrain = Terrain::generate(config, &mounds, rng);

        let mut colonies: Vec<Colony> = config
            .colony
            .colonies
            .iter()
            .zip(&mounds)
            .enumerate()
            .map(|(i, (spec, &mound))| {
                Colony::new(
                    ColonyId(i),
                    spec.name.as_str(),
                    spec.color.as_str(),
                    mound,
                    terrain.cols(),
                    terrain.rows(),
                    config,
                )
            })
            .collect();
        for colony in &mut colonies {
            for _ in 0..config.colony.initial_ants {
                colony.spawn_ant(config, rng);
            }
        }

        let mut state = Self {
            index: SpatialIndex::new(width, height, config.world.bucket_size),
            terrain,
            colonies,
            foods: SlotMap::with_key(),
            spiders: SlotMap::with_key(),
            caterpillars: SlotMap::with_key(),
            tick: 0,
            first_spider_spawned: false,
            events: EventQueue::new(),
        };
        for _ in 0..config.world.initial_food_clusters {
            state.scatter_food(config, rng);
        }
        for _ in 0..config.world.initial_caterpillars {
            state.spawn_caterpillar(config, rng);
        }

        log::info!(
            "world built: {}x{}, {} colonies, {} ants, {} food clusters, {} caterpillars",
            width,
            height,
            state.colonies.len(),
            state.total_ants(),
            state.foods.len(),
            state.caterpillars.len()
        );
        state
    }

    pub fn total_ants(&self) -> usize {
        self.colonies.iter().map(Colony::population).sum()
    }

    pub fn mounds(&self) -> Vec<(f32, f32)> {
        self.colonies.iter().map(|colony| colony.mound).collect()
    }

    /// Drop a random-sized cluster on a random open cell.
    fn scatter_food<R: Rng>(&mut self, config: &SimulationConfig, rng: &mut R) -> Option<FoodId> {
        let (width, height) = (self.terrain.width(), self.terrain.height());
        let point = self.terrain.find_open_point(
            rng,
            config.terrain.max_placement_attempts,
            |rng| (rng.gen_range(0.0..width), rng.gen_range(0.0..height)),
            |_, _| true,
        );
        let Some((x, y)) = point else {
            log::warn!("no open terrain left for food");
            return None;
        };
        let amount = random_amount(&config.food, rng);
        Some(self.foods.insert(FoodCluster::new(x, y, amount)))
    }

    fn spawn_caterpillar<R: Rng>(&mut self, config: &SimulationConfig, rng: &mut R) -> Option<CaterpillarId> {
        let Some((x, y)) = edge_spawn_point(&self.terrain, config, rng) else {
            log::warn!("no open edge cell for a caterpillar");
            return None;
        };
        log::debug!("caterpillar spawned at ({x:.0}, {y:.0})");
        Some(
            self.caterpillars
                .insert(Caterpillar::new(x, y, &config.caterpillars, rng)),
        )
    }

    fn spawn_spider<R: Rng>(&mut self, config: &SimulationConfig, rng: &mut R) -> Option<SpiderId> {
        let mounds = self.mounds();
        let Some((x, y)) = spawn_point(&self.terrain, &mounds, config, rng) else {
            log::warn!("no open cell far enough from the mounds for a spider");
            return None;
        };
        log::debug!("spider spawned at ({x:.0}, {y:.0}) on tick {}", self.tick);
        Some(self.spiders.insert(Spider::new(x, y, &config.spiders, rng)))
    }
}

// Simulation - contains state, config, and control flags
pub struct Simulation {
    pub state: SimulationState,
    pub config: SimulationConfig,
    pub paused: bool,
    pub speed_multiplier: f32,
    pub speed_accumulator: f32,
}

// Deref so callers can write sim.colonies instead of sim.state.colonies
impl std::ops::Deref for Simulation {
    type Target = SimulationState;
    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl std::ops::DerefMut for Simulation {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

impl Simulation {
    /// Default world of the given pixel size.
    pub fn new<R: Rng>(rng: &mut R, width: f32, height: f32) -> Result<Self, ConfigError> {
        let mut config = SimulationConfig::default();
        config.world.width = width;
        config.world.height = height;
        Self::with_config(rng, config)
    }

    /// Build a world from `config`, refusing settings that fail validation.
    pub fn with_config<R: Rng>(rng: &mut R, config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = SimulationState::build(&config, rng);
        Ok(Self {
            state,
            config,
            paused: false,
            speed_multiplier: 1.0,
            speed_accumulator: 0.0,
        })
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn set_speed(&mut self, multiplier: f32) -> f32 {
        self.speed_multiplier = if multiplier.is_finite() {
            multiplier.clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER)
        } else {
            1.0
        };
        self.speed_multiplier
    }

    /// Rebuild the world from the current config. Pending events die with the old state.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        self.state.events.cancel_all();
        self.state = SimulationState::build(&self.config, rng);
        self.speed_accumulator = 0.0;
    }

    /// One display frame: runs as many ticks as the speed multiplier has accumulated.
    pub fn run_frame<R: Rng>(&mut self, rng: &mut R) -> usize {
        if self.paused {
            return 0;
        }
        self.speed_accumulator += self.speed_multiplier;
        let steps = self.speed_accumulator.floor() as usize;
        self.speed_accumulator -= steps as f32;
        for _ in 0..steps {
            self.tick(rng);
        }
        steps
    }

    /// Place player food. Ignored on rock, water, outside the world, or for a non-positive amount.
    pub fn spawn_food_at(&mut self, x: f32, y: f32, amount: f32) -> bool {
        if !(amount > 0.0 && amount.is_finite()) || !self.state.terrain.is_open_at(x, y) {
            return false;
        }
        self.state.foods.insert(FoodCluster::new(x, y, amount));
        true
    }

    pub fn snapshot(&self, include_fields: bool) -> SimulationSnapshot {
        SimulationSnapshot::capture(&self.state, include_fields)
    }

    pub fn terrain_snapshot(&self) -> TerrainSnapshot {
        let terrain = &self.state.terrain;
        TerrainSnapshot {
            cols: terrain.cols(),
            rows: terrain.rows(),
            cell_size: terrain.cell_size(),
            cells: terrain.cells().to_vec(),
        }
    }

    pub fn stats(&self) -> SimulationStats {
        SimulationStats::capture(&self.state)
    }

    /// Advance the world by exactly one step.
    pub fn tick<R: Rng>(&mut self, rng: &mut R) {
        let config = &self.config;
        let state = &mut self.state;
        state.tick += 1;

        for event in state.events.drain_due(state.tick) {
            match event {
                ScheduledEvent::RespawnSpider => {
                    state.spawn_spider(config, rng);
                }
            }
        }

        state
            .index
            .rebuild(&state.colonies, &state.spiders, &state.caterpillars, &state.foods);

        if !state.first_spider_spawned && state.total_ants() >= config.spiders.first_spawn_population {
            state.first_spider_spawned = true;
            state.spawn_spider(config, rng);
        }

        if state.tick % config.colony.economy_interval == 0 {
            for colony in &mut state.colonies {
                match colony.run_economy(config, rng) {
                    EconomyOutcome::Starved { removed } => log::debug!(
                        "{} starving on tick {} (lost an ant: {removed})",
                        colony.name,
                        state.tick
                    ),
                    EconomyOutcome::Spawned(n) if n > 0 => log::debug!(
                        "{} hatched {n}, population {}, stock {:.1}",
                        colony.name,
                        colony.population(),
                        colony.food_stored
                    ),
                    _ => {}
                }
            }
        }

        if state.tick % config.pheromones.decay_interval == 0 {
            let retention = Retention {
                trail: config.pheromones.trail_retention,
                alarm: config.pheromones.alarm_retention,
            };
            state
                .colonies
                .par_iter_mut()
                .for_each(|colony| colony.pheromones.decay(retention));
        }

        let cc = &config.caterpillars;
        if state.tick % cc.spawn_interval == 0 && state.caterpillars.len() < cc.max_population {
            state.spawn_caterpillar(config, rng);
        }
        let mut world = CaterpillarWorld {
            config,
            terrain: &state.terrain,
            colonies: &mut state.colonies,
            foods: &mut state.foods,
        };
        update_caterpillars(&mut state.caterpillars, &mut world, rng);

        let mut world = SpiderWorld {
            config,
            terrain: &state.terrain,
            index: &state.index,
            colonies: &mut state.colonies,
            foods: &mut state.foods,
        };
        let spider_deaths = update_spiders(&mut state.spiders, &mut world, rng);
        for _ in 0..spider_deaths {
            state.events.schedule(
                state.tick + config.spiders.respawn_delay_ticks,
                ScheduledEvent::RespawnSpider,
            );
        }

        let mut ant_deaths = 0;
        for i in 0..state.colonies.len() {
            let mut world = AntWorld {
                config,
                terrain: &state.terrain,
                index: &state.index,
                colonies: &mut state.colonies,
                foods: &mut state.foods,
                spiders: &mut state.spiders,
                caterpillars: &mut state.caterpillars,
            };
            ant_deaths += update_ants(&mut world, ColonyId(i), rng);
        }

        log::trace!(
            "tick {}: {} ants ({} died), {} food clusters, {} spiders, {} caterpillars",
            state.tick,
            state.total_ants(),
            ant_deaths,
            state.foods.len(),
            state.spiders.len(),
            state.caterpillars.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TerrainKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.world.width = 400.0;
        config.world.height = 300.0;
        config
    }

    #[test]
    fn construction_populates_the_world() {
        let mut rng = StdRng::seed_from_u64(1);
        let sim = Simulation::new(&mut rng, 1200.0, 800.0).expect("valid config");
        assert_eq!(sim.colonies.len(), 1);
        assert_eq!(sim.colonies[0].mound, (600.0, 400.0));
        assert_eq!(sim.colonies[0].population(), 30);
        assert_eq!(sim.foods.len(), 30);
        assert_eq!(sim.caterpillars.len(), 6);
        assert!(sim.spiders.is_empty());
        assert!(sim
            .foods
            .values()
            .all(|food| sim.terrain.is_open_at(food.x, food.y)));
        assert!(sim
            .caterpillars
            .values()
            .all(|c| sim.terrain.is_open_at(c.x, c.y)));
    }

    #[test]
    fn construction_rejects_unusable_configs() {
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            Simulation::new(&mut rng, 0.0, 800.0),
            Err(ConfigError::Invalid(_))
        ));
        assert!(Simulation::new(&mut rng, f32::NAN, 800.0).is_err());

        let mut config = small_config();
        config.food.min_cluster_amount = 80;
        config.food.max_cluster_amount = 20;
        assert!(Simulation::with_config(&mut rng, config).is_err());
    }

    #[test]
    fn mound_surroundings_stay_open() {
        let mut rng = StdRng::seed_from_u64(99);
        let sim = Simulation::new(&mut rng, 1200.0, 800.0).expect("valid config");
        let (mgx, mgy) = sim.terrain.world_to_grid(600.0, 400.0);
        for dx in -12..=12 {
            for dy in -12..=12 {
                if dx * dx + dy * dy <= 144 {
                    assert_eq!(sim.terrain.kind(mgx + dx, mgy + dy), Some(TerrainKind::Open));
                }
            }
        }
    }

    #[test]
    fn first_spider_appears_once_population_is_reached() {
        let mut config = small_config();
        config.colony.initial_ants = 60;
        let mut rng = StdRng::seed_from_u64(4);
        let mut sim = Simulation::with_config(&mut rng, config).expect("valid config");
        sim.tick(&mut rng);
        assert!(sim.first_spider_spawned);
        assert_eq!(sim.spiders.len(), 1);
        let spider = sim.spiders.values().next().copied().expect("spider");
        // Spawned at least 150 away, then allowed one step of movement.
        assert!((spider.x - 200.0).hypot(spider.y - 150.0) >= 149.0);

        sim.spiders.clear();
        sim.tick(&mut rng);
        assert!(sim.spiders.is_empty(), "the trigger fires only once");
    }

    #[test]
    fn spider_death_schedules_respawn() {
        let mut config = small_config();
        config.colony.initial_ants = 0;
        config.spiders.respawn_delay_ticks = 10;
        config.colony.colonies[0].mound = [0.1, 0.1];
        let mut rng = StdRng::seed_from_u64(8);
        let mut sim = Simulation::with_config(&mut rng, config).expect("valid config");
        let mut spider = Spider::new(300.0, 200.0, &sim.config.spiders, &mut rng);
        spider.health = 0.0;
        sim.spiders.insert(spider);

        sim.tick(&mut rng);
        assert!(sim.spiders.is_empty());
        assert_eq!(sim.events.pending(), vec![(11, ScheduledEvent::RespawnSpider)]);
        assert!(sim.foods.values().any(|food| food.amount == 200.0));

        for _ in 0..9 {
            sim.tick(&mut rng);
        }
        assert!(sim.spiders.is_empty());
        sim.tick(&mut rng);
        assert_eq!(sim.spiders.len(), 1);
        assert!(sim.events.is_empty());
    }

    #[test]
    fn reset_drops_pending_events() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sim = Simulation::with_config(&mut rng, small_config()).expect("valid config");
        sim.state.events.schedule(50, ScheduledEvent::RespawnSpider);
        for _ in 0..5 {
            sim.tick(&mut rng);
        }
        sim.reset(&mut rng);
        assert_eq!(sim.tick, 0);
        assert!(sim.events.is_empty());
        assert_eq!(sim.colonies[0].population(), 30);
    }

    #[test]
    fn caterpillars_respawn_on_schedule_up_to_cap() {
        let mut config = small_config();
        config.world.initial_caterpillars = 0;
        config.caterpillars.spawn_interval = 3;
        config.caterpillars.max_population = 2;
        let mut rng = StdRng::seed_from_u64(6);
        let mut sim = Simulation::with_config(&mut rng, config).expect("valid config");
        sim.tick(&mut rng);
        sim.tick(&mut rng);
        assert!(sim.caterpillars.is_empty());
        sim.tick(&mut rng);
        assert_eq!(sim.caterpillars.len(), 1);
        for _ in 0..30 {
            sim.tick(&mut rng);
        }
        assert_eq!(sim.caterpillars.len(), 2);
    }

    #[test]
    fn run_frame_honours_pause_and_speed() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut sim = Simulation::with_config(&mut rng, small_config()).expect("valid config");
        assert_eq!(sim.set_speed(0.5), 0.5);
        assert_eq!(sim.run_frame(&mut rng), 0);
        assert_eq!(sim.run_frame(&mut rng), 1);
        assert_eq!(sim.set_speed(50.0), MAX_SPEED_MULTIPLIER);
        assert_eq!(sim.run_frame(&mut rng), 10);
        sim.toggle_pause();
        assert_eq!(sim.run_frame(&mut rng), 0);
        assert_eq!(sim.tick, 11);
    }

    #[test]
    fn player_food_respects_terrain() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut sim = Simulation::with_config(&mut rng, small_config()).expect("valid config");
        sim.state.terrain.set(2, 2, TerrainKind::Water);
        let before = sim.foods.len();
        assert!(!sim.spawn_food_at(12.0, 12.0, 50.0));
        assert!(!sim.spawn_food_at(-5.0, 12.0, 50.0));
        assert_eq!(sim.foods.len(), before);
        assert!(sim.spawn_food_at(200.0, 150.0, 50.0));
        assert_eq!(sim.foods.len(), before + 1);
    }
}
