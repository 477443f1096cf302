use rand::Rng;
use serde::Serialize;
use slotmap::SlotMap;

use crate::ant::AntRef;
use crate::colony::{clear_alarm_around, Colony};
use crate::config::{SimulationConfig, SpiderConfig};
use crate::food::{drop_food, FoodCluster};
use crate::pheromones::Channel;
use crate::spatial::SpatialIndex;
use crate::steering::{jitter, keep_in_bounds, obstacle_turn, steer_towards, wrap_signed_angle};
use crate::terrain::Terrain;
use crate::types::{AntState, FoodId, SpiderId, SpiderState};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Spider {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub speed: f32,
    pub health: f32,
    pub max_health: f32,
    /// Ticks since spawn. Nothing feeds a spider, so this only grows.
    pub hunger: u32,
    pub attack_cooldown: u32,
    pub state: SpiderState,
}

impl Spider {
    pub fn new<R: Rng>(x: f32, y: f32, config: &SpiderConfig, rng: &mut R) -> Self {
        Self {
            x,
            y,
            heading: rng.gen_range(0.0..std::f32::consts::TAU),
            speed: config.speed,
            health: config.health,
            max_health: config.health,
            hunger: 0,
            attack_cooldown: 0,
            state: SpiderState::Wandering,
        }
    }
}

/// Open point at least `mound_exclusion` away from every mound.
pub fn spawn_point<R: Rng>(
    terrain: &Terrain,
    mounds: &[(f32, f32)],
    config: &SimulationConfig,
    rng: &mut R,
) -> Option<(f32, f32)> {
    let (width, height) = (terrain.width(), terrain.height());
    let exclusion_sq = config.spiders.mound_exclusion * config.spiders.mound_exclusion;
    terrain.find_open_point(
        rng,
        config.terrain.max_placement_attempts,
        |rng| (rng.gen_range(0.0..width), rng.gen_range(0.0..height)),
        |x, y| {
            mounds.iter().all(|&(mx, my)| {
                let (dx, dy) = (x - mx, y - my);
                dx * dx + dy * dy >= exclusion_sq
            })
        },
    )
}

/// Shared state a spider reads and writes during its update.
pub(crate) struct SpiderWorld<'a> {
    pub config: &'a SimulationConfig,
    pub terrain: &'a Terrain,
    pub index: &'a SpatialIndex,
    pub colonies: &'a mut [Colony],
    pub foods: &'a mut SlotMap<FoodId, FoodCluster>,
}

/// What a spider sees among nearby ants.
#[derive(Clone, Copy, Debug, Default)]
struct Surroundings {
    nearest: Option<(AntRef, f32, f32, f32)>,
    swarmed: bool,
    attackers_close: usize,
}

/// Advance every spider one tick. Returns how many died.
pub(crate) fn update_spiders<R: Rng>(
    spiders: &mut SlotMap<SpiderId, Spider>,
    world: &mut SpiderWorld<'_>,
    rng: &mut R,
) -> usize {
    let ids: Vec<SpiderId> = spiders.keys().collect();
    let mut deaths = 0;
    for id in ids {
        let Some(spider) = spiders.get_mut(id) else {
            continue;
        };
        if spider.health <= 0.0 {
            let (x, y) = (spider.x, spider.y);
            spiders.remove(id);
            let sc = &world.config.spiders;
            drop_food(world.foods, world.terrain, x, y, sc.corpse_food);
            clear_alarm_around(
                world.colonies,
                world.terrain,
                x,
                y,
                world.config.pheromones.spider_clear_radius,
            );
            log::info!("spider died at ({x:.0}, {y:.0})");
            deaths += 1;
            continue;
        }
        step_spider(spider, world, rng);
    }
    deaths
}

fn survey(spider: &Spider, world: &SpiderWorld<'_>) -> Surroundings {
    let sc = &world.config.spiders;
    let vision_sq = sc.vision_sq();
    let swarm_sq = sc.swarm_radius_sq();
    let mut seen = Surroundings::default();

    for bucket in world.index.neighbors(spider.x, spider.y, world.config.world.neighbor_radius) {
        for &r in &bucket.ants {
            let Some(ant) = world.colonies[r.colony.0].ants.get(r.ant) else {
                continue;
            };
            let (dx, dy) = (ant.x - spider.x, ant.y - spider.y);
            let dist_sq = dx * dx + dy * dy;
            if dist_sq >= vision_sq {
                continue;
            }
            let attacking = ant.state == AntState::Attacking;
            seen.swarmed |= attacking;
            if attacking && dist_sq < swarm_sq {
                seen.attackers_close += 1;
            }
            if seen.nearest.map_or(true, |(_, _, _, d)| dist_sq < d) {
                seen.nearest = Some((r, ant.x, ant.y, dist_sq));
            }
        }
    }
    seen
}

fn step_spider<R: Rng>(spider: &mut Spider, world: &mut SpiderWorld<'_>, rng: &mut R) {
    let config = world.config;
    let sc = &config.spiders;
    let ph = &config.pheromones;

    spider.hunger = spider.hunger.saturating_add(1);
    spider.attack_cooldown = spider.attack_cooldown.saturating_sub(1);

    let seen = survey(spider, world);
    spider.speed =
        (sc.speed - seen.attackers_close as f32 * sc.slowdown_per_attacker).max(sc.min_speed);
    spider.state = if seen.swarmed {
        SpiderState::Fighting
    } else if spider.hunger > sc.hunger_threshold {
        SpiderState::Hunting
    } else {
        SpiderState::Wandering
    };

    let engaged = matches!(spider.state, SpiderState::Hunting | SpiderState::Fighting);
    if world.terrain.probe(spider.x, spider.y, spider.heading, sc.look_ahead) {
        spider.heading = obstacle_turn(spider.heading, rng);
    } else if let (true, Some((target, tx, ty, dist_sq))) = (engaged, seen.nearest) {
        spider.heading = steer_towards(spider.heading, tx - spider.x, ty - spider.y, sc.homing_gain);
        if dist_sq < sc.strike_range_sq() && spider.attack_cooldown == 0 {
            spider.attack_cooldown = sc.attack_cooldown;
            let victim_colony = &mut world.colonies[target.colony.0];
            let survived = victim_colony.ants.get_mut(target.ant).is_some_and(|ant| {
                ant.health -= sc.damage;
                ant.health > 0.0
            });
            if survived {
                let (gx, gy) = world.terrain.world_to_grid(spider.x, spider.y);
                victim_colony.pheromones.deposit_radial(
                    Channel::Alarm,
                    gx,
                    gy,
                    ph.strike_alarm,
                    ph.strike_alarm_falloff,
                    ph.strike_alarm_radius,
                );
            }
        }
    } else {
        spider.heading = jitter(spider.heading, sc.wander_jitter, rng);
    }

    spider.x += spider.heading.cos() * spider.speed;
    spider.y += spider.heading.sin() * spider.speed;
    keep_in_bounds(
        &mut spider.x,
        &mut spider.y,
        &mut spider.heading,
        world.terrain.width(),
        world.terrain.height(),
    );
    spider.heading = wrap_signed_angle(spider.heading);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ant::Ant;
    use crate::caterpillar::Caterpillar;
    use crate::types::{AntId, Caste, CaterpillarId, ColonyId, TerrainKind};
    use rand::rngs::StdRng;
    use std::f32::consts::FRAC_PI_2;
    use rand::SeedableRng;

    struct Fixture {
        config: SimulationConfig,
        terrain: Terrain,
        index: SpatialIndex,
        colonies: Vec<Colony>,
        foods: SlotMap<FoodId, FoodCluster>,
        spiders: SlotMap<SpiderId, Spider>,
        rng: StdRng,
    }

    impl Fixture {
        fn new() -> Self {
            let config = SimulationConfig::default();
            let terrain = Terrain::open(400.0, 400.0, 5.0);
            let colonies = (0..2)
                .map(|i| {
                    Colony::new(ColonyId(i), "c", "#000", (20.0, 20.0), terrain.cols(), terrain.rows(), &config)
                })
                .collect();
            Self {
                index: SpatialIndex::new(400.0, 400.0, config.world.bucket_size),
                config,
                terrain,
                colonies,
                foods: SlotMap::with_key(),
                spiders: SlotMap::with_key(),
                rng: StdRng::seed_from_u64(3),
            }
        }

        fn add_spider(&mut self, x: f32, y: f32) -> SpiderId {
            let mut spider = Spider::new(x, y, &self.config.spiders, &mut self.rng);
            spider.heading = 0.0;
            self.spiders.insert(spider)
        }

        fn add_ant(&mut self, colony: usize, x: f32, y: f32, state: AntState) -> AntId {
            let mut ant = Ant::new(x, y, ColonyId(colony), Caste::Worker, &self.config.ants, &mut self.rng);
            ant.state = state;
            self.colonies[colony].ants.insert(ant)
        }

        fn tick(&mut self) -> usize {
            let caterpillars: SlotMap<CaterpillarId, Caterpillar> = SlotMap::with_key();
            self.index
                .rebuild(&self.colonies, &self.spiders, &caterpillars, &self.foods);
            let mut world = SpiderWorld {
                config: &self.config,
                terrain: &self.terrain,
                index: &self.index,
                colonies: &mut self.colonies,
                foods: &mut self.foods,
            };
            update_spiders(&mut self.spiders, &mut world, &mut self.rng)
        }
    }

    #[test]
    fn fresh_spider_wanders_then_hunts_forever() {
        let mut fx = Fixture::new();
        let id = fx.add_spider(200.0, 200.0);
        fx.tick();
        assert_eq!(fx.spiders[id].state, SpiderState::Wandering);
        assert_eq!(fx.spiders[id].hunger, 1);

        fx.spiders[id].hunger = 600;
        fx.tick();
        assert_eq!(fx.spiders[id].state, SpiderState::Hunting);
        for _ in 0..50 {
            fx.tick();
            assert_eq!(fx.spiders[id].state, SpiderState::Hunting);
        }
    }

    #[test]
    fn attacking_ants_swarm_and_slow_the_spider() {
        let mut fx = Fixture::new();
        let id = fx.add_spider(200.0, 200.0);
        fx.add_ant(0, 210.0, 200.0, AntState::Attacking);
        fx.add_ant(0, 200.0, 210.0, AntState::Attacking);
        fx.add_ant(1, 190.0, 200.0, AntState::Attacking);
        fx.tick();
        let spider = fx.spiders[id];
        assert_eq!(spider.state, SpiderState::Fighting);
        assert!((spider.speed - (0.6 - 3.0 * 0.15)).abs() < 1e-6);

        for i in 0..5 {
            fx.add_ant(1, 195.0 + i as f32, 195.0, AntState::Attacking);
        }
        fx.tick();
        assert_eq!(fx.spiders[id].speed, 0.1);
    }

    #[test]
    fn strike_hurts_target_and_alarms_its_colony() {
        let mut fx = Fixture::new();
        let id = fx.add_spider(200.0, 200.0);
        fx.spiders[id].hunger = 1_000;
        let victim = fx.add_ant(1, 210.0, 200.0, AntState::Foraging);
        fx.colonies[1].ants[victim].health = 40.0;
        fx.tick();

        assert_eq!(fx.colonies[1].ants[victim].health, 25.0);
        assert_eq!(fx.spiders[id].attack_cooldown, 60);
        assert_eq!(fx.colonies[1].pheromones.get(Channel::Alarm, 40, 40), 150.0);
        assert_eq!(fx.colonies[1].pheromones.get(Channel::Alarm, 45, 40), 50.0);
        assert_eq!(fx.colonies[0].pheromones.active_len(), 0);

        fx.tick();
        assert_eq!(fx.colonies[1].ants[victim].health, 25.0, "cooldown blocks a second bite");
    }

    #[test]
    fn killing_bite_leaves_no_alarm_pulse() {
        let mut fx = Fixture::new();
        let id = fx.add_spider(200.0, 200.0);
        fx.spiders[id].hunger = 1_000;
        fx.add_ant(0, 205.0, 200.0, AntState::Foraging);
        fx.tick();
        assert_eq!(fx.colonies[0].pheromones.active_len(), 0);
    }

    #[test]
    fn death_drops_food_and_clears_alarm_everywhere() {
        let mut fx = Fixture::new();
        let id = fx.add_spider(200.0, 200.0);
        for colony in &mut fx.colonies {
            colony.pheromones.deposit_max(Channel::Alarm, 45, 45, 200.0);
            colony.pheromones.deposit_max(Channel::Alarm, 70, 70, 200.0);
        }
        fx.spiders[id].health = 0.0;
        assert_eq!(fx.tick(), 1);
        assert!(fx.spiders.is_empty());

        let corpse: Vec<&FoodCluster> = fx.foods.values().collect();
        assert_eq!(corpse.len(), 1);
        assert_eq!((corpse[0].x, corpse[0].y, corpse[0].amount), (200.0, 200.0, 200.0));
        for colony in &fx.colonies {
            assert_eq!(colony.pheromones.get(Channel::Alarm, 45, 45), 0.0);
            assert_eq!(colony.pheromones.get(Channel::Alarm, 70, 70), 200.0);
        }
    }

    #[test]
    fn rock_ahead_turns_the_spider() {
        let mut fx = Fixture::new();
        // Look-ahead from (200, 200) facing east lands in cell (43, 40).
        fx.terrain.set(43, 40, TerrainKind::Rock);
        let id = fx.add_spider(200.0, 200.0);
        fx.tick();
        let spider = fx.spiders[id];
        assert!((spider.heading - FRAC_PI_2).abs() <= 0.25 + 1e-5, "heading = {}", spider.heading);
        assert!(spider.y > 200.0);
    }

    #[test]
    fn spawn_point_keeps_clear_of_mounds() {
        let config = SimulationConfig::default();
        let terrain = Terrain::open(600.0, 400.0, 5.0);
        let mut rng = StdRng::seed_from_u64(11);
        let mounds = [(300.0, 200.0), (50.0, 50.0)];
        for _ in 0..100 {
            let (x, y) = spawn_point(&terrain, &mounds, &config, &mut rng).expect("open world");
            for (mx, my) in mounds {
                assert!((x - mx).hypot(y - my) >= 150.0);
            }
        }
    }
}
