use rand::Rng;
use serde::Serialize;
use slotmap::SlotMap;

use crate::colony::{clear_alarm_around, Colony};
use crate::config::{CaterpillarConfig, SimulationConfig};
use crate::food::{drop_food, FoodCluster};
use crate::steering::{jitter, keep_in_bounds, obstacle_turn, wrap_signed_angle};
use crate::terrain::Terrain;
use crate::types::{CaterpillarId, FoodId};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Caterpillar {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub speed: f32,
    pub health: f32,
    pub max_health: f32,
}

impl Caterpillar {
    pub fn new<R: Rng>(x: f32, y: f32, config: &CaterpillarConfig, rng: &mut R) -> Self {
        Self {
            x,
            y,
            heading: rng.gen_range(0.0..std::f32::consts::TAU),
            speed: config.speed,
            health: config.health,
            max_health: config.health,
        }
    }
}

/// Open point on a line inset from one of the four world edges.
pub fn edge_spawn_point<R: Rng>(
    terrain: &Terrain,
    config: &SimulationConfig,
    rng: &mut R,
) -> Option<(f32, f32)> {
    let (width, height) = (terrain.width(), terrain.height());
    let inset = config.caterpillars.edge_inset;
    terrain.find_open_point(
        rng,
        config.terrain.max_placement_attempts,
        |rng| {
            let far_side = rng.gen_bool(0.5);
            if rng.gen_bool(0.5) {
                let x = if far_side { width - inset } else { inset };
                (x, rng.gen_range(0.0..height))
            } else {
                let y = if far_side { height - inset } else { inset };
                (rng.gen_range(0.0..width), y)
            }
        },
        |_, _| true,
    )
}

pub(crate) struct CaterpillarWorld<'a> {
    pub config: &'a SimulationConfig,
    pub terrain: &'a Terrain,
    pub colonies: &'a mut [Colony],
    pub foods: &'a mut SlotMap<FoodId, FoodCluster>,
}

/// Move every caterpillar and turn the dead into food. Returns how many died.
pub(crate) fn update_caterpillars<R: Rng>(
    caterpillars: &mut SlotMap<CaterpillarId, Caterpillar>,
    world: &mut CaterpillarWorld<'_>,
    rng: &mut R,
) -> usize {
    let cc = &world.config.caterpillars;
    let terrain = world.terrain;
    let mut dead = Vec::new();

    for (id, caterpillar) in caterpillars.iter_mut() {
        if caterpillar.health <= 0.0 {
            dead.push(id);
            continue;
        }
        if terrain.probe(caterpillar.x, caterpillar.y, caterpillar.heading, cc.look_ahead) {
            caterpillar.heading = obstacle_turn(caterpillar.heading, rng);
        } else {
            caterpillar.heading = jitter(caterpillar.heading, cc.wander_jitter, rng);
        }
        caterpillar.x += caterpillar.heading.cos() * caterpillar.speed;
        caterpillar.y += caterpillar.heading.sin() * caterpillar.speed;
        keep_in_bounds(
            &mut caterpillar.x,
            &mut caterpillar.y,
            &mut caterpillar.heading,
            terrain.width(),
            terrain.height(),
        );
        caterpillar.heading = wrap_signed_angle(caterpillar.heading);
    }

    for id in &dead {
        let Some(corpse) = caterpillars.remove(*id) else {
            continue;
        };
        drop_food(world.foods, terrain, corpse.x, corpse.y, cc.corpse_food);
        clear_alarm_around(
            world.colonies,
            terrain,
            corpse.x,
            corpse.y,
            world.config.pheromones.caterpillar_clear_radius,
        );
        log::debug!("caterpillar died at ({:.0}, {:.0})", corpse.x, corpse.y);
    }
    dead.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pheromones::Channel;
    use crate::types::{ColonyId, TerrainKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn edge_spawns_land_on_inset_lines() {
        let config = SimulationConfig::default();
        let terrain = Terrain::open(300.0, 200.0, 5.0);
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..200 {
            let (x, y) = edge_spawn_point(&terrain, &config, &mut rng).expect("open world");
            assert!(x == 20.0 || x == 280.0 || y == 20.0 || y == 180.0, "({x}, {y})");
        }
    }

    #[test]
    fn edge_spawns_avoid_blocked_cells() {
        let config = SimulationConfig::default();
        let mut terrain = Terrain::open(300.0, 200.0, 5.0);
        // Block the left and top inset lines.
        for gy in 0..terrain.rows() as i32 {
            terrain.set(4, gy, TerrainKind::Water);
        }
        for gx in 0..terrain.cols() as i32 {
            terrain.set(gx, 4, TerrainKind::Rock);
        }
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let (x, y) = edge_spawn_point(&terrain, &config, &mut rng).expect("open cells remain");
            assert!(terrain.is_open_at(x, y));
        }
    }

    #[test]
    fn wandering_stays_slow_and_in_bounds() {
        let config = SimulationConfig::default();
        let terrain = Terrain::open(100.0, 100.0, 5.0);
        let mut rng = StdRng::seed_from_u64(2);
        let mut caterpillars: SlotMap<CaterpillarId, Caterpillar> = SlotMap::with_key();
        let id = caterpillars.insert(Caterpillar::new(50.0, 50.0, &config.caterpillars, &mut rng));
        let mut colonies: Vec<Colony> = Vec::new();
        let mut foods = SlotMap::with_key();
        for _ in 0..2_000 {
            let before = caterpillars[id];
            let mut world = CaterpillarWorld {
                config: &config,
                terrain: &terrain,
                colonies: &mut colonies,
                foods: &mut foods,
            };
            update_caterpillars(&mut caterpillars, &mut world, &mut rng);
            let after = caterpillars[id];
            assert!((0.0..=100.0).contains(&after.x) && (0.0..=100.0).contains(&after.y));
            assert!((after.x - before.x).hypot(after.y - before.y) <= 0.3 + 1e-4);
        }
    }

    #[test]
    fn water_ahead_turns_the_caterpillar() {
        let config = SimulationConfig::default();
        let mut terrain = Terrain::open(200.0, 200.0, 5.0);
        // Look-ahead from (100, 100) facing east lands in cell (22, 20).
        terrain.set(22, 20, TerrainKind::Water);
        let mut rng = StdRng::seed_from_u64(8);
        let mut caterpillars: SlotMap<CaterpillarId, Caterpillar> = SlotMap::with_key();
        let mut crawler = Caterpillar::new(100.0, 100.0, &config.caterpillars, &mut rng);
        crawler.heading = 0.0;
        let id = caterpillars.insert(crawler);
        let mut colonies: Vec<Colony> = Vec::new();
        let mut foods = SlotMap::with_key();
        let mut world = CaterpillarWorld {
            config: &config,
            terrain: &terrain,
            colonies: &mut colonies,
            foods: &mut foods,
        };
        update_caterpillars(&mut caterpillars, &mut world, &mut rng);

        let heading = caterpillars[id].heading;
        assert!((heading - FRAC_PI_2).abs() <= 0.25 + 1e-5, "heading = {heading}");
    }

    #[test]
    fn dead_caterpillar_becomes_food_and_clears_alarm() {
        let config = SimulationConfig::default();
        let terrain = Terrain::open(400.0, 400.0, 5.0);
        let mut rng = StdRng::seed_from_u64(2);
        let mut colonies = vec![Colony::new(
            ColonyId(0),
            "Black",
            "#111111",
            (200.0, 200.0),
            terrain.cols(),
            terrain.rows(),
            &config,
        )];
        colonies[0].pheromones.deposit_max(Channel::Alarm, 12, 12, 90.0);
        colonies[0].pheromones.deposit_max(Channel::Alarm, 30, 30, 90.0);

        let mut caterpillars: SlotMap<CaterpillarId, Caterpillar> = SlotMap::with_key();
        let mut corpse = Caterpillar::new(50.0, 50.0, &config.caterpillars, &mut rng);
        corpse.health = -3.0;
        caterpillars.insert(corpse);
        let mut foods = SlotMap::with_key();
        let mut world = CaterpillarWorld {
            config: &config,
            terrain: &terrain,
            colonies: &mut colonies,
            foods: &mut foods,
        };
        assert_eq!(update_caterpillars(&mut caterpillars, &mut world, &mut rng), 1);

        assert!(caterpillars.is_empty());
        let food: Vec<FoodCluster> = foods.values().copied().collect();
        assert_eq!(food, vec![FoodCluster::new(50.0, 50.0, 100.0)]);
        assert_eq!(colonies[0].pheromones.get(Channel::Alarm, 12, 12), 0.0);
        assert_eq!(colonies[0].pheromones.get(Channel::Alarm, 30, 30), 90.0);
    }
}
