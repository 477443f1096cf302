use rand::Rng;
use slotmap::SlotMap;
use std::f32::consts::PI;

use crate::caterpillar::Caterpillar;
use crate::colony::Colony;
use crate::config::{AntConfig, SimulationConfig};
use crate::food::{drop_food, FoodCluster};
use crate::pheromones::{Channel, PheromoneField};
use crate::spatial::SpatialIndex;
use crate::spider::Spider;
use crate::steering::{jitter, keep_in_bounds, obstacle_turn, steer_towards, wrap_signed_angle};
use crate::terrain::Terrain;
use crate::types::{AntId, AntState, Caste, CaterpillarId, ColonyId, FoodId, SpiderId};

/// Handle to an ant anywhere in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AntRef {
    pub colony: ColonyId,
    pub ant: AntId,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ant {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub speed: f32,
    pub colony: ColonyId,
    pub caste: Caste,
    pub state: AntState,
    /// State to fall back to once a fight is over.
    pub base_state: AntState,
    pub health: f32,
    pub max_health: f32,
    pub attack_damage: f32,
    pub age: u32,
    pub max_age: u32,
    pub carrying_food: bool,
    pub payload: f32,
}

impl Ant {
    pub fn new<R: Rng>(
        x: f32,
        y: f32,
        colony: ColonyId,
        caste: Caste,
        config: &AntConfig,
        rng: &mut R,
    ) -> Self {
        let heading = rng.gen_range(0.0..std::f32::consts::TAU);
        let max_age = config.min_age + rng.gen_range(0..config.age_spread.max(1));
        let (health, attack_damage, speed, base_state) = match caste {
            Caste::Soldier => {
                let base = if rng.gen::<f32>() > 0.5 {
                    AntState::Guarding
                } else {
                    AntState::Foraging
                };
                (
                    config.soldier_health,
                    config.soldier_damage,
                    config.soldier_speed,
                    base,
                )
            }
            Caste::Worker => (
                config.worker_health,
                config.worker_damage,
                config.worker_speed,
                AntState::Foraging,
            ),
        };
        Self {
            x,
            y,
            heading,
            speed,
            colony,
            caste,
            state: base_state,
            base_state,
            health,
            max_health: health,
            attack_damage,
            age: 0,
            max_age,
            carrying_food: false,
            payload: 0.0,
        }
    }

    /// Movement speed for the current state and caste.
    pub fn state_speed(&self, config: &AntConfig) -> f32 {
        match (self.state, self.caste) {
            (AntState::Attacking, Caste::Soldier) => config.attacking_soldier_speed,
            (AntState::Attacking, Caste::Worker) => config.attacking_worker_speed,
            (AntState::Returning, _) => config.returning_speed,
            (AntState::Guarding, _) => config.guarding_speed,
            (AntState::Foraging, Caste::Soldier) => config.soldier_speed,
            (AntState::Foraging, Caste::Worker) => config.worker_speed,
        }
    }
}

/// Everything an ant can see or touch during its update.
pub(crate) struct AntWorld<'a> {
    pub config: &'a SimulationConfig,
    pub terrain: &'a Terrain,
    pub index: &'a SpatialIndex,
    pub colonies: &'a mut [Colony],
    pub foods: &'a mut SlotMap<FoodId, FoodCluster>,
    pub spiders: &'a mut SlotMap<SpiderId, Spider>,
    pub caterpillars: &'a mut SlotMap<CaterpillarId, Caterpillar>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fate {
    Alive,
    Died,
}

#[derive(Clone, Copy, Debug)]
enum Prey {
    Spider(SpiderId),
    Caterpillar(CaterpillarId),
    Ant(AntRef),
}

#[derive(Clone, Copy, Debug)]
struct Sighting {
    prey: Prey,
    x: f32,
    y: f32,
    dist_sq: f32,
}

impl Sighting {
    fn closer(best: Option<Sighting>, candidate: Sighting) -> Option<Sighting> {
        match best {
            Some(current) if current.dist_sq <= candidate.dist_sq => Some(current),
            _ => Some(candidate),
        }
    }
}

/// Run one tick for every ant of `colony`, removing the dead.
pub(crate) fn update_ants<R: Rng>(world: &mut AntWorld<'_>, colony: ColonyId, rng: &mut R) -> usize {
    let ids: Vec<AntId> = world.colonies[colony.0].ants.keys().collect();
    let mut deaths = 0;
    for id in ids {
        let Some(mut ant) = world.colonies[colony.0].ants.get(id).copied() else {
            continue;
        };
        match step_ant(world, &mut ant, rng) {
            Fate::Alive => {
                if let Some(slot) = world.colonies[colony.0].ants.get_mut(id) {
                    *slot = ant;
                }
            }
            Fate::Died => {
                world.colonies[colony.0].ants.remove(id);
                deaths += 1;
            }
        }
    }
    deaths
}

fn step_ant<R: Rng>(world: &mut AntWorld<'_>, ant: &mut Ant, rng: &mut R) -> Fate {
    let config = world.config;
    let terrain = world.terrain;
    let ac = &config.ants;
    let ph = &config.pheromones;
    let home = ant.colony.0;
    let (gx, gy) = terrain.world_to_grid(ant.x, ant.y);

    ant.age += 1;
    if ant.age > ant.max_age || ant.health <= 0.0 {
        if ant.carrying_food {
            drop_food(world.foods, terrain, ant.x, ant.y, ant.payload);
        }
        if ant.health <= 0.0 {
            world.colonies[home].pheromones.deposit_radial(
                Channel::Alarm,
                gx,
                gy,
                ph.death_alarm,
                ph.death_alarm_falloff,
                ph.death_alarm_radius,
            );
        }
        return Fate::Died;
    }

    let center_alarm = world.colonies[home].pheromones.get(Channel::Alarm, gx, gy);
    if center_alarm > ph.alarm_threshold && ant.state != AntState::Attacking {
        match ant.caste {
            Caste::Worker => ant.heading += PI,
            Caste::Soldier => {
                ant.state = AntState::Attacking;
                if ant.carrying_food {
                    drop_food(world.foods, terrain, ant.x, ant.y, ant.payload);
                    ant.carrying_food = false;
                    ant.payload = 0.0;
                }
            }
        }
    }

    ant.speed = ant.state_speed(ac);

    let mut sticking = false;
    if terrain.probe(ant.x, ant.y, ant.heading, ac.look_ahead) {
        ant.heading = obstacle_turn(ant.heading, rng);
    } else {
        match ant.state {
            AntState::Attacking => sticking = attack(world, ant, (gx, gy), center_alarm, rng),
            AntState::Foraging | AntState::Guarding => patrol(world, ant, (gx, gy), rng),
            AntState::Returning => return_home(world, ant, (gx, gy), rng),
        }
    }

    if !sticking {
        ant.x += ant.heading.cos() * ant.speed;
        ant.y += ant.heading.sin() * ant.speed;
    }
    keep_in_bounds(
        &mut ant.x,
        &mut ant.y,
        &mut ant.heading,
        terrain.width(),
        terrain.height(),
    );
    ant.heading = wrap_signed_angle(ant.heading);
    Fate::Alive
}

/// Hunt the nearest foe by priority: spiders, then caterpillars, then enemy ants.
/// Returns true when the ant latched onto its target instead of moving.
fn attack<R: Rng>(
    world: &mut AntWorld<'_>,
    ant: &mut Ant,
    (gx, gy): (i32, i32),
    center_alarm: f32,
    rng: &mut R,
) -> bool {
    let config = world.config;
    let ac = &config.ants;
    let ph = &config.pheromones;
    let home = ant.colony.0;

    let Some(target) = find_prey(world, ant, ac.attack_vision_sq()) else {
        steer_towards_pheromone(
            &world.colonies[home].pheromones,
            world.terrain,
            ant,
            Channel::Alarm,
            ac,
        );
        if center_alarm < ph.alarm_threshold {
            ant.state = ant.base_state;
        }
        return false;
    };

    ant.heading = steer_towards(ant.heading, target.x - ant.x, target.y - ant.y, ac.homing_gain);

    let mut sticking = false;
    if target.dist_sq < ac.strike_range_sq() {
        let spread = match target.prey {
            Prey::Spider(id) => {
                if let Some(spider) = world.spiders.get_mut(id) {
                    spider.health -= ant.attack_damage;
                }
                ac.monster_stick_jitter
            }
            Prey::Caterpillar(id) => {
                if let Some(caterpillar) = world.caterpillars.get_mut(id) {
                    caterpillar.health -= ant.attack_damage;
                }
                ac.monster_stick_jitter
            }
            Prey::Ant(r) => {
                if let Some(enemy) = world.colonies[r.colony.0].ants.get_mut(r.ant) {
                    enemy.health -= ant.attack_damage;
                }
                ac.ant_stick_jitter
            }
        };
        ant.x = target.x + (rng.gen::<f32>() - 0.5) * spread;
        ant.y = target.y + (rng.gen::<f32>() - 0.5) * spread;
        sticking = true;
    }

    world.colonies[home]
        .pheromones
        .add(Channel::Alarm, gx, gy, ph.alarm_boost);
    sticking
}

fn find_prey(world: &AntWorld<'_>, ant: &Ant, vision_sq: f32) -> Option<Sighting> {
    let radius = world.config.world.neighbor_radius;
    let within = |x: f32, y: f32| {
        let (dx, dy) = (x - ant.x, y - ant.y);
        let dist_sq = dx * dx + dy * dy;
        (dist_sq < vision_sq).then_some(dist_sq)
    };

    let mut best = None;
    for bucket in world.index.neighbors(ant.x, ant.y, radius) {
        for &id in &bucket.spiders {
            let Some(spider) = world.spiders.get(id) else {
                continue;
            };
            if let Some(dist_sq) = within(spider.x, spider.y) {
                let seen = Sighting { prey: Prey::Spider(id), x: spider.x, y: spider.y, dist_sq };
                best = Sighting::closer(best, seen);
            }
        }
    }
    if best.is_some() {
        return best;
    }

    for bucket in world.index.neighbors(ant.x, ant.y, radius) {
        for &id in &bucket.caterpillars {
            let Some(caterpillar) = world.caterpillars.get(id) else {
                continue;
            };
            if let Some(dist_sq) = within(caterpillar.x, caterpillar.y) {
                let seen = Sighting {
                    prey: Prey::Caterpillar(id),
                    x: caterpillar.x,
                    y: caterpillar.y,
                    dist_sq,
                };
                best = Sighting::closer(best, seen);
            }
        }
    }
    if best.is_some() {
        return best;
    }

    for bucket in world.index.neighbors(ant.x, ant.y, radius) {
        for &r in &bucket.ants {
            if r.colony == ant.colony {
                continue;
            }
            let Some(enemy) = world.colonies[r.colony.0].ants.get(r.ant) else {
                continue;
            };
            if let Some(dist_sq) = within(enemy.x, enemy.y) {
                let seen = Sighting { prey: Prey::Ant(r), x: enemy.x, y: enemy.y, dist_sq };
                best = Sighting::closer(best, seen);
            }
        }
    }
    best
}

/// Nearest hostile of any kind inside the caste's aggro radius.
fn find_threat(world: &AntWorld<'_>, ant: &Ant, aggro_sq: f32) -> Option<(f32, f32)> {
    let radius = world.config.world.neighbor_radius;
    let mut best: Option<(f32, (f32, f32))> = None;
    let mut consider = |x: f32, y: f32| {
        let (dx, dy) = (x - ant.x, y - ant.y);
        let dist_sq = dx * dx + dy * dy;
        if dist_sq < aggro_sq && best.map_or(true, |(d, _)| dist_sq < d) {
            best = Some((dist_sq, (x, y)));
        }
    };
    for bucket in world.index.neighbors(ant.x, ant.y, radius) {
        for caterpillar in bucket.caterpillars.iter().filter_map(|&id| world.caterpillars.get(id)) {
            consider(caterpillar.x, caterpillar.y);
        }
        for spider in bucket.spiders.iter().filter_map(|&id| world.spiders.get(id)) {
            consider(spider.x, spider.y);
        }
        for r in bucket.ants.iter().filter(|r| r.colony != ant.colony) {
            if let Some(enemy) = world.colonies[r.colony.0].ants.get(r.ant) {
                consider(enemy.x, enemy.y);
            }
        }
    }
    best.map(|(_, point)| point)
}

/// Foraging and guarding: mark the way home, react to threats, then search or patrol.
fn patrol<R: Rng>(world: &mut AntWorld<'_>, ant: &mut Ant, (gx, gy): (i32, i32), rng: &mut R) {
    let config = world.config;
    let ac = &config.ants;
    let home = ant.colony.0;
    world.colonies[home]
        .pheromones
        .add(Channel::Home, gx, gy, config.pheromones.home_deposit);

    let aggro = match ant.caste {
        Caste::Soldier => ac.soldier_aggro_radius,
        Caste::Worker => ac.worker_aggro_radius,
    };
    if let Some((tx, ty)) = find_threat(world, ant, aggro * aggro) {
        match ant.caste {
            Caste::Worker => ant.heading = (ty - ant.y).atan2(tx - ant.x) + PI,
            Caste::Soldier => ant.state = AntState::Attacking,
        }
        return;
    }

    match ant.state {
        AntState::Guarding => {
            ant.heading = jitter(ant.heading, ac.wander_jitter, rng);
            let (mx, my) = world.colonies[home].mound;
            if world.colonies[home].distance_sq_to_mound(ant.x, ant.y) > ac.guard_leash * ac.guard_leash {
                ant.heading = steer_towards(ant.heading, mx - ant.x, my - ant.y, ac.guard_gain);
            }
        }
        AntState::Foraging => {
            if ant.caste == Caste::Worker && grab_food(world, ant) {
                return;
            }
            ant.heading = jitter(ant.heading, ac.wander_jitter, rng);
            steer_towards_pheromone(
                &world.colonies[home].pheromones,
                world.terrain,
                ant,
                Channel::Food,
                ac,
            );
        }
        AntState::Returning | AntState::Attacking => {}
    }
}

/// Take a bite from the first cluster within reach and head for the mound.
fn grab_food(world: &mut AntWorld<'_>, ant: &mut Ant) -> bool {
    let ac = &world.config.ants;
    let reach_sq = ac.grab_range_sq();
    let radius = world.config.world.neighbor_radius;
    let index = world.index;

    let found = index
        .neighbors(ant.x, ant.y, radius)
        .flat_map(|bucket| bucket.foods.iter().copied())
        .find(|&id| {
            world.foods.get(id).is_some_and(|food| {
                let (dx, dy) = (food.x - ant.x, food.y - ant.y);
                dx * dx + dy * dy < reach_sq
            })
        });
    let Some(id) = found else {
        return false;
    };
    let Some(food) = world.foods.get_mut(id) else {
        return false;
    };

    let bite = ac.bite_size.min(food.amount);
    food.amount -= bite;
    if food.amount <= 0.0 {
        world.foods.remove(id);
    }

    let (mx, my) = world.colonies[ant.colony.0].mound;
    ant.state = AntState::Returning;
    ant.carrying_food = true;
    ant.payload = bite;
    ant.heading = (my - ant.y).atan2(mx - ant.x);
    true
}

/// Laden ants lay food trail and home in on the mound, unloading on arrival.
fn return_home<R: Rng>(world: &mut AntWorld<'_>, ant: &mut Ant, (gx, gy): (i32, i32), rng: &mut R) {
    let config = world.config;
    let ac = &config.ants;
    let colony = &mut world.colonies[ant.colony.0];
    colony
        .pheromones
        .add(Channel::Food, gx, gy, config.pheromones.food_deposit);

    let (dx, dy) = (colony.mound.0 - ant.x, colony.mound.1 - ant.y);
    let dist_sq = dx * dx + dy * dy;
    if dist_sq < ac.mound_arrival_radius * ac.mound_arrival_radius {
        ant.state = AntState::Foraging;
        ant.carrying_food = false;
        colony.food_stored += ant.payload;
        ant.payload = 0.0;
        ant.heading = PI + dy.atan2(dx);
        return;
    }

    ant.heading = jitter(ant.heading, ac.wander_jitter, rng);
    let gain = if dist_sq < ac.homeward_near_radius * ac.homeward_near_radius {
        ac.homeward_near_gain
    } else {
        ac.homeward_far_gain
    };
    ant.heading = steer_towards(ant.heading, dx, dy, gain);
    steer_towards_pheromone(&colony.pheromones, world.terrain, ant, Channel::Home, ac);
}

/// Three-sensor gradient follow: keep straight unless one side smells strictly stronger.
pub(crate) fn steer_towards_pheromone(
    field: &PheromoneField,
    terrain: &Terrain,
    ant: &mut Ant,
    channel: Channel,
    config: &AntConfig,
) {
    let sense = |angle: f32| {
        let px = ant.x + angle.cos() * config.sensor_look_ahead;
        let py = ant.y + angle.sin() * config.sensor_look_ahead;
        let (gx, gy) = terrain.world_to_grid(px, py);
        field.sample(terrain, channel, gx, gy)
    };
    let left = sense(ant.heading - config.sensor_angle);
    let center = sense(ant.heading);
    let right = sense(ant.heading + config.sensor_angle);

    if center >= left && center >= right {
        return;
    }
    if left > right {
        ant.heading -= config.sensor_turn;
    } else if right > left {
        ant.heading += config.sensor_turn;
    }
}
