// Read-only views of the world for renderers and the HTTP API

use serde::{Deserialize, Serialize};

use crate::colony::Colony;
use crate::pheromones::{Channel, PheromoneField};
use crate::schedule::ScheduledEvent;
use crate::simulation::SimulationState;
use crate::types::{AntState, Caste, ColonyId, SpiderState, TerrainKind};

#[derive(Serialize, Clone, Debug)]
pub struct AntSnapshot {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub caste: Caste,
    pub state: AntState,
    pub carrying_food: bool,
    pub payload: f32,
    pub age: u32,
    pub health: f32,
    pub max_health: f32,
}

/// Row-major grids, `cols` cells per row, plus the touched-cell list in ascending order.
#[derive(Serialize, Clone, Debug)]
pub struct PheromoneSnapshot {
    pub cols: usize,
    pub rows: usize,
    pub home: Vec<f32>,
    pub food: Vec<f32>,
    pub alarm: Vec<f32>,
    pub active: Vec<usize>,
}

impl PheromoneSnapshot {
    fn capture(field: &PheromoneField) -> Self {
        Self {
            cols: field.cols(),
            rows: field.rows(),
            home: field.grid(Channel::Home).to_vec(),
            food: field.grid(Channel::Food).to_vec(),
            alarm: field.grid(Channel::Alarm).to_vec(),
            active: field.active_cells(),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct ColonySnapshot {
    pub id: ColonyId,
    pub name: String,
    pub color: String,
    pub mound: (f32, f32),
    pub food_stored: f32,
    pub ants: Vec<AntSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pheromones: Option<PheromoneSnapshot>,
}

impl ColonySnapshot {
    fn capture(colony: &Colony, include_fields: bool) -> Self {
        Self {
            id: colony.id,
            name: colony.name.clone(),
            color: colony.color.clone(),
            mound: colony.mound,
            food_stored: colony.food_stored,
            ants: colony
                .ants
                .values()
                .map(|ant| AntSnapshot {
                    x: ant.x,
                    y: ant.y,
                    heading: ant.heading,
                    caste: ant.caste,
                    state: ant.state,
                    carrying_food: ant.carrying_food,
                    payload: ant.payload,
                    age: ant.age,
                    health: ant.health,
                    max_health: ant.max_health,
                })
                .collect(),
            pheromones: include_fields.then(|| PheromoneSnapshot::capture(&colony.pheromones)),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct FoodSnapshot {
    pub x: f32,
    pub y: f32,
    pub amount: f32,
}

#[derive(Serialize, Clone, Debug)]
pub struct SpiderSnapshot {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub health: f32,
    pub max_health: f32,
    pub state: SpiderState,
    pub hunger: u32,
}

#[derive(Serialize, Clone, Debug)]
pub struct CaterpillarSnapshot {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub health: f32,
    pub max_health: f32,
}

#[derive(Serialize, Clone, Debug)]
pub struct PendingEvent {
    pub due_tick: u64,
    pub event: ScheduledEvent,
}

/// Everything a renderer needs to draw one frame.
#[derive(Serialize, Clone, Debug)]
pub struct SimulationSnapshot {
    pub tick: u64,
    pub width: f32,
    pub height: f32,
    pub cell_size: f32,
    pub cols: usize,
    pub rows: usize,
    pub colonies: Vec<ColonySnapshot>,
    pub foods: Vec<FoodSnapshot>,
    pub spiders: Vec<SpiderSnapshot>,
    pub caterpillars: Vec<CaterpillarSnapshot>,
    pub pending_events: Vec<PendingEvent>,
}

impl SimulationSnapshot {
    pub(crate) fn capture(state: &SimulationState, include_fields: bool) -> Self {
        let terrain = &state.terrain;
        Self {
            tick: state.tick,
            width: terrain.width(),
            height: terrain.height(),
            cell_size: terrain.cell_size(),
            cols: terrain.cols(),
            rows: terrain.rows(),
            colonies: state
                .colonies
                .iter()
                .map(|colony| ColonySnapshot::capture(colony, include_fields))
                .collect(),
            foods: state
                .foods
                .values()
                .map(|food| FoodSnapshot {
                    x: food.x,
                    y: food.y,
                    amount: food.amount,
                })
                .collect(),
            spiders: state
                .spiders
                .values()
                .map(|s| SpiderSnapshot {
                    x: s.x,
                    y: s.y,
                    heading: s.heading,
                    health: s.health,
                    max_health: s.max_health,
                    state: s.state,
                    hunger: s.hunger,
                })
                .collect(),
            caterpillars: state
                .caterpillars
                .values()
                .map(|c| CaterpillarSnapshot {
                    x: c.x,
                    y: c.y,
                    heading: c.heading,
                    health: c.health,
                    max_health: c.max_health,
                })
                .collect(),
            pending_events: state
                .events
                .pending()
                .into_iter()
                .map(|(due_tick, event)| PendingEvent { due_tick, event })
                .collect(),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct TerrainSnapshot {
    pub cols: usize,
    pub rows: usize,
    pub cell_size: f32,
    /// Row-major, `cols` cells per row.
    pub cells: Vec<TerrainKind>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ColonyStats {
    pub id: ColonyId,
    pub name: String,
    pub ants: usize,
    pub workers: usize,
    pub soldiers: usize,
    pub food_stored: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SimulationStats {
    pub tick: u64,
    pub colonies: Vec<ColonyStats>,
    pub food_clusters: usize,
    pub total_food: f32,
    pub spiders: usize,
    pub caterpillars: usize,
    pub active_pheromone_cells: usize,
    pub pending_events: usize,
}

impl SimulationStats {
    pub(crate) fn capture(state: &SimulationState) -> Self {
        Self {
            tick: state.tick,
            colonies: state
                .colonies
                .iter()
                .map(|colony| ColonyStats {
                    id: colony.id,
                    name: colony.name.clone(),
                    ants: colony.population(),
                    workers: colony.worker_count(),
                    soldiers: colony.soldier_count(),
                    food_stored: colony.food_stored,
                })
                .collect(),
            food_clusters: state.foods.len(),
            total_food: state.foods.values().map(|food| food.amount).sum(),
            spiders: state.spiders.len(),
            caterpillars: state.caterpillars.len(),
            active_pheromone_cells: state
                .colonies
                .iter()
                .map(|colony| colony.pheromones.active_len())
                .sum(),
            pending_events: state.events.len(),
        }
    }

    /// Ants across every colony.
    pub fn total_ants(&self) -> usize {
        self.colonies.iter().map(|colony| colony.ants).sum()
    }
}
