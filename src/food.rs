use rand::Rng;
use serde::Serialize;
use slotmap::SlotMap;

use crate::config::FoodConfig;
use crate::terrain::Terrain;
use crate::types::FoodId;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FoodCluster {
    pub x: f32,
    pub y: f32,
    pub amount: f32,
}

impl FoodCluster {
    pub fn new(x: f32, y: f32, amount: f32) -> Self {
        Self { x, y, amount }
    }
}

/// Size of a randomly scattered cluster.
pub fn random_amount<R: Rng>(config: &FoodConfig, rng: &mut R) -> f32 {
    rng.gen_range(config.min_cluster_amount..=config.max_cluster_amount) as f32
}

/// Leave food where something fell: payloads and corpses land regardless of terrain,
/// clamped into the world.
pub(crate) fn drop_food(
    foods: &mut SlotMap<FoodId, FoodCluster>,
    terrain: &Terrain,
    x: f32,
    y: f32,
    amount: f32,
) -> Option<FoodId> {
    if amount <= 0.0 {
        return None;
    }
    let x = x.clamp(0.0, terrain.width());
    let y = y.clamp(0.0, terrain.height());
    Some(foods.insert(FoodCluster::new(x, y, amount)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_amounts_stay_in_configured_range() {
        let config = FoodConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let amount = random_amount(&config, &mut rng);
            assert!((20.0..=69.0).contains(&amount));
            assert_eq!(amount.fract(), 0.0);
        }
    }

    #[test]
    fn drops_clamp_into_world_and_skip_empty_payloads() {
        let terrain = Terrain::open(100.0, 100.0, 5.0);
        let mut foods = SlotMap::with_key();
        assert!(drop_food(&mut foods, &terrain, 10.0, 10.0, 0.0).is_none());
        let id = drop_food(&mut foods, &terrain, 130.0, -4.0, 5.0).unwrap();
        assert_eq!(foods[id], FoodCluster::new(100.0, 0.0, 5.0));
    }
}
