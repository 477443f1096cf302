use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::terrain::Terrain;

pub const MAX_PHEROMONE: f32 = 255.0;

/// Values that decay below this are snapped to zero.
const DECAY_FLOOR: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Laid by outbound ants, followed home.
    Home,
    /// Laid by laden ants, followed to food.
    Food,
    Alarm,
}

/// Per-channel multipliers applied on each decay pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Retention {
    pub trail: f32,
    pub alarm: f32,
}

/// One colony's chemical map: three scalar grids in `[0, 255]` plus the set of touched cells.
#[derive(Clone, Debug)]
pub struct PheromoneField {
    cols: usize,
    rows: usize,
    home: Vec<f32>,
    food: Vec<f32>,
    alarm: Vec<f32>,
    active: HashSet<usize>,
}

impl PheromoneField {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            home: vec![0.0; cols * rows],
            food: vec![0.0; cols * rows],
            alarm: vec![0.0; cols * rows],
            active: HashSet::new(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn index(&self, gx: i32, gy: i32) -> Option<usize> {
        if gx < 0 || gy < 0 || gx as usize >= self.cols || gy as usize >= self.rows {
            return None;
        }
        Some(gx as usize + gy as usize * self.cols)
    }

    pub fn grid(&self, channel: Channel) -> &[f32] {
        match channel {
            Channel::Home => &self.home,
            Channel::Food => &self.food,
            Channel::Alarm => &self.alarm,
        }
    }

    fn grid_mut(&mut self, channel: Channel) -> &mut [f32] {
        match channel {
            Channel::Home => &mut self.home,
            Channel::Food => &mut self.food,
            Channel::Alarm => &mut self.alarm,
        }
    }

    /// Raw value at a cell, 0 when out of range.
    pub fn get(&self, channel: Channel, gx: i32, gy: i32) -> f32 {
        self.index(gx, gy)
            .map_or(0.0, |idx| self.grid(channel)[idx])
    }

    /// Value as an ant perceives it: nothing lingers over rock or water.
    pub fn sample(&self, terrain: &Terrain, channel: Channel, gx: i32, gy: i32) -> f32 {
        if !terrain.is_open(gx, gy) {
            return 0.0;
        }
        self.get(channel, gx, gy)
    }

    /// Additive deposit, capped at 255.
    pub fn add(&mut self, channel: Channel, gx: i32, gy: i32, amount: f32) {
        let Some(idx) = self.index(gx, gy) else {
            return;
        };
        let cell = &mut self.grid_mut(channel)[idx];
        *cell = (*cell + amount).clamp(0.0, MAX_PHEROMONE);
        self.active.insert(idx);
    }

    /// Raise a cell to at least `amount`.
    pub fn deposit_max(&mut self, channel: Channel, gx: i32, gy: i32, amount: f32) {
        let Some(idx) = self.index(gx, gy) else {
            return;
        };
        let amount = amount.clamp(0.0, MAX_PHEROMONE);
        let cell = &mut self.grid_mut(channel)[idx];
        *cell = cell.max(amount);
        self.active.insert(idx);
    }

    /// Max-deposit `peak - falloff * distance` over every cell within `radius` of the centre.
    pub fn deposit_radial(
        &mut self,
        channel: Channel,
        gx: i32,
        gy: i32,
        peak: f32,
        falloff: f32,
        radius: i32,
    ) {
        if self.index(gx, gy).is_none() {
            return;
        }
        let radius_f = radius as f32;
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let dist = ((dx * dx + dy * dy) as f32).sqrt();
                if dist > radius_f {
                    continue;
                }
                let amount = (peak - dist * falloff).max(0.0);
                self.deposit_max(channel, gx + dx, gy + dy, amount);
            }
        }
    }

    /// Zero a channel over the square window of half-width `radius`.
    /// Cleared cells leave the active set lazily, on the next decay pass.
    pub fn clear_square(&mut self, channel: Channel, gx: i32, gy: i32, radius: i32) {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if let Some(idx) = self.index(gx + dx, gy + dy) {
                    self.grid_mut(channel)[idx] = 0.0;
                }
            }
        }
    }

    /// Evaporate every active cell once and drop cells whose channels all reached zero.
    pub fn decay(&mut self, retention: Retention) {
        let Self {
            home,
            food,
            alarm,
            active,
            ..
        } = self;
        active.retain(|&idx| {
            let home_alive = evaporate(&mut home[idx], retention.trail);
            let food_alive = evaporate(&mut food[idx], retention.trail);
            let alarm_alive = evaporate(&mut alarm[idx], retention.alarm);
            home_alive || food_alive || alarm_alive
        });
    }

    pub fn is_active(&self, gx: i32, gy: i32) -> bool {
        self.index(gx, gy)
            .is_some_and(|idx| self.active.contains(&idx))
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Active cell indices in ascending order.
    pub fn active_cells(&self) -> Vec<usize> {
        let mut cells: Vec<usize> = self.active.iter().copied().collect();
        cells.sort_unstable();
        cells
    }
}

/// Returns whether the value survived the pass.
#[inline]
fn evaporate(value: &mut f32, retention: f32) -> bool {
    if *value <= 0.0 {
        return false;
    }
    *value *= retention;
    if *value < DECAY_FLOOR {
        *value = 0.0;
        false
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TerrainKind;

    const RETENTION: Retention = Retention {
        trail: 0.975,
        alarm: 0.95,
    };

    #[test]
    fn additive_deposit_caps_at_max() {
        let mut field = PheromoneField::new(10, 10);
        for _ in 0..100 {
            field.add(Channel::Food, 3, 4, 20.0);
        }
        assert_eq!(field.get(Channel::Food, 3, 4), MAX_PHEROMONE);
        assert!(field.is_active(3, 4));
    }

    #[test]
    fn deposit_max_never_lowers() {
        let mut field = PheromoneField::new(10, 10);
        field.deposit_max(Channel::Alarm, 1, 1, 200.0);
        field.deposit_max(Channel::Alarm, 1, 1, 50.0);
        assert_eq!(field.get(Channel::Alarm, 1, 1), 200.0);
        field.deposit_max(Channel::Alarm, 1, 1, 900.0);
        assert_eq!(field.get(Channel::Alarm, 1, 1), MAX_PHEROMONE);
    }

    #[test]
    fn out_of_range_writes_are_ignored() {
        let mut field = PheromoneField::new(4, 4);
        field.add(Channel::Home, -1, 0, 10.0);
        field.deposit_max(Channel::Home, 4, 0, 10.0);
        assert_eq!(field.active_len(), 0);
        assert_eq!(field.get(Channel::Home, 99, 99), 0.0);
    }

    #[test]
    fn radial_deposit_falls_off_linearly() {
        let mut field = PheromoneField::new(40, 40);
        field.deposit_radial(Channel::Alarm, 20, 20, 255.0, 12.0, 15);
        assert_eq!(field.get(Channel::Alarm, 20, 20), 255.0);
        assert_eq!(field.get(Channel::Alarm, 25, 20), 255.0 - 60.0);
        assert!((field.get(Channel::Alarm, 23, 24) - (255.0 - 12.0 * 5.0)).abs() < 1e-4);
        assert_eq!(field.get(Channel::Alarm, 36, 20), 0.0);
        assert!(field.is_active(35, 20));
        assert!(!field.is_active(36, 20));
    }

    #[test]
    fn decay_is_monotone_and_reaches_zero() {
        let mut field = PheromoneField::new(5, 5);
        field.add(Channel::Home, 2, 2, 255.0);
        field.deposit_max(Channel::Alarm, 2, 2, 255.0);
        let mut previous = (255.0, 255.0);
        let mut passes = 0;
        while field.active_len() > 0 {
            field.decay(RETENTION);
            let now = (field.get(Channel::Home, 2, 2), field.get(Channel::Alarm, 2, 2));
            assert!(now.0 <= previous.0 && now.1 <= previous.1);
            assert!(now.0 == 0.0 || now.0 >= 1.0);
            previous = now;
            passes += 1;
            assert!(passes < 1_000);
        }
        assert_eq!(previous, (0.0, 0.0));
        // Alarm fades faster than trails.
        let mut field = PheromoneField::new(1, 1);
        field.add(Channel::Food, 0, 0, 100.0);
        field.deposit_max(Channel::Alarm, 0, 0, 100.0);
        field.decay(RETENTION);
        assert!(field.get(Channel::Alarm, 0, 0) < field.get(Channel::Food, 0, 0));
    }

    #[test]
    fn cleared_cells_leave_active_set_on_next_decay() {
        let mut field = PheromoneField::new(10, 10);
        field.deposit_max(Channel::Alarm, 5, 5, 100.0);
        field.clear_square(Channel::Alarm, 5, 5, 2);
        assert!(field.is_active(5, 5));
        field.decay(RETENTION);
        assert!(!field.is_active(5, 5));
    }

    #[test]
    fn sample_is_zero_over_blocked_terrain() {
        let mut terrain = Terrain::open(50.0, 50.0, 5.0);
        terrain.set(2, 2, TerrainKind::Water);
        let mut field = PheromoneField::new(10, 10);
        field.add(Channel::Food, 2, 2, 40.0);
        field.add(Channel::Food, 3, 2, 40.0);
        assert_eq!(field.sample(&terrain, Channel::Food, 2, 2), 0.0);
        assert_eq!(field.sample(&terrain, Channel::Food, 3, 2), 40.0);
        assert_eq!(field.get(Channel::Food, 2, 2), 40.0);
    }
}
