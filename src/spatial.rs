//! Coarse bucket grid rebuilt every tick for neighborhood queries.

use slotmap::SlotMap;

use crate::ant::AntRef;
use crate::caterpillar::Caterpillar;
use crate::colony::Colony;
use crate::food::FoodCluster;
use crate::spider::Spider;
use crate::types::{CaterpillarId, FoodId, SpiderId};

#[derive(Clone, Debug, Default)]
pub struct Bucket {
    pub ants: Vec<AntRef>,
    pub spiders: Vec<SpiderId>,
    pub caterpillars: Vec<CaterpillarId>,
    pub foods: Vec<FoodId>,
}

impl Bucket {
    fn clear(&mut self) {
        self.ants.clear();
        self.spiders.clear();
        self.caterpillars.clear();
        self.foods.clear();
    }

    fn len(&self) -> usize {
        self.ants.len() + self.spiders.len() + self.caterpillars.len() + self.foods.len()
    }
}

/// Uniform grid of buckets. Entries are handles into the live collections; the buckets
/// are never re-sorted mid-tick, so callers must filter by true distance themselves.
#[derive(Clone, Debug)]
pub struct SpatialIndex {
    bucket_size: f32,
    cols: usize,
    rows: usize,
    buckets: Vec<Bucket>,
}

impl SpatialIndex {
    pub fn new(width: f32, height: f32, bucket_size: f32) -> Self {
        let cols = ((width / bucket_size).ceil() as usize).max(1);
        let rows = ((height / bucket_size).ceil() as usize).max(1);
        Self {
            bucket_size,
            cols,
            rows,
            buckets: vec![Bucket::default(); cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Bucket coordinates for a position, clamped so edge entities are never dropped.
    #[inline]
    pub fn bucket_of(&self, x: f32, y: f32) -> (usize, usize) {
        let bx = ((x / self.bucket_size).floor() as i64).clamp(0, self.cols as i64 - 1);
        let by = ((y / self.bucket_size).floor() as i64).clamp(0, self.rows as i64 - 1);
        (bx as usize, by as usize)
    }

    #[inline]
    fn bucket_mut(&mut self, x: f32, y: f32) -> &mut Bucket {
        let (bx, by) = self.bucket_of(x, y);
        &mut self.buckets[bx + by * self.cols]
    }

    /// Clear every bucket and re-insert all live entities at their current positions.
    pub fn rebuild(
        &mut self,
        colonies: &[Colony],
        spiders: &SlotMap<SpiderId, Spider>,
        caterpillars: &SlotMap<CaterpillarId, Caterpillar>,
        foods: &SlotMap<FoodId, FoodCluster>,
    ) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        for colony in colonies {
            for (id, ant) in &colony.ants {
                self.bucket_mut(ant.x, ant.y).ants.push(AntRef {
                    colony: colony.id,
                    ant: id,
                });
            }
        }
        for (id, spider) in spiders {
            self.bucket_mut(spider.x, spider.y).spiders.push(id);
        }
        for (id, caterpillar) in caterpillars {
            self.bucket_mut(caterpillar.x, caterpillar.y)
                .caterpillars
                .push(id);
        }
        for (id, food) in foods {
            self.bucket_mut(food.x, food.y).foods.push(id);
        }
    }

    /// Buckets in the square window of `radius` buckets around the one holding `(x, y)`.
    /// Over-approximates the true neighborhood.
    pub fn neighbors(&self, x: f32, y: f32, radius: usize) -> impl Iterator<Item = &Bucket> + '_ {
        let (bx, by) = self.bucket_of(x, y);
        let min_x = bx.saturating_sub(radius);
        let max_x = (bx + radius).min(self.cols - 1);
        let min_y = by.saturating_sub(radius);
        let max_y = (by + radius).min(self.rows - 1);
        (min_x..=max_x).flat_map(move |nx| {
            (min_y..=max_y).map(move |ny| &self.buckets[nx + ny * self.cols])
        })
    }

    /// Total number of indexed entries.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
