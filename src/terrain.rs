use rand::Rng;

use crate::config::SimulationConfig;
use crate::types::TerrainKind;

/// Fixed ground classification, generated once per world.
#[derive(Clone, Debug)]
pub struct Terrain {
    cells: Vec<TerrainKind>,
    cols: usize,
    rows: usize,
    cell_size: f32,
    width: f32,
    height: f32,
}

impl Terrain {
    /// A world with no obstacles at all.
    pub fn open(width: f32, height: f32, cell_size: f32) -> Self {
        let cols = (width / cell_size).ceil() as usize;
        let rows = (height / cell_size).ceil() as usize;
        Self {
            cells: vec![TerrainKind::Open; cols * rows],
            cols,
            rows,
            cell_size,
            width,
            height,
        }
    }

    /// Stamp rock and water blobs around the mounds, leaving a safe ring open.
    pub fn generate<R: Rng>(config: &SimulationConfig, mounds: &[(f32, f32)], rng: &mut R) -> Self {
        let mut terrain = Self::open(config.world.width, config.world.height, config.terrain.cell_size);
        let mound_cells: Vec<(i32, i32)> = mounds
            .iter()
            .map(|&(x, y)| terrain.world_to_grid(x, y))
            .collect();
        let tc = &config.terrain;
        terrain.stamp_blobs(
            TerrainKind::Rock,
            tc.rock_blobs,
            tc.rock_max_radius,
            &mound_cells,
            tc.mound_safe_radius,
            rng,
        );
        terrain.stamp_blobs(
            TerrainKind::Water,
            tc.water_blobs,
            tc.water_max_radius,
            &mound_cells,
            tc.mound_safe_radius,
            rng,
        );
        terrain
    }

    fn stamp_blobs<R: Rng>(
        &mut self,
        kind: TerrainKind,
        count: usize,
        max_radius: i32,
        mound_cells: &[(i32, i32)],
        safe_radius: f32,
        rng: &mut R,
    ) {
        if self.cols == 0 || self.rows == 0 {
            return;
        }
        for _ in 0..count {
            let cx = rng.gen_range(0..self.cols) as i32;
            let cy = rng.gen_range(0..self.rows) as i32;
            let radius = rng.gen_range(0..max_radius.max(1)) + 2;

            for dx in -radius..=radius {
                for dy in -radius..=radius {
                    if dx * dx + dy * dy > radius * radius {
                        continue;
                    }
                    let (gx, gy) = (cx + dx, cy + dy);
                    let Some(idx) = self.index(gx, gy) else {
                        continue;
                    };
                    let near_mound = mound_cells.iter().any(|&(mx, my)| {
                        let (mdx, mdy) = ((gx - mx) as f32, (gy - my) as f32);
                        (mdx * mdx + mdy * mdy).sqrt() <= safe_radius
                    });
                    if !near_mound && self.cells[idx] == TerrainKind::Open {
                        self.cells[idx] = kind;
                    }
                }
            }
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn cells(&self) -> &[TerrainKind] {
        &self.cells
    }

    /// Flat index of a grid cell, `None` when out of range.
    #[inline]
    pub fn index(&self, gx: i32, gy: i32) -> Option<usize> {
        if gx < 0 || gy < 0 || gx as usize >= self.cols || gy as usize >= self.rows {
            return None;
        }
        Some(gx as usize + gy as usize * self.cols)
    }

    pub fn kind(&self, gx: i32, gy: i32) -> Option<TerrainKind> {
        self.index(gx, gy).map(|idx| self.cells[idx])
    }

    /// Out-of-range cells count as blocked.
    #[inline]
    pub fn is_open(&self, gx: i32, gy: i32) -> bool {
        self.kind(gx, gy) == Some(TerrainKind::Open)
    }

    pub fn set(&mut self, gx: i32, gy: i32, kind: TerrainKind) {
        if let Some(idx) = self.index(gx, gy) {
            self.cells[idx] = kind;
        }
    }

    #[inline]
    pub fn world_to_grid(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Centre of a grid cell in world coordinates.
    pub fn grid_to_world(&self, gx: i32, gy: i32) -> (f32, f32) {
        (
            (gx as f32 + 0.5) * self.cell_size,
            (gy as f32 + 0.5) * self.cell_size,
        )
    }

    pub fn is_open_at(&self, x: f32, y: f32) -> bool {
        let (gx, gy) = self.world_to_grid(x, y);
        self.is_open(gx, gy)
    }

    /// Look-ahead probe: true when the point `look_ahead` along `heading` is blocked or off-world.
    pub fn probe(&self, x: f32, y: f32, heading: f32, look_ahead: f32) -> bool {
        let nx = x + heading.cos() * look_ahead;
        let ny = y + heading.sin() * look_ahead;
        !self.is_open_at(nx, ny)
    }

    /// Rejection-sample an open point accepted by `accept`, bounded by `max_attempts`.
    /// Falls back to the open cell nearest the last candidate; `None` only when no cell qualifies.
    pub fn find_open_point<R, C, A>(
        &self,
        rng: &mut R,
        max_attempts: usize,
        mut candidate: C,
        accept: A,
    ) -> Option<(f32, f32)>
    where
        R: Rng,
        C: FnMut(&mut R) -> (f32, f32),
        A: Fn(f32, f32) -> bool,
    {
        let mut last = (self.width * 0.5, self.height * 0.5);
        for _ in 0..max_attempts {
            let (x, y) = candidate(rng);
            if self.is_open_at(x, y) && accept(x, y) {
                return Some((x, y));
            }
            last = (x, y);
        }
        log::warn!(
            "placement rejected {max_attempts} candidates, scanning for nearest open cell"
        );
        self.nearest_open_cell(last.0, last.1, &accept)
    }

    fn nearest_open_cell<A>(&self, x: f32, y: f32, accept: &A) -> Option<(f32, f32)>
    where
        A: Fn(f32, f32) -> bool,
    {
        let mut best: Option<(f32, (f32, f32))> = None;
        for gy in 0..self.rows as i32 {
            for gx in 0..self.cols as i32 {
                if !self.is_open(gx, gy) {
                    continue;
                }
                let (cx, cy) = self.grid_to_world(gx, gy);
                let (cx, cy) = (cx.min(self.width), cy.min(self.height));
                if !accept(cx, cy) {
                    continue;
                }
                let (dx, dy) = (cx - x, cy - y);
                let dist_sq = dx * dx + dy * dy;
                if best.map_or(true, |(d, _)| dist_sq < d) {
                    best = Some((dist_sq, (cx, cy)));
                }
            }
        }
        best.map(|(_, point)| point)
    }
}
