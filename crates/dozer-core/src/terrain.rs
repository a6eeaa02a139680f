use crate::config::TerrainProfile;
use crate::world::SimError;
use rayon::prelude::*;
use std::f32::consts::TAU;

/// Slopes at or below this magnitude are left alone by `relax`.
pub const RELAX_THRESHOLD: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Neighbor {
    West,
    East,
    North,
    South,
}

/// Row-major height grid with one-directional gradient buffers.
///
/// `grad_east[i]` holds `h[x+1, y] - h[x, y]` and `grad_south[i]` holds
/// `h[x, y+1] - h[x, y]`; both are zero where the neighbour does not exist.
#[derive(Clone, Debug)]
pub struct TerrainField {
    width: usize,
    height: usize,
    heights: Vec<f32>,
    grad_east: Vec<f32>,
    grad_south: Vec<f32>,
    flows: Vec<Option<(Neighbor, f32)>>,
    max_height: f32,
    mean_height: f32,
    relax_threshold: f32,
}

impl TerrainField {
    /// Flat zero field. Callers guarantee non-zero dimensions (`SimConfig::validate`).
    pub fn new(width: usize, height: usize) -> Self {
        debug_assert!(width > 0 && height > 0, "terrain dimensions must be positive");
        let cells = width * height;
        Self {
            width,
            height,
            heights: vec![0.0; cells],
            grad_east: vec![0.0; cells],
            grad_south: vec![0.0; cells],
            flows: vec![None; cells],
            max_height: 0.0,
            mean_height: 0.0,
            relax_threshold: RELAX_THRESHOLD,
        }
    }

    /// Field built from explicit row-major heights.
    pub fn from_heights(width: usize, height: usize, heights: Vec<f32>) -> Result<Self, SimError> {
        if width == 0 || height == 0 || heights.len() != width * height {
            return Err(SimError::GridShape {
                width,
                height,
                len: heights.len(),
            });
        }
        let mut field = Self::new(width, height);
        field.heights = heights;
        Ok(field)
    }

    pub fn with_relax_threshold(mut self, threshold: f32) -> Self {
        self.relax_threshold = threshold;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn grad_east(&self) -> &[f32] {
        &self.grad_east
    }

    pub fn grad_south(&self) -> &[f32] {
        &self.grad_south
    }

    /// Largest elevation seen by the last `compute_gradients`.
    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Mean elevation seen by the last `compute_gradients`.
    pub fn mean_height(&self) -> f32 {
        self.mean_height
    }

    pub fn total_volume(&self) -> f64 {
        self.heights.iter().map(|&h| h as f64).sum()
    }

    /// Reseed every cell from `profile`. Identical dimensions and profile
    /// always produce identical grids.
    pub fn initialize(&mut self, profile: &TerrainProfile) {
        let w = self.width;
        let h = self.height;
        let profile = *profile;
        self.heights
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(row, cells)| {
                for (col, cell) in cells.iter_mut().enumerate() {
                    *cell = profile_height(&profile, col, row, w, h);
                }
            });
        self.grad_east.fill(0.0);
        self.grad_south.fill(0.0);
        self.flows.fill(None);
        self.compute_gradients();
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn checked_index(&self, x: i64, y: i64) -> Result<usize, SimError> {
        if x < 0 || y < 0 || x as u64 >= self.width as u64 || y as u64 >= self.height as u64 {
            return Err(SimError::OutOfBounds { x, y });
        }
        Ok(self.index(x as usize, y as usize))
    }

    pub fn get_height(&self, x: i64, y: i64) -> Result<f32, SimError> {
        let idx = self.checked_index(x, y)?;
        Ok(self.heights[idx])
    }

    pub fn set_height(&mut self, x: i64, y: i64, value: f32) -> Result<(), SimError> {
        let idx = self.checked_index(x, y)?;
        self.heights[idx] = value;
        Ok(())
    }

    /// Map a continuous coordinate onto the nearest valid cell. NaN maps to 0.
    pub fn clamp_cell(&self, x: f64, y: f64) -> (usize, usize) {
        let clamp_axis = |v: f64, len: usize| -> usize {
            let v = v.floor();
            if v.is_nan() || v <= 0.0 {
                0
            } else {
                (v as usize).min(len - 1)
            }
        };
        (clamp_axis(x, self.width), clamp_axis(y, self.height))
    }

    /// Height at the cell containing `(x, y)`, clamped into the grid.
    pub fn sample(&self, x: f64, y: f64) -> f32 {
        let (cx, cy) = self.clamp_cell(x, y);
        self.heights[self.index(cx, cy)]
    }

    pub(crate) fn cell(&self, cell: (usize, usize)) -> f32 {
        self.heights[self.index(cell.0, cell.1)]
    }

    pub(crate) fn cell_mut(&mut self, cell: (usize, usize)) -> &mut f32 {
        let idx = self.index(cell.0, cell.1);
        &mut self.heights[idx]
    }

    /// Refresh both gradient buffers and the max/mean statistics.
    pub fn compute_gradients(&mut self) {
        let w = self.width;
        let h = self.height;
        let heights = &self.heights;

        self.grad_east
            .par_chunks_mut(w)
            .zip(self.grad_south.par_chunks_mut(w))
            .enumerate()
            .for_each(|(y, (east, south))| {
                let row = &heights[y * w..(y + 1) * w];
                for x in 0..w {
                    east[x] = if x + 1 < w { row[x + 1] - row[x] } else { 0.0 };
                    south[x] = if y + 1 < h {
                        heights[(y + 1) * w + x] - row[x]
                    } else {
                        0.0
                    };
                }
            });

        // Per-row partials are combined in row order so the mean is bit-stable.
        let partials: Vec<(f32, f64)> = heights
            .par_chunks(w)
            .map(|row| {
                row.iter().fold((f32::NEG_INFINITY, 0.0f64), |(max, sum), &v| {
                    (max.max(v), sum + v as f64)
                })
            })
            .collect();
        let (max, sum) = partials
            .into_iter()
            .fold((f32::NEG_INFINITY, 0.0f64), |(m, s), (rm, rs)| {
                (m.max(rm), s + rs)
            });
        self.max_height = max;
        self.mean_height = (sum / heights.len() as f64) as f32;
    }

    /// One erosion pass over interior cells using the stored gradients.
    ///
    /// Each cell moves half of its steepest downhill slope to that neighbour
    /// when the slope exceeds the threshold; ties go to the first of
    /// west, east, north, south. Transfers are read from the same gradient
    /// snapshot, so the pass is order-independent and can run row-parallel.
    pub fn relax(&mut self) {
        let w = self.width;
        let h = self.height;
        if w < 3 || h < 3 {
            return;
        }
        let threshold = self.relax_threshold;
        let east = &self.grad_east;
        let south = &self.grad_south;

        self.flows
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, flows)| {
                for (x, flow) in flows.iter_mut().enumerate() {
                    *flow = None;
                    if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                        continue;
                    }
                    let i = y * w + x;
                    let slopes = [
                        (Neighbor::West, -east[i - 1]),
                        (Neighbor::East, east[i]),
                        (Neighbor::North, -south[i - w]),
                        (Neighbor::South, south[i]),
                    ];
                    let mut steepest = slopes[0];
                    for &candidate in &slopes[1..] {
                        if candidate.1 < steepest.1 {
                            steepest = candidate;
                        }
                    }
                    let magnitude = -steepest.1;
                    if magnitude > threshold {
                        *flow = Some((steepest.0, magnitude * 0.5));
                    }
                }
            });

        let flows = &self.flows;
        let incoming = |idx: usize, from: Neighbor| -> f32 {
            match flows[idx] {
                Some((dir, amount)) if dir == from => amount,
                _ => 0.0,
            }
        };
        self.heights
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    let i = y * w + x;
                    let mut delta = 0.0f32;
                    if let Some((_, amount)) = flows[i] {
                        delta -= amount;
                    }
                    if x > 0 {
                        delta += incoming(i - 1, Neighbor::East);
                    }
                    if x + 1 < w {
                        delta += incoming(i + 1, Neighbor::West);
                    }
                    if y > 0 {
                        delta += incoming(i - w, Neighbor::South);
                    }
                    if y + 1 < h {
                        delta += incoming(i + w, Neighbor::North);
                    }
                    *cell += delta;
                }
            });
    }
}

fn profile_height(profile: &TerrainProfile, col: usize, row: usize, w: usize, h: usize) -> f32 {
    match *profile {
        TerrainProfile::Flat { level } => level,
        TerrainProfile::CosineRidge {
            base,
            amplitude,
            wavelength,
        } => {
            if wavelength == 0.0 {
                return base + amplitude;
            }
            base + amplitude * (TAU * row as f32 / wavelength).cos()
        }
        TerrainProfile::RadialBowl {
            base,
            depth,
            radius,
        } => {
            let dx = col as f32 + 0.5 - w as f32 * 0.5;
            let dy = row as f32 + 0.5 - h as f32 * 0.5;
            let d2 = dx * dx + dy * dy;
            let r2 = radius * radius;
            if d2 < r2 {
                base - depth * (1.0 - d2 / r2)
            } else {
                base
            }
        }
        TerrainProfile::SineColumns { amplitude } => amplitude * (col as f32).sin(),
    }
}
