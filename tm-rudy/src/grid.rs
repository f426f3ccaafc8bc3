//! The congestion grid proper.

use thiserror::Error;
use tm_core::geom::{Point, Rect};
use tm_core::network::Network;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("placement is empty")]
    EmptyPlacement,
    #[error("placement bounding box has zero area")]
    DegeneratePlacement,
    #[error("tile size must be positive, got {0}")]
    BadTileSize(i64),
    #[error("wire width must be positive, got {0}")]
    BadWireWidth(i64),
    #[error("placement covers {placement} nodes but the network has {nodes}")]
    PlacementTooSmall { placement: usize, nodes: usize },
    #[error("a speculative transaction is already open")]
    SpeculationOpen,
    #[error("no speculative transaction is open")]
    SpeculationClosed,
}

/// Which accumulator a read sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Committed density only.
    Committed,
    /// Committed density plus the open transaction's offsets.
    Speculative,
}

/// One grid cell. Owned exclusively by the grid; created at build time and
/// mutated for the run's lifetime.
#[derive(Debug, Clone)]
struct Tile {
    rect: Rect,
    /// Committed congestion accumulator.
    rudy: f64,
    /// Speculative accumulator, folded or discarded at transaction end.
    offset: f64,
}

/// Open speculative transaction: a single dirty rectangle bounding every
/// net touched since `begin_speculative`.
#[derive(Debug, Clone)]
struct Speculation {
    dirty: Option<Rect>,
}

/// Tile-based RUDY estimator over a placement snapshot.
pub struct Grid {
    tiles: Vec<Tile>,
    nx: usize,
    ny: usize,
    core: Rect,
    tile_size: i64,
    wire_width: i64,
    /// Pin positions per net (driver + fanouts), captured at build time.
    nets: Vec<Vec<Point>>,
    spec: Option<Speculation>,
    degenerate_nets: u64,
}

impl Grid {
    /// Partition the placement bounding box into tiles and extract nets.
    ///
    /// The last row and column absorb the remainder margin. Pin positions
    /// are copied out of `placement`, so the grid owns everything it needs
    /// for a full recompute.
    pub fn build(
        placement: &[Point],
        network: &Network,
        wire_width: i64,
        tile_size: i64,
    ) -> Result<Self, GridError> {
        if tile_size <= 0 {
            return Err(GridError::BadTileSize(tile_size));
        }
        if wire_width <= 0 {
            return Err(GridError::BadWireWidth(wire_width));
        }
        let core = Rect::bounding(placement).ok_or(GridError::EmptyPlacement)?;
        if core.area() == 0 {
            return Err(GridError::DegeneratePlacement);
        }

        let nx = (core.dx() / tile_size).max(1) as usize;
        let ny = (core.dy() / tile_size).max(1) as usize;
        let mut tiles = Vec::with_capacity(nx * ny);
        for iy in 0..ny {
            let ylo = core.ylo() + iy as i64 * tile_size;
            let yhi = if iy == ny - 1 {
                core.yhi()
            } else {
                ylo + tile_size
            };
            for ix in 0..nx {
                let xlo = core.xlo() + ix as i64 * tile_size;
                let xhi = if ix == nx - 1 {
                    core.xhi()
                } else {
                    xlo + tile_size
                };
                tiles.push(Tile {
                    rect: Rect::new(xlo, ylo, xhi, yhi),
                    rudy: 0.0,
                    offset: 0.0,
                });
            }
        }

        if placement.len() < network.len() {
            return Err(GridError::PlacementTooSmall {
                placement: placement.len(),
                nodes: network.len(),
            });
        }
        let nets = (0..network.len())
            .map(|n| network.net(n).iter().map(|&p| placement[p]).collect())
            .collect();

        Ok(Self {
            tiles,
            nx,
            ny,
            core,
            tile_size,
            wire_width,
            nets,
            spec: None,
            degenerate_nets: 0,
        })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn core(&self) -> Rect {
        self.core
    }

    /// Degenerate (single-point) nets seen so far. Reported, not fatal.
    pub fn degenerate_nets(&self) -> u64 {
        self.degenerate_nets
    }

    /// Full recompute: clear every tile, then accumulate every net.
    pub fn calculate_rudy(&mut self) {
        for t in &mut self.tiles {
            t.rudy = 0.0;
        }
        let nets = std::mem::take(&mut self.nets);
        for pins in &nets {
            self.apply_net(pins, 1.0, false);
        }
        self.nets = nets;
    }

    /// Add one net's contribution to the committed accumulators.
    pub fn add_net(&mut self, pins: &[Point]) {
        self.apply_net(pins, 1.0, false);
    }

    /// Remove one net's contribution from the committed accumulators.
    ///
    /// `add_net` followed by `remove_net` of the same pins restores every
    /// touched tile exactly.
    pub fn remove_net(&mut self, pins: &[Point]) {
        self.apply_net(pins, -1.0, false);
    }

    /// Open a speculative transaction. At most one may be open at a time;
    /// the dirty rectangle would otherwise grow without bound.
    pub fn begin_speculative(&mut self) -> Result<(), GridError> {
        if self.spec.is_some() {
            return Err(GridError::SpeculationOpen);
        }
        self.spec = Some(Speculation { dirty: None });
        Ok(())
    }

    pub fn add_net_speculative(&mut self, pins: &[Point]) -> Result<(), GridError> {
        if self.spec.is_none() {
            return Err(GridError::SpeculationClosed);
        }
        self.apply_net(pins, 1.0, true);
        Ok(())
    }

    pub fn remove_net_speculative(&mut self, pins: &[Point]) -> Result<(), GridError> {
        if self.spec.is_none() {
            return Err(GridError::SpeculationClosed);
        }
        self.apply_net(pins, -1.0, true);
        Ok(())
    }

    /// Discard the open transaction, zeroing offsets only inside the dirty
    /// rectangle. Cost is bounded by the transaction's footprint, not the
    /// grid size.
    pub fn rollback(&mut self) -> Result<(), GridError> {
        let spec = self.spec.take().ok_or(GridError::SpeculationClosed)?;
        if let Some(dirty) = spec.dirty {
            for idx in self.tile_range(&dirty) {
                self.tiles[idx].offset = 0.0;
            }
        }
        Ok(())
    }

    /// Fold the open transaction's offsets into the committed accumulators.
    pub fn commit(&mut self) -> Result<(), GridError> {
        let spec = self.spec.take().ok_or(GridError::SpeculationClosed)?;
        if let Some(dirty) = spec.dirty {
            for idx in self.tile_range(&dirty) {
                let t = &mut self.tiles[idx];
                t.rudy += t.offset;
                t.offset = 0.0;
            }
        }
        Ok(())
    }

    /// Density at a point, in the requested view. `None` outside the core.
    pub fn rudy_at(&self, x: i64, y: i64, view: View) -> Option<f64> {
        let p = Point::new(x, y);
        if !self.core.contains(p) {
            return None;
        }
        let ix = (((x - self.core.xlo()) / self.tile_size) as usize).min(self.nx - 1);
        let iy = (((y - self.core.ylo()) / self.tile_size) as usize).min(self.ny - 1);
        let t = &self.tiles[iy * self.nx + ix];
        Some(match view {
            View::Committed => t.rudy,
            View::Speculative => t.rudy + t.offset,
        })
    }

    /// Congestion-adjusted wirelength signal over a query rectangle:
    /// `(max tile value) / 2 + (mean tile value)` across overlapping tiles,
    /// in the speculative view (offsets are zero when no transaction is
    /// open, so this degrades to the committed view).
    pub fn hpwl_congest(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> f64 {
        let rect = Rect::new(x1, y1, x2, y2);
        let mut max = 0.0f64;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for idx in self.tile_range(&rect) {
            let t = &self.tiles[idx];
            if !t.rect.intersects(&rect) {
                continue;
            }
            let v = t.rudy + t.offset;
            max = max.max(v);
            sum += v;
            count += 1;
        }
        if count == 0 {
            return 0.0;
        }
        max / 2.0 + sum / count as f64
    }

    /// Accumulate (or retract) one net: bounding rect of the pins expanded
    /// by half the wire width per side; each overlapping tile receives the
    /// net's congestion scaled by its share of the expanded rect.
    fn apply_net(&mut self, pins: &[Point], sign: f64, speculative: bool) {
        let Some(bbox) = Rect::bounding(pins) else {
            return;
        };
        let expanded = bbox.expand(self.wire_width / 2);
        // Degenerate nets: single-point, or collinear with a wire too thin
        // to give the expanded rect any area. Either would divide by zero.
        // Reported, not fatal; retraction does not re-count.
        if bbox.hpwl() == 0 || expanded.area() == 0 {
            if sign > 0.0 {
                self.degenerate_nets += 1;
            }
            return;
        }
        let congestion =
            (bbox.hpwl() as f64 * self.wire_width as f64) / expanded.area() as f64;

        if speculative {
            let spec = self.spec.as_mut().expect("transaction checked by caller");
            spec.dirty = Some(match spec.dirty {
                Some(d) => d.merge(&expanded),
                None => expanded,
            });
        }

        for idx in self.tile_range(&expanded) {
            let t = &mut self.tiles[idx];
            let Some(ov) = t.rect.intersect(&expanded) else {
                continue;
            };
            let share = ov.area() as f64 / t.rect.area() as f64;
            let add = sign * congestion * share * 100.0;
            if speculative {
                t.offset += add;
            } else {
                t.rudy += add;
            }
        }
    }

    /// Indices of tiles whose row/column range can touch `rect`.
    fn tile_range(&self, rect: &Rect) -> Vec<usize> {
        if !rect.intersects(&self.core) {
            return Vec::new();
        }
        let clip = |v: i64, lo: i64, n: usize| -> usize {
            (((v.max(lo) - lo) / self.tile_size) as usize).min(n - 1)
        };
        let ix0 = clip(rect.xlo(), self.core.xlo(), self.nx);
        let ix1 = clip(rect.xhi(), self.core.xlo(), self.nx);
        let iy0 = clip(rect.ylo(), self.core.ylo(), self.ny);
        let iy1 = clip(rect.yhi(), self.core.ylo(), self.ny);
        let mut out = Vec::with_capacity((ix1 - ix0 + 1) * (iy1 - iy0 + 1));
        for iy in iy0..=iy1 {
            for ix in ix0..=ix1 {
                out.push(iy * self.nx + ix);
            }
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn tile_values(&self, view: View) -> Vec<f64> {
        self.tiles
            .iter()
            .map(|t| match view {
                View::Committed => t.rudy,
                View::Speculative => t.rudy + t.offset,
            })
            .collect()
    }
}
