//! Cutout extraction and stacking over a finished [`SkyMap`].
//!
//! A cutout is a regular grid of cell centers laid out in a halo-centric frame:
//! offsets in longitude and latitude, in degrees, measured from the halo's sky
//! position as if it sat on the equator at longitude 0. Each cell is rotated onto
//! the sky and sampled from the nearest pixel, so grids stay undistorted near
//! the poles. Arrays are indexed `[lat_cell, lon_cell]`.

use std::f64::consts::FRAC_PI_2;

use log::{debug, info};
use ndarray::{Array2, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    canvas::SkyMap,
    coordinates::{RotMatrix, Vec3d},
    errors::StackError,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    #[default]
    Mean,
    Sum,
}

/// What happens to cutout cells that fall outside the canvas footprint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfBounds {
    /// Drop those cells from the per-cell reduction; the halo still counts.
    #[default]
    Mask,
    /// Drop the whole halo and report it in [`Stack::excluded`].
    Exclude,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackCfg {
    pub n_lon: usize,
    pub n_lat: usize,
    pub statistic: Statistic,
    pub out_of_bounds: OutOfBounds,
    /// Threads used by [`SkyMap::stack_cutouts_parallel`].
    pub n_workers: usize,
}

impl Default for StackCfg {
    fn default() -> StackCfg {
        StackCfg {
            n_lon: 41,
            n_lat: 41,
            statistic: Statistic::Mean,
            out_of_bounds: OutOfBounds::Mask,
            n_workers: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stack {
    /// Per-cell mean or sum. Under `Mean`, cells no halo contributed to are NaN.
    pub values: Array2<f64>,
    /// Number of halos that contributed to each cell.
    pub counts: Array2<usize>,
    pub n_stacked: usize,
    /// Halos dropped under [`OutOfBounds::Exclude`], in input order.
    pub excluded: Vec<usize>,
}

/// Cell-center offsets in degrees.
struct Grid {
    lon: Vec<f64>,
    lat: Vec<f64>,
}

fn cell_centers((lo, hi): (f64, f64), n: usize) -> Vec<f64> {
    let step = (hi - lo) / n as f64;
    (0..n).map(|i| lo + (i as f64 + 0.5) * step).collect()
}

impl Grid {
    fn new(lon_range: (f64, f64), lat_range: (f64, f64), n_lon: usize, n_lat: usize) -> Result<Grid, StackError> {
        if n_lon == 0 || n_lat == 0 {
            return Err(StackError::EmptyGrid { n_lon, n_lat });
        }
        for &(lo, hi) in [lon_range, lat_range].iter() {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(StackError::BadRange(lo, hi));
            }
        }
        Ok(Grid {
            lon: cell_centers(lon_range, n_lon),
            lat: cell_centers(lat_range, n_lat),
        })
    }

    fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }
}

/// Running (sum, count) of one worker.
struct Partial {
    sum: Array2<f64>,
    counts: Array2<usize>,
    n_stacked: usize,
    excluded: Vec<usize>,
}

impl Partial {
    fn zeros(shape: (usize, usize)) -> Partial {
        Partial {
            sum: Array2::zeros(shape),
            counts: Array2::zeros(shape),
            n_stacked: 0,
            excluded: Vec::new(),
        }
    }

    fn merge(mut self, other: Partial) -> Partial {
        self.sum += &other.sum;
        self.counts += &other.counts;
        self.n_stacked += other.n_stacked;
        self.excluded.extend(other.excluded);
        self
    }

    fn finish(self, statistic: Statistic) -> Stack {
        let values = match statistic {
            Statistic::Sum => self.sum,
            Statistic::Mean => Zip::from(&self.sum)
                .and(&self.counts)
                .map_collect(|&s, &c| if c == 0 { f64::NAN } else { s / c as f64 }),
        };
        Stack {
            values,
            counts: self.counts,
            n_stacked: self.n_stacked,
            excluded: self.excluded,
        }
    }
}

impl<'a> SkyMap<'a> {
    /// Rotation taking the halo-centric frame (halo on +x) onto the sky.
    fn halo_frame(&self, halo: usize) -> Result<RotMatrix, StackError> {
        self.catalog.halo(halo)?;
        let proj = self.geometry.project(halo, &self.catalog.position(halo))?;
        let s = proj.direction.to_sph_coord();
        let lat = FRAC_PI_2 - s.pol;
        Ok(
            RotMatrix::about_axis_by_angle(&Vec3d::new(0.0, 0.0, 1.0), s.az)
                * RotMatrix::about_axis_by_angle(&Vec3d::new(0.0, 1.0, 0.0), -lat),
        )
    }

    /// Nearest-pixel samples; `None` where the cell lies outside the footprint.
    fn sample(&self, halo: usize, grid: &Grid) -> Result<Array2<Option<f64>>, StackError> {
        let rot = self.halo_frame(halo)?;
        let lons: Vec<(f64, f64)> = grid.lon.iter().map(|a| a.to_radians().sin_cos()).collect();
        Ok(Array2::from_shape_fn(grid.shape(), |(i, j)| {
            let (sb, cb) = grid.lat[i].to_radians().sin_cos();
            let (sa, ca) = lons[j];
            let dir = rot.apply(&Vec3d::new(cb * ca, cb * sa, sb));
            let pixel = self.index.vec_to_pixel(&dir);
            if self.in_footprint(pixel) {
                Some(self.buffer[pixel])
            } else {
                None
            }
        }))
    }

    /// One halo's cutout, NaN where the grid leaves the footprint.
    pub fn cutout(
        &self,
        halo: usize,
        lon_range: (f64, f64),
        lat_range: (f64, f64),
        n_lon: usize,
        n_lat: usize,
    ) -> Result<Array2<f64>, StackError> {
        let grid = Grid::new(lon_range, lat_range, n_lon, n_lat)?;
        Ok(self.sample(halo, &grid)?.map(|v| v.unwrap_or(f64::NAN)))
    }

    fn accumulate(&self, halos: &[usize], grid: &Grid, policy: OutOfBounds) -> Result<Partial, StackError> {
        let mut partial = Partial::zeros(grid.shape());
        for &halo in halos {
            let cells = self.sample(halo, grid)?;
            if policy == OutOfBounds::Exclude && cells.iter().any(Option::is_none) {
                debug!("halo {} excluded: cutout leaves the footprint", halo);
                partial.excluded.push(halo);
                continue;
            }
            Zip::from(&mut partial.sum)
                .and(&mut partial.counts)
                .and(&cells)
                .for_each(|s, c, v| {
                    if let Some(v) = v {
                        *s += v;
                        *c += 1;
                    }
                });
            partial.n_stacked += 1;
        }
        Ok(partial)
    }

    fn check_halos(&self, halo_list: &[usize]) -> Result<(), StackError> {
        if halo_list.is_empty() {
            return Err(StackError::NoHalos);
        }
        for &h in halo_list {
            self.catalog.halo(h)?;
        }
        Ok(())
    }

    /// Reduce the cutouts of `halo_list` cell by cell.
    ///
    /// `lon_range` and `lat_range` are offsets in degrees from each halo center.
    pub fn stack_cutouts(
        &self,
        halo_list: &[usize],
        lon_range: (f64, f64),
        lat_range: (f64, f64),
        cfg: &StackCfg,
    ) -> Result<Stack, StackError> {
        let grid = Grid::new(lon_range, lat_range, cfg.n_lon, cfg.n_lat)?;
        self.check_halos(halo_list)?;
        let stack = self
            .accumulate(halo_list, &grid, cfg.out_of_bounds)?
            .finish(cfg.statistic);
        info!(
            "stacked {} of {} halos on a {}x{} grid ({} excluded)",
            stack.n_stacked,
            halo_list.len(),
            cfg.n_lat,
            cfg.n_lon,
            stack.excluded.len()
        );
        Ok(stack)
    }

    /// [`SkyMap::stack_cutouts`] on `cfg.n_workers` threads. `halo_list` is split into
    /// contiguous chunks; the per-chunk partial sums are combined on the calling
    /// thread in chunk order, so repeated runs give identical results.
    pub fn stack_cutouts_parallel(
        &self,
        halo_list: &[usize],
        lon_range: (f64, f64),
        lat_range: (f64, f64),
        cfg: &StackCfg,
    ) -> Result<Stack, StackError> {
        let n_workers = cfg.n_workers;
        if n_workers == 0 {
            return Err(StackError::NoWorkers);
        }
        let grid = Grid::new(lon_range, lat_range, cfg.n_lon, cfg.n_lat)?;
        self.check_halos(halo_list)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .build()
            .map_err(|e| StackError::Pool(e.to_string()))?;

        let chunk = (halo_list.len() + n_workers - 1) / n_workers;
        let partials = pool.install(|| {
            halo_list
                .par_chunks(chunk)
                .map(|c| self.accumulate(c, &grid, cfg.out_of_bounds))
                .collect::<Result<Vec<_>, _>>()
        })?;
        let stack = partials
            .into_iter()
            .fold(Partial::zeros(grid.shape()), Partial::merge)
            .finish(cfg.statistic);
        info!(
            "stacked {} of {} halos on a {}x{} grid with {} workers ({} excluded)",
            stack.n_stacked,
            halo_list.len(),
            cfg.n_lat,
            cfg.n_lon,
            n_workers,
            stack.excluded.len()
        );
        Ok(stack)
    }
}
