use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{Catalog, Patch},
    errors::{HealpixError, PaintError},
    geometry::{HaloProjection, PixelDisc, ProjectionGeometry, RadiusCoordinate, RadiusMode},
    healpix::{pix2ang_ring, SphericalPixelIndex},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasCfg {
    pub nside: usize,
    /// Discs extend to `r_times` halo radii.
    pub r_times: f64,
    /// Catalog column holding the halo radius that sets the disc size.
    pub radius_field: String,
    pub radius_mode: RadiusMode,
    pub radius_coordinate: RadiusCoordinate,
    /// Populated region of a patch map; `None` for all-sky.
    pub footprint: Option<Patch>,
}

impl Default for CanvasCfg {
    fn default() -> CanvasCfg {
        CanvasCfg {
            nside: 256,
            r_times: 1.0,
            radius_field: "R200c".to_string(),
            radius_mode: RadiusMode::Exact,
            radius_coordinate: RadiusCoordinate::Physical,
            footprint: None,
        }
    }
}

/// Map under construction. Only [`crate::painter::Painter`] writes into it;
/// [`Canvas::freeze`] ends the write phase and hands out a read-only [`SkyMap`].
pub struct Canvas<'a> {
    catalog: &'a Catalog,
    cfg: CanvasCfg,
    index: SphericalPixelIndex,
    geometry: ProjectionGeometry,
    footprint: Option<Vec<bool>>,
    buffer: Vec<f64>,
}

fn footprint_mask(index: &SphericalPixelIndex, patch: &Patch) -> Vec<bool> {
    (0..index.npix())
        .map(|p| {
            let s = pix2ang_ring(index.nside(), p);
            patch.contains(s.lon_deg(), s.lat_deg())
        })
        .collect()
}

impl<'a> Canvas<'a> {
    pub fn new(catalog: &'a Catalog, cfg: CanvasCfg) -> Result<Canvas<'a>, HealpixError> {
        let index = SphericalPixelIndex::new(cfg.nside)?;
        let footprint = cfg.footprint.as_ref().map(|p| footprint_mask(&index, p));
        info!(
            "canvas nside={} npix={} r_times={} for {} halos from '{}'",
            index.nside(),
            index.npix(),
            cfg.r_times,
            catalog.len(),
            catalog.meta().source
        );
        Ok(Canvas {
            catalog,
            geometry: ProjectionGeometry::new(cfg.radius_mode, cfg.radius_coordinate),
            cfg,
            index,
            footprint,
            buffer: vec![0.0; index.npix()],
        })
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn cfg(&self) -> &CanvasCfg {
        &self.cfg
    }

    pub fn pixel_index(&self) -> &SphericalPixelIndex {
        &self.index
    }

    pub fn geometry(&self) -> &ProjectionGeometry {
        &self.geometry
    }

    pub fn in_footprint(&self, pixel: usize) -> bool {
        self.footprint.as_ref().map_or(true, |m| m[pixel])
    }

    pub fn data(&self) -> &[f64] {
        &self.buffer
    }

    pub fn halo_projection(&self, halo: usize) -> Result<HaloProjection, PaintError> {
        Ok(self.geometry.project(halo, &self.catalog.position(halo))?)
    }

    /// Footprint pixels within `r_times` halo radii of the halo's line of sight.
    pub fn pixel_disc(&self, halo: usize) -> Result<PixelDisc, PaintError> {
        let column = self
            .catalog
            .column_index(&self.cfg.radius_field)
            .ok_or_else(|| PaintError::MissingField {
                field: self.cfg.radius_field.clone(),
                halo,
            })?;
        let proj = self.halo_projection(halo)?;
        let extent = self.cfg.r_times * self.catalog.value(halo, column);
        let radius = self.geometry.disc_radius(halo, &proj, extent)?;
        let mut disc = self.geometry.pixel_disc(&self.index, &proj, radius);
        if self.footprint.is_some() {
            let (pixels, radii) = disc
                .pixels
                .iter()
                .zip(disc.radii.iter())
                .filter(|(p, _)| self.in_footprint(**p))
                .map(|(&p, &r)| (p, r))
                .unzip();
            disc = PixelDisc { pixels, radii };
        }
        Ok(disc)
    }

    pub(crate) fn add(&mut self, pixels: &[usize], values: &[f64]) {
        for (&p, &v) in pixels.iter().zip(values.iter()) {
            self.buffer[p] += v;
        }
    }

    pub fn freeze(self) -> SkyMap<'a> {
        SkyMap {
            catalog: self.catalog,
            cfg: self.cfg,
            index: self.index,
            geometry: self.geometry,
            footprint: self.footprint,
            buffer: self.buffer,
        }
    }
}

/// A finished, read-only map.
pub struct SkyMap<'a> {
    pub(crate) catalog: &'a Catalog,
    pub(crate) cfg: CanvasCfg,
    pub(crate) index: SphericalPixelIndex,
    pub(crate) geometry: ProjectionGeometry,
    pub(crate) footprint: Option<Vec<bool>>,
    pub(crate) buffer: Vec<f64>,
}

impl<'a> SkyMap<'a> {
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn cfg(&self) -> &CanvasCfg {
        &self.cfg
    }

    pub fn pixel_index(&self) -> &SphericalPixelIndex {
        &self.index
    }

    pub fn in_footprint(&self, pixel: usize) -> bool {
        self.footprint.as_ref().map_or(true, |m| m[pixel])
    }

    /// Pixel values in RING order, for rendering.
    pub fn data(&self) -> &[f64] {
        &self.buffer
    }

    pub fn into_data(self) -> Vec<f64> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogMeta;

    fn one_halo(lon: f64, lat: f64) -> Catalog {
        Catalog::from_rows(
            CatalogMeta::default(),
            ["lon", "lat", "chi", "R200c"].iter().map(|s| s.to_string()).collect(),
            &[vec![lon, lat, 100.0, 2.0]],
        )
        .unwrap()
    }

    #[test]
    fn starts_zeroed_at_the_requested_resolution() {
        let cat = one_halo(0.0, 0.0);
        let canvas = Canvas::new(
            &cat,
            CanvasCfg {
                nside: 8,
                ..CanvasCfg::default()
            },
        )
        .unwrap();
        assert_eq!(canvas.data().len(), 768);
        assert!(canvas.data().iter().all(|&v| v == 0.0));
        assert!(Canvas::new(
            &cat,
            CanvasCfg {
                nside: 0,
                ..CanvasCfg::default()
            }
        )
        .is_err());
    }

    #[test]
    fn disc_respects_footprint() {
        let cat = one_halo(10.0, 0.0);
        let all_sky = Canvas::new(
            &cat,
            CanvasCfg {
                nside: 64,
                ..CanvasCfg::default()
            },
        )
        .unwrap();
        let full = all_sky.pixel_disc(0).unwrap();
        assert!(!full.is_empty());

        let patch = Canvas::new(
            &cat,
            CanvasCfg {
                nside: 64,
                footprint: Some(Patch {
                    lon_range: (10.0, 30.0),
                    lat_range: (-5.0, 5.0),
                }),
                ..CanvasCfg::default()
            },
        )
        .unwrap();
        let clipped = patch.pixel_disc(0).unwrap();
        assert!(clipped.len() < full.len());
        assert!(clipped.pixels.iter().all(|&p| patch.in_footprint(p)));
    }

    #[test]
    fn missing_radius_column_names_the_field() {
        let cat = one_halo(0.0, 0.0);
        let canvas = Canvas::new(
            &cat,
            CanvasCfg {
                nside: 4,
                radius_field: "R500c".to_string(),
                ..CanvasCfg::default()
            },
        )
        .unwrap();
        assert_eq!(
            canvas.pixel_disc(0).unwrap_err(),
            PaintError::MissingField {
                field: "R500c".to_string(),
                halo: 0
            }
        );
    }
}
