//! HEALPix RING-scheme pixelization and the pixel index built on it.

pub mod pix;
pub mod query;
pub mod utils;

pub use pix::{ang2pix_ring, pix2ang_ring, pix2ring_ring, pix2vec_ring, ring2z_ring, vec2pix_ring};
pub use query::query_disc_ring;
pub use utils::{npix2nside, nring2nside, nside2npix, nside2nring, nside2pixarea, nside2resol};

use crate::{
    coordinates::{SphCoord, Vec3d},
    errors::HealpixError,
};

/// Equal-area sphere pixelization at a fixed resolution.
///
/// Directions are exchanged as longitude/latitude in degrees at this level; the
/// free functions in [`pix`] work with colatitude/longitude in radians.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SphericalPixelIndex {
    nside: usize,
    npix: usize,
}

impl SphericalPixelIndex {
    pub fn new(nside: usize) -> Result<SphericalPixelIndex, HealpixError> {
        if nside == 0 {
            return Err(HealpixError::InvalidNside(nside));
        }
        Ok(SphericalPixelIndex {
            nside,
            npix: nside2npix(nside),
        })
    }

    pub fn from_npix(npix: usize) -> Result<SphericalPixelIndex, HealpixError> {
        let nside = npix2nside(npix).ok_or(HealpixError::InvalidNpix(npix))?;
        SphericalPixelIndex::new(nside)
    }

    pub fn nside(&self) -> usize {
        self.nside
    }

    pub fn npix(&self) -> usize {
        self.npix
    }

    /// Solid angle of one pixel in steradians.
    pub fn pixel_area(&self) -> f64 {
        nside2pixarea(self.nside)
    }

    /// Typical pixel size in radians.
    pub fn resolution(&self) -> f64 {
        nside2resol(self.nside)
    }

    pub fn direction_to_pixel(&self, lon: f64, lat: f64) -> usize {
        self.vec_to_pixel(&SphCoord::from_lonlat_deg(lon, lat).to_vec3d())
    }

    pub fn vec_to_pixel(&self, v: &Vec3d) -> usize {
        vec2pix_ring(self.nside, v)
    }

    pub fn pixel_to_direction(&self, pixel: usize) -> Result<(f64, f64), HealpixError> {
        let s = pix2ang_ring(self.nside, self.check(pixel)?);
        Ok((s.lon_deg(), s.lat_deg()))
    }

    pub fn pixel_to_vec(&self, pixel: usize) -> Result<Vec3d, HealpixError> {
        Ok(pix2vec_ring(self.nside, self.check(pixel)?))
    }

    /// Every pixel whose center is within `radius` radians of `center`, sorted.
    pub fn pixels_within_radius(&self, center: &Vec3d, radius: f64) -> Vec<usize> {
        query_disc_ring(self.nside, center, radius)
    }

    fn check(&self, pixel: usize) -> Result<usize, HealpixError> {
        if pixel < self.npix {
            Ok(pixel)
        } else {
            Err(HealpixError::PixelOutOfRange {
                pixel,
                npix: self.npix,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rejects_bad_resolution() {
        assert_eq!(SphericalPixelIndex::new(0), Err(HealpixError::InvalidNside(0)));
        assert_eq!(SphericalPixelIndex::from_npix(100), Err(HealpixError::InvalidNpix(100)));
        assert_eq!(SphericalPixelIndex::from_npix(192).map(|i| i.nside()), Ok(4));
    }

    #[test]
    fn direction_roundtrip_through_pixel_centers() {
        let index = SphericalPixelIndex::new(32).unwrap();
        for pixel in (0..index.npix()).step_by(37) {
            let (lon, lat) = index.pixel_to_direction(pixel).unwrap();
            assert_eq!(index.direction_to_pixel(lon, lat), pixel);
        }
        assert!(index.pixel_to_direction(index.npix()).is_err());
    }

    #[test]
    fn disc_grows_monotonically() {
        let index = SphericalPixelIndex::new(32).unwrap();
        let center = SphCoord::from_lonlat_deg(71.3, -22.8).to_vec3d();
        let mut previous: Vec<usize> = Vec::new();
        for step in 0..40 {
            let radius = (0.25 * step as f64).to_radians();
            let disc = index.pixels_within_radius(&center, radius);
            assert!(previous.iter().all(|p| disc.binary_search(p).is_ok()));
            assert!(disc.windows(2).all(|w| w[0] < w[1]));
            previous = disc;
        }
    }

    #[test]
    fn disc_area_tracks_cap_area() {
        let index = SphericalPixelIndex::new(64).unwrap();
        let center = SphCoord::from_lonlat_deg(10.0, 30.0).to_vec3d();
        let radius = 10_f64.to_radians();
        let n = index.pixels_within_radius(&center, radius).len() as f64;
        let cap = 2.0 * std::f64::consts::PI * (1.0 - radius.cos());
        assert_abs_diff_eq!(n * index.pixel_area() / cap, 1.0, epsilon = 0.03);
    }
}
