use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::{
    coordinates::Vec3d,
    errors::GeometryError,
    healpix::{pix2vec_ring, SphericalPixelIndex},
};

/// How the transverse distance between a halo and a line of sight is computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusMode {
    /// Perpendicular distance from the halo center to the line of sight, `chi * sin(theta)`.
    #[default]
    Exact,
    /// Flat-sky arc length, `chi * theta`.
    SmallAngle,
}

/// The radius coordinate handed to profiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusCoordinate {
    /// Transverse distance in catalog length units.
    #[default]
    Physical,
    /// Angular separation in radians.
    Angular,
}

/// A halo's sky direction and comoving distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HaloProjection {
    pub direction: Vec3d,
    pub distance: f64,
}

/// Pixels around one halo with the radius coordinate of each.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PixelDisc {
    pub pixels: Vec<usize>,
    pub radii: Vec<f64>,
}

impl PixelDisc {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionGeometry {
    #[serde(default)]
    pub mode: RadiusMode,
    #[serde(default)]
    pub coordinate: RadiusCoordinate,
}

impl ProjectionGeometry {
    pub fn new(mode: RadiusMode, coordinate: RadiusCoordinate) -> ProjectionGeometry {
        ProjectionGeometry { mode, coordinate }
    }

    pub fn project(&self, halo: usize, position: &Vec3d) -> Result<HaloProjection, GeometryError> {
        let distance = position.length();
        if !(distance.is_finite() && distance > 0.0) {
            return Err(GeometryError::BadDistance { halo, distance });
        }
        Ok(HaloProjection {
            direction: *position * (1.0 / distance),
            distance,
        })
    }

    /// Physical distance between the halo center and the line of sight along `dir`.
    ///
    /// The line of sight is a ray from the observer, so past 90 degrees its
    /// closest point to the halo is the observer itself.
    pub fn transverse_radius(&self, proj: &HaloProjection, dir: &Vec3d) -> f64 {
        let theta = proj.direction.angle_to(dir);
        match self.mode {
            RadiusMode::Exact if theta >= FRAC_PI_2 => proj.distance,
            RadiusMode::Exact => proj.distance * theta.sin(),
            RadiusMode::SmallAngle => proj.distance * theta,
        }
    }

    /// The value a profile is evaluated at for the pixel along `dir`.
    pub fn radius_coordinate(&self, proj: &HaloProjection, dir: &Vec3d) -> f64 {
        match self.coordinate {
            RadiusCoordinate::Physical => self.transverse_radius(proj, dir),
            RadiusCoordinate::Angular => proj.direction.angle_to(dir),
        }
    }

    /// Angular radius that bounds every line of sight passing within `extent` of the halo.
    ///
    /// In exact mode a halo whose extent reaches the observer covers the whole sky.
    pub fn disc_radius(&self, halo: usize, proj: &HaloProjection, extent: f64) -> Result<f64, GeometryError> {
        if !(extent.is_finite() && extent >= 0.0) {
            return Err(GeometryError::BadRadius { halo, radius: extent });
        }
        let ratio = extent / proj.distance;
        Ok(match self.mode {
            RadiusMode::Exact if ratio >= 1.0 => PI,
            RadiusMode::Exact => ratio.asin(),
            RadiusMode::SmallAngle => ratio.min(PI),
        })
    }

    pub fn pixel_disc(&self, index: &SphericalPixelIndex, proj: &HaloProjection, angular_radius: f64) -> PixelDisc {
        let pixels = index.pixels_within_radius(&proj.direction, angular_radius);
        let radii = pixels
            .iter()
            .map(|&p| self.radius_coordinate(proj, &pix2vec_ring(index.nside(), p)))
            .collect();
        PixelDisc { pixels, radii }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::SphCoord;
    use approx::assert_abs_diff_eq;

    #[test]
    fn halo_on_a_pixel_center_has_zero_radius_there() {
        let index = SphericalPixelIndex::new(64).unwrap();
        for mode in [RadiusMode::Exact, RadiusMode::SmallAngle] {
            let geom = ProjectionGeometry::new(mode, RadiusCoordinate::Physical);
            for pixel in [0, 777, 12345, index.npix() - 1] {
                let dir = index.pixel_to_vec(pixel).unwrap();
                let proj = geom.project(0, &(dir * 350.0)).unwrap();
                let disc = geom.pixel_disc(&index, &proj, 2_f64.to_radians());
                let k = disc.pixels.binary_search(&pixel).unwrap();
                assert_abs_diff_eq!(disc.radii[k], 0.0, epsilon = 1e-10);
                assert!(disc.radii.iter().all(|&r| r >= disc.radii[k]));
            }
        }
    }

    #[test]
    fn exact_and_small_angle_agree_for_small_separations() {
        let exact = ProjectionGeometry::new(RadiusMode::Exact, RadiusCoordinate::Physical);
        let flat = ProjectionGeometry::new(RadiusMode::SmallAngle, RadiusCoordinate::Physical);
        let proj = exact.project(0, &Vec3d::new(0.0, 500.0, 0.0)).unwrap();
        let dir = SphCoord::from_lonlat_deg(90.0, 0.1).to_vec3d();
        let r1 = exact.transverse_radius(&proj, &dir);
        let r2 = flat.transverse_radius(&proj, &dir);
        assert_abs_diff_eq!(r1, 500.0 * 0.1_f64.to_radians(), epsilon = 1e-5);
        assert_abs_diff_eq!(r1 / r2, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn rays_pointing_away_from_the_halo_pass_the_observer() {
        let geom = ProjectionGeometry::default();
        let proj = geom.project(0, &Vec3d::new(1.0, 0.0, 0.0)).unwrap();
        let away = Vec3d::new(-1.0, 0.0, 0.0);
        assert_eq!(geom.transverse_radius(&proj, &away), 1.0);
        let behind = SphCoord::from_lonlat_deg(120.0, 30.0).to_vec3d();
        assert_eq!(geom.transverse_radius(&proj, &behind), 1.0);
        let side = Vec3d::new(0.0, 1.0, 0.0);
        assert_abs_diff_eq!(geom.transverse_radius(&proj, &side), 1.0, epsilon = 1e-15);

        // a halo enclosing the observer: every pixel is at most chi from it
        let index = SphericalPixelIndex::new(8).unwrap();
        let extent = 3.0;
        let disc = geom.pixel_disc(&index, &proj, geom.disc_radius(0, &proj, extent).unwrap());
        assert_eq!(disc.len(), index.npix());
        assert!(disc.radii.iter().all(|&r| r <= 1.0 + 1e-12));
        let pixel = index.vec_to_pixel(&away);
        let antipode = index.pixel_to_vec(pixel).unwrap();
        let k = disc.pixels.binary_search(&pixel).unwrap();
        assert_eq!(disc.radii[k], geom.transverse_radius(&proj, &antipode));
        assert_eq!(disc.radii[k], 1.0);
    }

    #[test]
    fn angular_coordinate_is_separation() {
        let geom = ProjectionGeometry::new(RadiusMode::Exact, RadiusCoordinate::Angular);
        let proj = geom.project(0, &Vec3d::new(100.0, 0.0, 0.0)).unwrap();
        let dir = SphCoord::from_lonlat_deg(3.0, 0.0).to_vec3d();
        assert_abs_diff_eq!(geom.radius_coordinate(&proj, &dir), 3_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn disc_radius_conversion() {
        let geom = ProjectionGeometry::default();
        let proj = geom.project(3, &Vec3d::new(0.0, 0.0, 10.0)).unwrap();
        assert_abs_diff_eq!(geom.disc_radius(3, &proj, 5.0).unwrap(), 0.5_f64.asin(), epsilon = 1e-15);
        assert_eq!(geom.disc_radius(3, &proj, 20.0).unwrap(), PI);
        assert!(matches!(
            geom.disc_radius(3, &proj, f64::NAN),
            Err(GeometryError::BadRadius { halo: 3, .. })
        ));
    }

    #[test]
    fn observer_position_is_rejected() {
        let geom = ProjectionGeometry::default();
        assert_eq!(
            geom.project(5, &Vec3d::new(0.0, 0.0, 0.0)),
            Err(GeometryError::BadDistance { halo: 5, distance: 0.0 })
        );
        assert!(geom.project(6, &Vec3d::new(f64::INFINITY, 0.0, 0.0)).is_err());
    }
}
