use std::f64::consts::PI;

use crate::coordinates::Vec3d;

use super::{
    pix::{ring_above, ring_info},
    utils::{nside2npix, nside2nring},
};

/// Pixels whose centers lie within `radius` radians of the unit vector `center`.
///
/// A pixel is inside when `dot(center, pixel_center) >= cos(radius)`. Candidate
/// windows are padded by one pixel per ring and one ring on each side, and every
/// candidate goes through the same test, so the result is exhaustive and the
/// query is monotonic in `radius`. The output is sorted and free of duplicates.
pub fn query_disc_ring(nside: usize, center: &Vec3d, radius: f64) -> Vec<usize> {
    if radius < 0.0 {
        return Vec::new();
    }
    if radius >= PI {
        return (0..nside2npix(nside)).collect();
    }
    let center = center.normalized();
    let cosr = radius.cos();
    let z0 = center.z.clamp(-1.0, 1.0);
    let theta0 = z0.acos();
    let s0 = (1.0 - z0 * z0).max(0.0).sqrt();
    let phi0 = center.y.atan2(center.x);

    let zmax = (theta0 - radius).max(0.0).cos();
    let zmin = (theta0 + radius).min(PI).cos();
    let nring = nside2nring(nside);
    let ir_min = ring_above(nside, zmax).max(1);
    let ir_max = (ring_above(nside, zmin) + 1).min(nring);

    let mut result = Vec::new();
    for iring in ir_min..=ir_max {
        let ring = ring_info(nside, iring);
        let z = ring.z;
        let s = (1.0 - z * z).max(0.0).sqrt();
        let mut accept = |j: usize| {
            let phi = ring.phi(j);
            let v = Vec3d::new(s * phi.cos(), s * phi.sin(), z);
            if v.dot(&center) >= cosr {
                result.push(ring.start + j);
            }
        };

        let denom = s * s0;
        let dphi = if denom <= 0.0 {
            PI
        } else {
            let x = (cosr - z * z0) / denom;
            if x <= -1.0 {
                PI
            } else if x >= 1.0 {
                0.0
            } else {
                x.acos()
            }
        };

        let n = ring.npix as i64;
        let dp = 2.0 * PI / ring.npix as f64;
        let offset = if ring.shifted { 0.5 } else { 0.0 };
        let jlo = ((phi0 - dphi) / dp - offset).ceil() as i64 - 1;
        let jhi = ((phi0 + dphi) / dp - offset).floor() as i64 + 1;
        if dphi >= PI || jhi - jlo + 1 >= n {
            (0..ring.npix).for_each(&mut accept);
        } else {
            (jlo..=jhi).for_each(|j| accept(j.rem_euclid(n) as usize));
        }
    }
    result.sort_unstable();
    result.dedup();
    result
}
