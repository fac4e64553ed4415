use std::f64::consts::{FRAC_PI_2, PI};

use num::integer::Roots;

use crate::coordinates::{SphCoord, Vec3d};

use super::utils::{nside2ncap, nside2npix, nside2nring};

/// Layout of one iso-latitude ring of the RING scheme.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingInfo {
    /// First pixel index in the ring.
    pub start: usize,
    /// Number of pixels in the ring.
    pub npix: usize,
    /// cos(colatitude) shared by every pixel center of the ring.
    pub z: f64,
    /// Whether the first pixel center sits half a pixel east of longitude 0.
    pub shifted: bool,
}

impl RingInfo {
    pub fn phi(&self, j: usize) -> f64 {
        let offset = if self.shifted { 0.5 } else { 0.0 };
        (j as f64 + offset) * 2.0 * PI / self.npix as f64
    }
}

/// `iring` runs from 1 (northernmost) to `4 * nside - 1`.
pub fn ring_info(nside: usize, iring: usize) -> RingInfo {
    debug_assert!(iring >= 1 && iring <= nside2nring(nside));
    let npix = nside2npix(nside);
    let nside_f = nside as f64;
    if iring < nside {
        RingInfo {
            start: 2 * iring * (iring - 1),
            npix: 4 * iring,
            z: 1.0 - (iring * iring) as f64 / (3.0 * nside_f * nside_f),
            shifted: true,
        }
    } else if iring <= 3 * nside {
        RingInfo {
            start: nside2ncap(nside) + (iring - nside) * 4 * nside,
            npix: 4 * nside,
            z: (2.0 * nside_f - iring as f64) * 2.0 / (3.0 * nside_f),
            shifted: (iring - nside) % 2 == 0,
        }
    } else {
        let ir = 4 * nside - iring;
        RingInfo {
            start: npix - 2 * ir * (ir + 1),
            npix: 4 * ir,
            z: -(1.0 - (ir * ir) as f64 / (3.0 * nside_f * nside_f)),
            shifted: true,
        }
    }
}

pub fn ring2z_ring(nside: usize, iring: usize) -> f64 {
    ring_info(nside, iring).z
}

pub fn pix2ring_ring(nside: usize, ipix: usize) -> usize {
    let npix = nside2npix(nside);
    let ncap = nside2ncap(nside);
    if ipix < ncap {
        (1 + (1 + 2 * ipix).sqrt()) >> 1
    } else if ipix < npix - ncap {
        (ipix - ncap) / (4 * nside) + nside
    } else {
        let ip = npix - ipix;
        4 * nside - ((1 + (2 * ip - 1).sqrt()) >> 1)
    }
}

/// Ring of the last pixel center with a z no smaller than `z` (0 when `z` is north of ring 1).
pub fn ring_above(nside: usize, z: f64) -> usize {
    let az = z.abs();
    let nside_f = nside as f64;
    if az <= 2.0 / 3.0 {
        return (nside_f * (2.0 - 1.5 * z)) as usize;
    }
    let iring = (nside_f * (3.0 * (1.0 - az)).sqrt()) as usize;
    if z > 0.0 {
        iring
    } else {
        4 * nside - iring - 1
    }
}

pub fn pix2ang_ring(nside: usize, ipix: usize) -> SphCoord {
    let ring = ring_info(nside, pix2ring_ring(nside, ipix));
    SphCoord::new(ring.z.clamp(-1.0, 1.0).acos(), ring.phi(ipix - ring.start))
}

pub fn pix2vec_ring(nside: usize, ipix: usize) -> Vec3d {
    let ring = ring_info(nside, pix2ring_ring(nside, ipix));
    let phi = ring.phi(ipix - ring.start);
    let s = (1.0 - ring.z * ring.z).max(0.0).sqrt();
    Vec3d::new(s * phi.cos(), s * phi.sin(), ring.z)
}

pub fn ang2pix_ring(nside: usize, dir: SphCoord) -> usize {
    zphi2pix_ring(nside, dir.pol.cos(), dir.az)
}

/// Any non-zero vector is accepted; it need not be normalised.
pub fn vec2pix_ring(nside: usize, v: &Vec3d) -> usize {
    let z = v.z / v.length();
    zphi2pix_ring(nside, z, v.y.atan2(v.x))
}

fn zphi2pix_ring(nside: usize, z: f64, phi: f64) -> usize {
    let z = z.clamp(-1.0, 1.0);
    let za = z.abs();
    let mut tt = (phi / FRAC_PI_2).rem_euclid(4.0);
    if tt >= 4.0 {
        tt = 0.0;
    }
    let ns = nside as i64;
    let nl4 = 4 * ns;

    if za <= 2.0 / 3.0 {
        let temp1 = nside as f64 * (0.5 + tt);
        let temp2 = nside as f64 * z * 0.75;
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ir = ns + 1 + jp - jm;
        let kshift = 1 - (ir & 1);
        let t1 = jp + jm - ns + kshift + 1 + 2 * nl4;
        let ip = (t1 >> 1) % nl4;
        (nside2ncap(nside) as i64 + (ir - 1) * nl4 + ip) as usize
    } else {
        let tp = tt - tt.floor();
        let tmp = nside as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = (tp * tmp) as i64;
        let jm = ((1.0 - tp) * tmp) as i64;
        let ir = (jp + jm + 1).min(ns);
        let ip = ((tt * ir as f64) as i64).rem_euclid(4 * ir);
        if z > 0.0 {
            (2 * ir * (ir - 1) + ip) as usize
        } else {
            (nside2npix(nside) as i64 - 2 * ir * (ir + 1) + ip) as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::healpix::utils::nside2npix;
    use approx::assert_abs_diff_eq;

    #[test]
    fn pixel_centers_map_back_to_themselves() {
        for nside in [1, 2, 3, 4, 7, 16] {
            for ipix in 0..nside2npix(nside) {
                assert_eq!(ang2pix_ring(nside, pix2ang_ring(nside, ipix)), ipix);
                assert_eq!(vec2pix_ring(nside, &pix2vec_ring(nside, ipix)), ipix);
            }
        }
    }

    #[test]
    fn rings_partition_the_pixels() {
        let nside = 8;
        let mut total = 0;
        for iring in 1..=nside2nring(nside) {
            let ring = ring_info(nside, iring);
            assert_eq!(ring.start, total);
            total += ring.npix;
            assert_eq!(pix2ring_ring(nside, ring.start), iring);
            assert_eq!(pix2ring_ring(nside, ring.start + ring.npix - 1), iring);
        }
        assert_eq!(total, nside2npix(nside));
    }

    #[test]
    fn equator_ring_z_is_zero() {
        assert_abs_diff_eq!(ring2z_ring(4, 8), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(ring2z_ring(4, 4), 2.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn ring_above_brackets_ring_z() {
        let nside = 16;
        for iring in 1..=nside2nring(nside) {
            let z = ring2z_ring(nside, iring);
            let above = ring_above(nside, z - 1e-9);
            assert!(above == iring || above + 1 == iring || above == iring + 1, "{} {}", iring, above);
        }
    }
}
