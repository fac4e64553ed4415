use num::integer::Roots;

pub fn nside2npix(nside: usize) -> usize {
    12 * nside * nside
}

/// `None` when `npix` is not `12 * nside^2` for some positive `nside`.
pub fn npix2nside(npix: usize) -> Option<usize> {
    if npix == 0 || npix % 12 != 0 {
        return None;
    }
    let nside = (npix / 12).sqrt();
    if nside2npix(nside) == npix {
        Some(nside)
    } else {
        None
    }
}

pub fn nside2nring(nside: usize) -> usize {
    4 * nside - 1
}

pub fn nring2nside(nring: usize) -> usize {
    (nring + 1) / 4
}

/// Number of pixels in the north polar cap.
pub fn nside2ncap(nside: usize) -> usize {
    2 * nside * (nside - 1)
}

pub fn nside2pixarea(nside: usize) -> f64 {
    4.0 * std::f64::consts::PI / nside2npix(nside) as f64
}

/// Square root of the pixel area, in radians.
pub fn nside2resol(nside: usize) -> f64 {
    nside2pixarea(nside).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npix_nside_roundtrip() {
        for nside in [1, 2, 3, 8, 17, 1024] {
            assert_eq!(npix2nside(nside2npix(nside)), Some(nside));
        }
        assert_eq!(npix2nside(13), None);
        assert_eq!(npix2nside(24), None);
        assert_eq!(nring2nside(nside2nring(64)), 64);
    }
}
