//! Generic test shapes scaled by one named halo radius field.

use super::{Profile, ProfileKind};

/// 1 within the halo radius, 0 outside.
pub struct TopHat {
    kind: ProfileKind,
    fields: Vec<String>,
}

impl TopHat {
    pub fn new(kind: ProfileKind, radius_field: &str) -> TopHat {
        TopHat {
            kind,
            fields: vec![radius_field.to_string()],
        }
    }
}

pub fn tophat_3d(radius_field: &str) -> TopHat {
    TopHat::new(ProfileKind::ThreeD, radius_field)
}

pub fn tophat_2d(radius_field: &str) -> TopHat {
    TopHat::new(ProfileKind::Projected, radius_field)
}

impl Profile for TopHat {
    fn kind(&self) -> ProfileKind {
        self.kind
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn eval(&self, r: f64, args: &[f64]) -> f64 {
        if r <= args[0] {
            1.0
        } else {
            0.0
        }
    }
}

/// Unit-amplitude 3D Gaussian with `sigma = width * radius`.
pub struct Gaussian {
    fields: Vec<String>,
    width: f64,
}

pub fn gaussian_3d(radius_field: &str, width: f64) -> Gaussian {
    Gaussian {
        fields: vec![radius_field.to_string()],
        width,
    }
}

impl Profile for Gaussian {
    fn kind(&self) -> ProfileKind {
        ProfileKind::ThreeD
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn eval(&self, r: f64, args: &[f64]) -> f64 {
        let sigma = self.width * args[0];
        (-0.5 * (r / sigma).powi(2)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tophat_edge_is_inclusive() {
        let p = tophat_2d("R200c");
        assert_eq!(p.fields(), ["R200c".to_string()]);
        assert_eq!(p.eval(1.0, &[1.0]), 1.0);
        assert_eq!(p.eval(1.0 + 1e-12, &[1.0]), 0.0);
        assert_eq!(tophat_3d("R").kind(), ProfileKind::ThreeD);
    }

    #[test]
    fn gaussian_width_scales_with_radius() {
        let p = gaussian_3d("R", 0.5);
        assert_eq!(p.eval(0.0, &[2.0]), 1.0);
        assert!((p.eval(1.0, &[2.0]) - (-0.5_f64).exp()).abs() < 1e-15);
    }
}
