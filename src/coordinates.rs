use std::ops::{Add, Index, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A direction on the unit sphere: `pol` is the colatitude, `az` the longitude, both in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphCoord {
    pub pol: f64,
    pub az: f64,
}

impl SphCoord {
    pub fn new(pol: f64, az: f64) -> SphCoord {
        SphCoord { pol, az }
    }

    /// Longitude and latitude in degrees.
    pub fn from_lonlat_deg(lon: f64, lat: f64) -> SphCoord {
        SphCoord::new((90.0 - lat).to_radians(), lon.to_radians())
    }

    pub fn from_xyz(x: f64, y: f64, z: f64) -> SphCoord {
        let r = (x * x + y * y + z * z).sqrt();
        let pol = (z / r).clamp(-1.0, 1.0).acos();
        let az = y.atan2(x);
        SphCoord::new(pol, if az < 0.0 { az + 2.0 * std::f64::consts::PI } else { az })
    }

    pub fn lon_deg(&self) -> f64 {
        self.az.to_degrees()
    }

    pub fn lat_deg(&self) -> f64 {
        90.0 - self.pol.to_degrees()
    }

    pub fn to_vec3d(self) -> Vec3d {
        Vec3d::from_sph_coord(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3d {
    pub fn new(x: f64, y: f64, z: f64) -> Vec3d {
        Vec3d { x, y, z }
    }

    pub fn from_sph_coord(s: SphCoord) -> Vec3d {
        let (sp, cp) = s.pol.sin_cos();
        let (sa, ca) = s.az.sin_cos();
        Vec3d::new(sp * ca, sp * sa, cp)
    }

    pub fn dot(&self, rhs: &Vec3d) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(&self, rhs: &Vec3d) -> Vec3d {
        Vec3d::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn normalized(&self) -> Vec3d {
        *self * (1.0 / self.length())
    }

    /// Angle between two (not necessarily normalised) vectors, accurate near 0 and near pi.
    pub fn angle_to(&self, rhs: &Vec3d) -> f64 {
        self.cross(rhs).length().atan2(self.dot(rhs))
    }

    pub fn to_sph_coord(&self) -> SphCoord {
        SphCoord::from_xyz(self.x, self.y, self.z)
    }
}

impl Add for Vec3d {
    type Output = Vec3d;
    fn add(self, rhs: Vec3d) -> Vec3d {
        Vec3d::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3d {
    type Output = Vec3d;
    fn sub(self, rhs: Vec3d) -> Vec3d {
        Vec3d::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3d {
    type Output = Vec3d;
    fn mul(self, rhs: f64) -> Vec3d {
        Vec3d::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Index<usize> for Vec3d {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3d index out of range: {}", i),
        }
    }
}

/// Row-major 3x3 rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotMatrix {
    m: [[f64; 3]; 3],
}

impl RotMatrix {
    pub fn identity() -> RotMatrix {
        RotMatrix {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Right-handed rotation about a unit `axis` by `angle` radians (Rodrigues).
    pub fn about_axis_by_angle(axis: &Vec3d, angle: f64) -> RotMatrix {
        let a = axis.normalized();
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        RotMatrix {
            m: [
                [t * a.x * a.x + c, t * a.x * a.y - s * a.z, t * a.x * a.z + s * a.y],
                [t * a.x * a.y + s * a.z, t * a.y * a.y + c, t * a.y * a.z - s * a.x],
                [t * a.x * a.z - s * a.y, t * a.y * a.z + s * a.x, t * a.z * a.z + c],
            ],
        }
    }

    pub fn apply(&self, v: &Vec3d) -> Vec3d {
        let m = &self.m;
        Vec3d::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }
}

impl Mul for RotMatrix {
    type Output = RotMatrix;
    fn mul(self, rhs: RotMatrix) -> RotMatrix {
        let mut m = [[0.0; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, x) in row.iter_mut().enumerate() {
                *x = (0..3).map(|k| self.m[i][k] * rhs.m[k][j]).sum();
            }
        }
        RotMatrix { m }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn lonlat_roundtrip() {
        let s = SphCoord::from_lonlat_deg(123.0, -41.5);
        let back = s.to_vec3d().to_sph_coord();
        assert_abs_diff_eq!(back.lon_deg(), 123.0, epsilon = 1e-10);
        assert_abs_diff_eq!(back.lat_deg(), -41.5, epsilon = 1e-10);
    }

    #[test]
    fn rotation_about_z_moves_x_to_y() {
        let rot = RotMatrix::about_axis_by_angle(&Vec3d::new(0.0, 0.0, 1.0), 90_f64.to_radians());
        let v = rot.apply(&Vec3d::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(v.y, 1.0, epsilon = 1e-14);
        let composed = rot * rot;
        let w = composed.apply(&Vec3d::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(w.x, -1.0, epsilon = 1e-14);
    }

    #[test]
    fn angle_is_zero_for_parallel_vectors() {
        let a = Vec3d::new(3.0, -1.0, 2.0);
        assert_eq!(a.angle_to(&(a * 5.0)), 0.0);
    }
}
