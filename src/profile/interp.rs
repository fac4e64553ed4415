use std::{collections::HashMap, sync::Arc};

use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{Profile, ProfileKind};
use crate::errors::ProfileError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    /// Uniform in ln(r); interpolation runs in ln(r) as well.
    #[default]
    Log,
    Linear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpMethod {
    #[default]
    Linear,
    /// Natural cubic spline.
    CubicSpline,
}

/// What a table answers for radii outside `[r_min, r_max]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRange {
    /// The value at the nearest sampled end point.
    #[default]
    Clamp,
    Zero,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpCfg {
    pub r_min: f64,
    pub r_max: f64,
    pub n_samples: usize,
    pub spacing: Spacing,
    pub method: InterpMethod,
    pub out_of_range: OutOfRange,
}

impl Default for InterpCfg {
    fn default() -> InterpCfg {
        InterpCfg {
            r_min: 1e-3,
            r_max: 10.0,
            n_samples: 256,
            spacing: Spacing::Log,
            method: InterpMethod::Linear,
            out_of_range: OutOfRange::Clamp,
        }
    }
}

impl InterpCfg {
    fn validate(&self) -> Result<(), ProfileError> {
        if self.n_samples < 2 {
            return Err(ProfileError::TooFewSamples(self.n_samples));
        }
        let ok = self.r_min.is_finite()
            && self.r_max.is_finite()
            && self.r_min < self.r_max
            && (self.spacing == Spacing::Linear || self.r_min > 0.0);
        if !ok {
            return Err(ProfileError::BadRange {
                r_min: self.r_min,
                r_max: self.r_max,
                spacing: match self.spacing {
                    Spacing::Log => "log",
                    Spacing::Linear => "linear",
                },
            });
        }
        Ok(())
    }

    fn to_grid(&self, r: f64) -> f64 {
        match self.spacing {
            Spacing::Log => r.ln(),
            Spacing::Linear => r,
        }
    }

    fn from_grid(&self, t: f64) -> f64 {
        match self.spacing {
            Spacing::Log => t.exp(),
            Spacing::Linear => t,
        }
    }
}

/// Samples of one profile curve on a uniform grid in the spacing coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct InterpTable {
    t0: f64,
    dt: f64,
    y: Vec<f64>,
    /// Spline second derivatives; empty for linear interpolation.
    m: Vec<f64>,
}

impl InterpTable {
    pub fn build<F: Fn(f64) -> f64>(cfg: &InterpCfg, f: F) -> InterpTable {
        let n = cfg.n_samples;
        let t0 = cfg.to_grid(cfg.r_min);
        let t1 = cfg.to_grid(cfg.r_max);
        let dt = (t1 - t0) / (n - 1) as f64;
        let y: Vec<f64> = (0..n)
            .map(|i| {
                let r = if i == 0 {
                    cfg.r_min
                } else if i == n - 1 {
                    cfg.r_max
                } else {
                    cfg.from_grid(t0 + i as f64 * dt)
                };
                f(r)
            })
            .collect();
        let m = match cfg.method {
            InterpMethod::Linear => Vec::new(),
            InterpMethod::CubicSpline => natural_spline(&y, dt),
        };
        InterpTable { t0, dt, y, m }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn eval(&self, cfg: &InterpCfg, r: f64) -> f64 {
        let n = self.y.len();
        if !(r >= cfg.r_min) {
            return match cfg.out_of_range {
                OutOfRange::Clamp => self.y[0],
                OutOfRange::Zero => 0.0,
            };
        }
        if r > cfg.r_max {
            return match cfg.out_of_range {
                OutOfRange::Clamp => self.y[n - 1],
                OutOfRange::Zero => 0.0,
            };
        }
        let u = ((cfg.to_grid(r) - self.t0) / self.dt).max(0.0);
        let i = (u.floor() as usize).min(n - 2);
        let b = (u - i as f64).clamp(0.0, 1.0);
        let a = 1.0 - b;
        let linear = a * self.y[i] + b * self.y[i + 1];
        if self.m.is_empty() {
            linear
        } else {
            linear + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * self.dt * self.dt / 6.0
        }
    }
}

/// Second derivatives of the natural cubic spline through `y` on a uniform grid.
fn natural_spline(y: &[f64], h: f64) -> Vec<f64> {
    let n = y.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    // M[i-1] + 4 M[i] + M[i+1] = 6 (y[i+1] - 2 y[i] + y[i-1]) / h^2, Thomas algorithm
    let k = n - 2;
    let mut c = vec![0.0; k];
    let mut d = vec![0.0; k];
    for j in 0..k {
        let i = j + 1;
        let rhs = 6.0 * (y[i + 1] - 2.0 * y[i] + y[i - 1]) / (h * h);
        if j == 0 {
            c[j] = 1.0 / 4.0;
            d[j] = rhs / 4.0;
        } else {
            let denom = 4.0 - c[j - 1];
            c[j] = 1.0 / denom;
            d[j] = (rhs - d[j - 1]) / denom;
        }
    }
    m[k] = d[k - 1];
    for j in (0..k - 1).rev() {
        m[j + 1] = d[j] - c[j] * m[j + 2];
    }
    m
}

fn args_key(args: &[f64]) -> Vec<u64> {
    // +0.0 and -0.0 share a table
    args.iter().map(|&a| if a == 0.0 { 0 } else { a.to_bits() }).collect()
}

/// A profile answered from lazily built lookup tables, one per distinct argument tuple.
pub struct Interpolated<P> {
    inner: P,
    cfg: InterpCfg,
    tables: RwLock<HashMap<Vec<u64>, Arc<InterpTable>>>,
}

pub fn interpolate<P: Profile>(profile: P, cfg: InterpCfg) -> Result<Interpolated<P>, ProfileError> {
    cfg.validate()?;
    Ok(Interpolated {
        inner: profile,
        cfg,
        tables: RwLock::new(HashMap::new()),
    })
}

impl<P: Profile> Interpolated<P> {
    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn cfg(&self) -> &InterpCfg {
        &self.cfg
    }

    /// Number of argument tuples sampled so far.
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    pub fn table(&self, args: &[f64]) -> Arc<InterpTable> {
        let key = args_key(args);
        if let Some(t) = self.tables.read().get(&key) {
            return t.clone();
        }
        // built outside the lock; a concurrent builder of the same key produces an identical table
        debug!("sampling profile at {} radii for args {:?}", self.cfg.n_samples, args);
        let table = Arc::new(InterpTable::build(&self.cfg, |r| self.inner.eval(r, args)));
        self.tables.write().entry(key).or_insert(table).clone()
    }
}

impl<P: Profile> Profile for Interpolated<P> {
    fn kind(&self) -> ProfileKind {
        self.inner.kind()
    }

    fn fields(&self) -> &[String] {
        self.inner.fields()
    }

    fn eval(&self, r: f64, args: &[f64]) -> f64 {
        self.table(args).eval(&self.cfg, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{los_integrate, profile_2d, profile_3d, LosCfg};
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn smooth(r: f64, a: &[f64]) -> f64 {
        (-r * r / (2.0 * a[0] * a[0])).exp() / (1.0 + r)
    }

    fn max_error(cfg: &InterpCfg, held_out: &[f64]) -> f64 {
        let p = interpolate(profile_2d(&["s"], smooth), cfg.clone()).unwrap();
        held_out
            .iter()
            .map(|&r| (p.eval(r, &[0.8]) - smooth(r, &[0.8])).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn error_shrinks_with_sample_count() {
        let mut rng = StdRng::seed_from_u64(42);
        let held_out: Vec<f64> = (0..300).map(|_| rng.gen_range(0.01..4.0)).collect();
        for method in [InterpMethod::Linear, InterpMethod::CubicSpline] {
            for spacing in [Spacing::Log, Spacing::Linear] {
                let errors: Vec<f64> = [10, 20, 40, 80, 160]
                    .iter()
                    .map(|&n| {
                        let cfg = InterpCfg {
                            r_min: 0.01,
                            r_max: 4.0,
                            n_samples: n,
                            spacing,
                            method,
                            out_of_range: OutOfRange::Clamp,
                        };
                        max_error(&cfg, &held_out)
                    })
                    .collect();
                assert!(errors.windows(2).all(|w| w[1] < w[0]), "{:?} {:?} {:?}", method, spacing, errors);
                assert!(errors[4] < 1e-3);
            }
        }
    }

    #[test]
    fn sample_points_are_reproduced() {
        let cfg = InterpCfg {
            r_min: 0.1,
            r_max: 10.0,
            n_samples: 3,
            ..InterpCfg::default()
        };
        let p = interpolate(profile_2d(&[], |r, _| r * r), cfg).unwrap();
        assert_abs_diff_eq!(p.eval(0.1, &[]), 0.01, epsilon = 1e-14);
        assert_abs_diff_eq!(p.eval(1.0, &[]), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.eval(10.0, &[]), 100.0, epsilon = 1e-12);
    }

    #[test]
    fn out_of_range_policies() {
        let mut cfg = InterpCfg {
            r_min: 1.0,
            r_max: 2.0,
            n_samples: 5,
            spacing: Spacing::Linear,
            ..InterpCfg::default()
        };
        let p = interpolate(profile_2d(&[], |r, _| r), cfg.clone()).unwrap();
        assert_eq!(p.eval(0.0, &[]), 1.0);
        assert_eq!(p.eval(5.0, &[]), 2.0);
        assert_eq!(p.eval(f64::NAN, &[]), 1.0);
        cfg.out_of_range = OutOfRange::Zero;
        let p = interpolate(profile_2d(&[], |r, _| r), cfg).unwrap();
        assert_eq!(p.eval(0.5, &[]), 0.0);
        assert_eq!(p.eval(2.5, &[]), 0.0);
        assert_abs_diff_eq!(p.eval(1.5, &[]), 1.5, epsilon = 1e-14);
    }

    #[test]
    fn rejects_bad_cfg() {
        let p = || profile_2d(&[], |r, _| r);
        let log_from_zero = InterpCfg {
            r_min: 0.0,
            ..InterpCfg::default()
        };
        assert!(matches!(interpolate(p(), log_from_zero), Err(ProfileError::BadRange { .. })));
        let one_sample = InterpCfg {
            n_samples: 1,
            ..InterpCfg::default()
        };
        assert_eq!(interpolate(p(), one_sample).err(), Some(ProfileError::TooFewSamples(1)));
    }

    #[test]
    fn one_table_per_argument_tuple() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let f = profile_2d(&["a"], move |r, a| {
            counter.fetch_add(1, Ordering::Relaxed);
            r * a[0]
        });
        let p = interpolate(f, InterpCfg::default()).unwrap();
        p.eval(1.0, &[2.0]);
        assert_eq!(calls.load(Ordering::Relaxed), 256);
        for i in 0..100 {
            p.eval(0.05 * i as f64, &[2.0]);
        }
        assert_eq!(calls.load(Ordering::Relaxed), 256);
        p.eval(1.0, &[3.0]);
        p.eval(1.0, &[-0.0]);
        p.eval(1.0, &[0.0]);
        assert_eq!(p.table_count(), 3);
        assert_eq!(calls.load(Ordering::Relaxed), 3 * 256);
    }

    #[test]
    fn interpolated_projection_integrates_only_while_sampling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let f = profile_3d(&["R0"], move |r, a| {
            counter.fetch_add(1, Ordering::Relaxed);
            (-r * r / (a[0] * a[0])).exp()
        });
        let cfg = InterpCfg {
            r_min: 0.01,
            r_max: 5.0,
            n_samples: 256,
            ..InterpCfg::default()
        };
        let p = interpolate(los_integrate(f, LosCfg::default()).unwrap(), cfg).unwrap();
        assert_eq!(p.kind(), ProfileKind::Projected);
        let first = p.eval(0.5, &[1.0]);
        let after_build = calls.load(Ordering::Relaxed);
        assert!(after_build > 256);
        let again: f64 = (0..500).map(|i| p.eval(0.01 * i as f64, &[1.0])).sum();
        assert!(again.is_finite());
        assert_eq!(calls.load(Ordering::Relaxed), after_build);
        let exact = std::f64::consts::PI.sqrt() * (-0.25_f64).exp();
        assert_abs_diff_eq!(first, exact, epsilon = 1e-3);
    }
}
