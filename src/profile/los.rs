use log::warn;
use serde::{Deserialize, Serialize};

use super::{
    quadrature::{integrate_panels, QuadResult},
    Profile, ProfileKind,
};
use crate::errors::ProfileError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LosCfg {
    /// Line-of-sight half-length; the 3D profile must have decayed by then.
    pub l_max: f64,
    pub rel_tol: f64,
    pub abs_tol: f64,
    /// Subdivision budget per integral.
    pub max_intervals: usize,
}

impl Default for LosCfg {
    fn default() -> LosCfg {
        LosCfg {
            l_max: 20.0,
            rel_tol: 1e-8,
            abs_tol: 1e-12,
            max_intervals: 500,
        }
    }
}

impl LosCfg {
    fn validate(&self) -> Result<(), ProfileError> {
        if !(self.l_max.is_finite() && self.l_max > 0.0) {
            return Err(ProfileError::BadLos(format!("l_max must be positive, got {}", self.l_max)));
        }
        if !(self.rel_tol >= 0.0 && self.abs_tol >= 0.0) || self.rel_tol + self.abs_tol <= 0.0 {
            return Err(ProfileError::BadLos(format!(
                "tolerances must be non-negative and not both zero, got rel={} abs={}",
                self.rel_tol, self.abs_tol
            )));
        }
        if self.max_intervals == 0 {
            return Err(ProfileError::BadLos("max_intervals must be positive".to_string()));
        }
        Ok(())
    }
}

/// Octaves of initial panels between `l_max` and the line-of-sight origin.
const LOS_OCTAVES: i32 = 24;

/// Projection of a 3D profile: `g(R, a) = 2 * integral_0^l_max f(sqrt(R^2 + l^2), a) dl`.
pub struct LosIntegrated<P> {
    inner: P,
    cfg: LosCfg,
    /// `0, l_max/2^24, ..., l_max/2, l_max`: chords much shorter than `l_max`
    /// still land inside a panel of comparable width.
    edges: Vec<f64>,
}

pub fn los_integrate<P: Profile>(profile: P, cfg: LosCfg) -> Result<LosIntegrated<P>, ProfileError> {
    if profile.kind() != ProfileKind::ThreeD {
        return Err(ProfileError::NotThreeD);
    }
    cfg.validate()?;
    let edges = std::iter::once(0.0)
        .chain((0..=LOS_OCTAVES).rev().map(|k| cfg.l_max * 0.5_f64.powi(k)))
        .collect();
    Ok(LosIntegrated {
        inner: profile,
        cfg,
        edges,
    })
}

impl<P> LosIntegrated<P> {
    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn cfg(&self) -> &LosCfg {
        &self.cfg
    }
}

impl<P: Profile> LosIntegrated<P> {
    /// The one-sided integral at `r` with its error estimate; `eval` returns
    /// twice its value.
    pub fn integrate_at(&self, r: f64, args: &[f64]) -> QuadResult {
        let r2 = r * r;
        integrate_panels(
            |l| self.inner.eval((r2 + l * l).sqrt(), args),
            &self.edges,
            self.cfg.abs_tol,
            self.cfg.rel_tol,
            self.cfg.max_intervals,
        )
    }
}

impl<P: Profile> Profile for LosIntegrated<P> {
    fn kind(&self) -> ProfileKind {
        ProfileKind::Projected
    }

    fn fields(&self) -> &[String] {
        self.inner.fields()
    }

    fn eval(&self, r: f64, args: &[f64]) -> f64 {
        let res = self.integrate_at(r, args);
        if !res.converged {
            warn!(
                "line-of-sight integral did not converge at R={} args={:?}: {} +/- {} after {} intervals",
                r, args, res.value, res.abs_err, res.n_intervals
            );
        }
        2.0 * res.value
    }
}
