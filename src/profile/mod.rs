//! Radial profiles and the combinators that transform them.
//!
//! A profile names the halo fields it needs once, at construction. The painter
//! resolves those names against the catalog schema before any evaluation and
//! then passes the values positionally, in declaration order, to [`Profile::eval`].

pub mod interp;
pub mod los;
pub mod quadrature;
pub mod templates;

use std::sync::Arc;

pub use interp::{interpolate, InterpCfg, InterpMethod, Interpolated, OutOfRange, Spacing};
pub use los::{los_integrate, LosCfg, LosIntegrated};

use crate::errors::ProfileError;

/// Domain of a profile's radius argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileKind {
    /// 3D radius from the halo center.
    ThreeD,
    /// Transverse radius in the plane of the sky.
    Projected,
}

pub trait Profile: Send + Sync {
    fn kind(&self) -> ProfileKind;

    /// Halo fields this profile reads, in the order `eval` receives them.
    fn fields(&self) -> &[String];

    fn eval(&self, r: f64, args: &[f64]) -> f64;
}

impl<P: Profile + ?Sized> Profile for Arc<P> {
    fn kind(&self) -> ProfileKind {
        (**self).kind()
    }

    fn fields(&self) -> &[String] {
        (**self).fields()
    }

    fn eval(&self, r: f64, args: &[f64]) -> f64 {
        (**self).eval(r, args)
    }
}

impl<P: Profile + ?Sized> Profile for Box<P> {
    fn kind(&self) -> ProfileKind {
        (**self).kind()
    }

    fn fields(&self) -> &[String] {
        (**self).fields()
    }

    fn eval(&self, r: f64, args: &[f64]) -> f64 {
        (**self).eval(r, args)
    }
}

/// A profile backed by a closure.
pub struct FnProfile<F> {
    kind: ProfileKind,
    fields: Vec<String>,
    f: F,
}

impl<F> FnProfile<F>
where
    F: Fn(f64, &[f64]) -> f64 + Send + Sync,
{
    pub fn new(kind: ProfileKind, fields: &[&str], f: F) -> FnProfile<F> {
        FnProfile {
            kind,
            fields: fields.iter().map(|s| s.to_string()).collect(),
            f,
        }
    }
}

impl<F> Profile for FnProfile<F>
where
    F: Fn(f64, &[f64]) -> f64 + Send + Sync,
{
    fn kind(&self) -> ProfileKind {
        self.kind
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn eval(&self, r: f64, args: &[f64]) -> f64 {
        (self.f)(r, args)
    }
}

pub fn profile_3d<F>(fields: &[&str], f: F) -> FnProfile<F>
where
    F: Fn(f64, &[f64]) -> f64 + Send + Sync,
{
    FnProfile::new(ProfileKind::ThreeD, fields, f)
}

pub fn profile_2d<F>(fields: &[&str], f: F) -> FnProfile<F>
where
    F: Fn(f64, &[f64]) -> f64 + Send + Sync,
{
    FnProfile::new(ProfileKind::Projected, fields, f)
}

/// Method-call spelling of the combinators, for chaining.
pub trait ProfileExt: Profile + Sized {
    fn los_integrated(self, cfg: LosCfg) -> Result<LosIntegrated<Self>, ProfileError> {
        los_integrate(self, cfg)
    }

    fn interpolated(self, cfg: InterpCfg) -> Result<Interpolated<Self>, ProfileError> {
        interpolate(self, cfg)
    }
}

impl<P: Profile> ProfileExt for P {}
