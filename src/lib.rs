//! Paint radial halo profiles onto a HEALPix sky map and stack cutouts of it.
//!
//! The usual flow is [`catalog::Catalog`] → [`canvas::Canvas`] →
//! [`painter::Painter::spray`] → [`canvas::Canvas::freeze`] →
//! [`canvas::SkyMap::stack_cutouts`].

pub mod canvas;
pub mod catalog;
pub mod cfg;
pub mod coordinates;
pub mod errors;
pub mod geometry;
pub mod healpix;
pub mod painter;
pub mod profile;
pub mod stack;

pub use canvas::{Canvas, CanvasCfg, SkyMap};
pub use catalog::{Catalog, CatalogMeta, Halo, Patch};
pub use cfg::{load_catalog, load_cfg, CatalogDoc, PaintCfg};
pub use painter::{Painter, SprayReport, TemplateCurve};
pub use profile::{Profile, ProfileExt, ProfileKind};
pub use stack::{OutOfBounds, Stack, StackCfg, Statistic};
