use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HealpixError {
    #[error("nside must be positive, got {0}")]
    InvalidNside(usize),

    #[error("{0} is not a valid HEALPix pixel count")]
    InvalidNpix(usize),

    #[error("pixel {pixel} out of range for npix={npix}")]
    PixelOutOfRange { pixel: usize, npix: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("catalog has {ncols} columns but row {row} has {len} values")]
    RowLength { row: usize, ncols: usize, len: usize },

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("catalog has no position columns (need x,y,z or lon,lat,chi)")]
    NoPosition,

    #[error("halo index {index} out of range for a catalog of {len} halos")]
    HaloOutOfRange { index: usize, len: usize },

    #[error("mock {name} range [{lo}, {hi}] must be positive, finite and ordered")]
    BadMockRange { name: &'static str, lo: f64, hi: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("halo {halo}: comoving distance {distance} is not positive and finite")]
    BadDistance { halo: usize, distance: f64 },

    #[error("halo {halo}: radius {radius} is not a non-negative finite number")]
    BadRadius { halo: usize, radius: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("line-of-sight integration needs a 3D profile")]
    NotThreeD,

    #[error("invalid interpolation range [{r_min}, {r_max}] for {spacing} spacing")]
    BadRange {
        r_min: f64,
        r_max: f64,
        spacing: &'static str,
    },

    #[error("need at least 2 interpolation samples, got {0}")]
    TooFewSamples(usize),

    #[error("invalid line-of-sight configuration: {0}")]
    BadLos(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaintError {
    #[error("profile needs field '{field}' which is missing from the catalog (first affected halo: {halo})")]
    MissingField { field: String, halo: usize },

    #[error("halo {halo}: field '{field}' has undefined value {value}")]
    UndefinedField { field: String, halo: usize, value: f64 },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StackError {
    #[error("cutout grid must have at least one cell per axis, got {n_lon}x{n_lat}")]
    EmptyGrid { n_lon: usize, n_lat: usize },

    #[error("cutout range [{0}, {1}] is empty or not finite")]
    BadRange(f64, f64),

    #[error("no halos to stack")]
    NoHalos,

    #[error("worker count must be positive")]
    NoWorkers,

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

#[derive(Error, Debug)]
pub enum CfgError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
