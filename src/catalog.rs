use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    coordinates::{SphCoord, Vec3d},
    errors::CatalogError,
};

/// Cosmological parameters the catalog was produced with. Carried along, never interpreted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cosmology {
    pub h: f64,
    pub omega_m: f64,
    #[serde(default)]
    pub omega_b: Option<f64>,
    #[serde(default)]
    pub sigma8: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogMeta {
    pub source: String,
    #[serde(default)]
    pub cosmology: Option<Cosmology>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PositionColumns {
    /// x, y, z comoving coordinates with the observer at the origin.
    Cartesian([usize; 3]),
    /// lon, lat in degrees and comoving distance chi.
    Spherical([usize; 3]),
}

/// Ordered halo records sharing one schema of named numeric columns.
#[derive(Clone, Debug)]
pub struct Catalog {
    meta: CatalogMeta,
    columns: Vec<String>,
    data: Array2<f64>,
    position: PositionColumns,
}

impl Catalog {
    /// `data` holds one row per halo and one column per entry of `columns`.
    pub fn new(meta: CatalogMeta, columns: Vec<String>, data: Array2<f64>) -> Result<Catalog, CatalogError> {
        if data.ncols() != columns.len() {
            return Err(CatalogError::RowLength {
                row: 0,
                ncols: columns.len(),
                len: data.ncols(),
            });
        }
        let mut seen = HashSet::new();
        for c in columns.iter() {
            if !seen.insert(c.as_str()) {
                return Err(CatalogError::DuplicateColumn(c.clone()));
            }
        }
        let find = |names: [&str; 3]| -> Option<[usize; 3]> {
            let mut idx = [0; 3];
            for (slot, name) in idx.iter_mut().zip(names.iter()) {
                *slot = columns.iter().position(|c| c == name)?;
            }
            Some(idx)
        };
        let position = if let Some(idx) = find(["x", "y", "z"]) {
            PositionColumns::Cartesian(idx)
        } else if let Some(idx) = find(["lon", "lat", "chi"]) {
            PositionColumns::Spherical(idx)
        } else {
            return Err(CatalogError::NoPosition);
        };
        Ok(Catalog {
            meta,
            columns,
            data,
            position,
        })
    }

    pub fn from_rows(meta: CatalogMeta, columns: Vec<String>, rows: &[Vec<f64>]) -> Result<Catalog, CatalogError> {
        let ncols = columns.len();
        let mut data = Array2::<f64>::zeros((rows.len(), ncols));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(CatalogError::RowLength {
                    row: i,
                    ncols,
                    len: row.len(),
                });
            }
            data.row_mut(i).iter_mut().zip(row.iter()).for_each(|(d, &v)| *d = v);
        }
        Catalog::new(meta, columns, data)
    }

    /// Uniform-on-the-sphere halos between `chi_range`, log-uniform masses in
    /// `mass_range` and `R200c = r_pivot * (M200c / m_pivot)^(1/3)`.
    ///
    /// Every range needs `0 < lo <= hi`, both finite.
    pub fn mock<R: Rng>(
        meta: CatalogMeta,
        n: usize,
        chi_range: (f64, f64),
        mass_range: (f64, f64),
        (m_pivot, r_pivot): (f64, f64),
        rng: &mut R,
    ) -> Result<Catalog, CatalogError> {
        check_mock_range("distance", chi_range)?;
        check_mock_range("mass", mass_range)?;
        check_mock_range("pivot", (m_pivot, m_pivot))?;
        if !(r_pivot.is_finite() && r_pivot >= 0.0) {
            return Err(CatalogError::BadMockRange {
                name: "pivot radius",
                lo: r_pivot,
                hi: r_pivot,
            });
        }
        let columns: Vec<String> = ["x", "y", "z", "M200c", "R200c", "vx", "vy", "vz"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut data = Array2::<f64>::zeros((n, columns.len()));
        let (lm0, lm1) = (mass_range.0.ln(), mass_range.1.ln());
        for mut row in data.rows_mut() {
            let z: f64 = rng.gen_range(-1.0..=1.0);
            let phi: f64 = rng.gen_range(0.0..2.0 * std::f64::consts::PI);
            let chi = rng.gen_range(chi_range.0..=chi_range.1);
            let s = (1.0 - z * z).sqrt();
            let mass = rng.gen_range(lm0..=lm1).exp();
            row[0] = chi * s * phi.cos();
            row[1] = chi * s * phi.sin();
            row[2] = chi * z;
            row[3] = mass;
            row[4] = r_pivot * (mass / m_pivot).cbrt();
            for k in 5..8 {
                row[k] = rng.gen_range(-500.0..500.0);
            }
        }
        Ok(Catalog {
            meta,
            columns,
            data,
            position: PositionColumns::Cartesian([0, 1, 2]),
        })
    }

    pub fn meta(&self) -> &CatalogMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data(&self) -> ArrayView2<f64> {
        self.data.view()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Result<ArrayView1<f64>, CatalogError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| CatalogError::UnknownColumn(name.to_string()))?;
        Ok(self.data.column(idx))
    }

    pub fn value(&self, halo: usize, column: usize) -> f64 {
        self.data[(halo, column)]
    }

    pub fn halo(&self, index: usize) -> Result<Halo<'_>, CatalogError> {
        if index < self.len() {
            Ok(Halo {
                catalog: self,
                index,
            })
        } else {
            Err(CatalogError::HaloOutOfRange {
                index,
                len: self.len(),
            })
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Halo<'_>> {
        (0..self.len()).map(move |index| Halo {
            catalog: self,
            index,
        })
    }

    /// Comoving position with the observer at the origin.
    pub fn position(&self, halo: usize) -> Vec3d {
        let row = self.data.row(halo);
        match self.position {
            PositionColumns::Cartesian([x, y, z]) => Vec3d::new(row[x], row[y], row[z]),
            PositionColumns::Spherical([lon, lat, chi]) => {
                SphCoord::from_lonlat_deg(row[lon], row[lat]).to_vec3d() * row[chi]
            }
        }
    }

    pub fn distance(&self, halo: usize) -> f64 {
        match self.position {
            PositionColumns::Spherical([_, _, chi]) => self.data[(halo, chi)],
            PositionColumns::Cartesian(_) => self.position(halo).length(),
        }
    }

    /// Resolve `fields` against the schema. On failure returns the first missing name.
    pub fn bind(&self, fields: &[String]) -> Result<FieldBinding, String> {
        let columns = fields
            .iter()
            .map(|f| self.column_index(f).ok_or_else(|| f.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FieldBinding {
            names: fields.to_vec(),
            columns,
        })
    }

    pub fn select(&self, indices: &[usize]) -> Result<Catalog, CatalogError> {
        if let Some(&index) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(CatalogError::HaloOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(Catalog {
            meta: self.meta.clone(),
            columns: self.columns.clone(),
            data: self.data.select(Axis(0), indices),
            position: self.position,
        })
    }

    pub fn filter<F>(&self, predicate: F) -> Catalog
    where
        F: Fn(&Halo) -> bool,
    {
        let keep: Vec<usize> = self.iter().filter(|h| predicate(h)).map(|h| h.index).collect();
        Catalog {
            meta: self.meta.clone(),
            columns: self.columns.clone(),
            data: self.data.select(Axis(0), &keep),
            position: self.position,
        }
    }

    /// Halos whose `column` is at least `min`, e.g. a mass threshold.
    pub fn filter_min(&self, column: &str, min: f64) -> Result<Catalog, CatalogError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| CatalogError::UnknownColumn(column.to_string()))?;
        Ok(self.filter(|h| h.catalog.value(h.index, idx) >= min))
    }

    /// Halos inside a lon/lat box in degrees. `lon_range.0 > lon_range.1` wraps through 0.
    pub fn filter_box(&self, lon_range: (f64, f64), lat_range: (f64, f64)) -> Catalog {
        let patch = Patch {
            lon_range,
            lat_range,
        };
        self.filter(|h| {
            let (lon, lat) = h.lon_lat();
            patch.contains(lon, lat)
        })
    }
}

/// A lon/lat box in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub lon_range: (f64, f64),
    pub lat_range: (f64, f64),
}

impl Patch {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let lon = lon.rem_euclid(360.0);
        let (l0, l1) = (self.lon_range.0.rem_euclid(360.0), self.lon_range.1.rem_euclid(360.0));
        let full_circle = self.lon_range.1 - self.lon_range.0 >= 360.0;
        let in_lon = full_circle
            || if l0 <= l1 {
                lon >= l0 && lon <= l1
            } else {
                lon >= l0 || lon <= l1
            };
        in_lon && lat >= self.lat_range.0 && lat <= self.lat_range.1
    }
}

/// One row of a [`Catalog`].
#[derive(Clone, Copy, Debug)]
pub struct Halo<'a> {
    catalog: &'a Catalog,
    index: usize,
}

impl<'a> Halo<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.catalog
            .column_index(name)
            .map(|c| self.catalog.value(self.index, c))
    }

    pub fn position(&self) -> Vec3d {
        self.catalog.position(self.index)
    }

    pub fn distance(&self) -> f64 {
        self.catalog.distance(self.index)
    }

    /// Sky direction as (lon, lat) in degrees.
    pub fn lon_lat(&self) -> (f64, f64) {
        let s = self.position().to_sph_coord();
        (s.lon_deg(), s.lat_deg())
    }
}

/// Column indices for a fixed list of field names, resolved once per catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldBinding {
    names: Vec<String>,
    columns: Vec<usize>,
}

impl FieldBinding {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Overwrite `out` with this halo's values in binding order.
    pub fn gather(&self, catalog: &Catalog, halo: usize, out: &mut Vec<f64>) {
        out.clear();
        out.extend(self.columns.iter().map(|&c| catalog.value(halo, c)));
    }
}

fn check_mock_range(name: &'static str, (lo, hi): (f64, f64)) -> Result<(), CatalogError> {
    if lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi {
        Ok(())
    } else {
        Err(CatalogError::BadMockRange { name, lo, hi })
    }
}
