use std::{fs::File, io::Write, path::Path, sync::Arc};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    canvas::CanvasCfg,
    catalog::{Catalog, CatalogMeta, Cosmology},
    errors::{CatalogError, CfgError, ProfileError},
    profile::{
        templates::{gaussian_3d, tophat_2d},
        InterpCfg, LosCfg, Profile, ProfileExt,
    },
    stack::StackCfg,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileChoice {
    /// Projected top-hat of one halo radius.
    #[default]
    Tophat,
    /// 3D Gaussian, projected along the line of sight and tabulated.
    Gaussian,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockCfg {
    pub seed: u64,
    pub chi_range: (f64, f64),
    pub mass_range: (f64, f64),
    /// `(M, R)` anchoring the `R ∝ M^(1/3)` radius relation.
    pub pivot: (f64, f64),
}

impl Default for MockCfg {
    fn default() -> MockCfg {
        MockCfg {
            seed: 0,
            chi_range: (100.0, 1000.0),
            mass_range: (1e13, 1e15),
            pivot: (1e14, 1.0),
        }
    }
}

impl MockCfg {
    pub fn generate(&self, n: usize) -> Result<Catalog, CatalogError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let meta = CatalogMeta {
            source: format!("mock(seed={})", self.seed),
            cosmology: None,
        };
        Catalog::mock(meta, n, self.chi_range, self.mass_range, self.pivot, &mut rng)
    }
}

/// Everything a painting run needs, loadable from one YAML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintCfg {
    pub canvas: CanvasCfg,
    pub profile: ProfileChoice,
    /// Gaussian sigma in units of the halo radius.
    pub gaussian_width: f64,
    pub los: LosCfg,
    pub interp: InterpCfg,
    pub stack: StackCfg,
    /// Cutout extent around each halo, degrees.
    pub cutout_lon: (f64, f64),
    pub cutout_lat: (f64, f64),
    pub mock: MockCfg,
}

impl Default for PaintCfg {
    fn default() -> PaintCfg {
        PaintCfg {
            canvas: CanvasCfg::default(),
            profile: ProfileChoice::Tophat,
            gaussian_width: 0.3,
            los: LosCfg::default(),
            interp: InterpCfg::default(),
            stack: StackCfg::default(),
            cutout_lon: (-2.0, 2.0),
            cutout_lat: (-2.0, 2.0),
            mock: MockCfg::default(),
        }
    }
}

impl PaintCfg {
    pub fn build_profile(&self) -> Result<Arc<dyn Profile>, ProfileError> {
        let field = self.canvas.radius_field.as_str();
        let profile: Arc<dyn Profile> = match self.profile {
            ProfileChoice::Tophat => Arc::new(tophat_2d(field)),
            ProfileChoice::Gaussian => Arc::new(
                gaussian_3d(field, self.gaussian_width)
                    .los_integrated(self.los.clone())?
                    .interpolated(self.interp.clone())?,
            ),
        };
        Ok(profile)
    }
}

/// A catalog as a YAML document: named columns and one row of values per halo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogDoc {
    pub source: String,
    #[serde(default)]
    pub cosmology: Option<Cosmology>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl CatalogDoc {
    pub fn into_catalog(self) -> Result<Catalog, CfgError> {
        let meta = CatalogMeta {
            source: self.source,
            cosmology: self.cosmology,
        };
        Ok(Catalog::from_rows(meta, self.columns, &self.rows)?)
    }
}

fn open(path: &Path) -> Result<File, CfgError> {
    File::open(path).map_err(|source| CfgError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_cfg<P: AsRef<Path>>(path: P) -> Result<PaintCfg, CfgError> {
    Ok(serde_yaml::from_reader(open(path.as_ref())?)?)
}

/// `PaintCfg::default()` as YAML. Loading it back gives the same configuration.
pub fn write_default_cfg<W: Write>(writer: W) -> Result<(), CfgError> {
    Ok(serde_yaml::to_writer(writer, &PaintCfg::default())?)
}

pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog, CfgError> {
    let doc: CatalogDoc = serde_yaml::from_reader(open(path.as_ref())?)?;
    doc.into_catalog()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::RadiusMode,
        profile::ProfileKind,
        stack::{OutOfBounds, Statistic},
    };

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg: PaintCfg = serde_yaml::from_str(
            "canvas:\n  nside: 64\n  radius_mode: small_angle\nstack:\n  statistic: sum\n  out_of_bounds: exclude\nprofile: gaussian\n",
        )
        .unwrap();
        assert_eq!(cfg.canvas.nside, 64);
        assert_eq!(cfg.canvas.radius_mode, RadiusMode::SmallAngle);
        assert_eq!(cfg.canvas.radius_field, "R200c");
        assert_eq!(cfg.stack.statistic, Statistic::Sum);
        assert_eq!(cfg.stack.out_of_bounds, OutOfBounds::Exclude);
        assert_eq!(cfg.stack.n_lon, 41);
        assert_eq!(cfg.los, LosCfg::default());
        assert_eq!(cfg.profile, ProfileChoice::Gaussian);
    }

    #[test]
    fn default_cfg_survives_yaml() {
        let cfg = PaintCfg::default();
        let text = serde_yaml::to_string(&cfg).unwrap();
        assert_eq!(serde_yaml::from_str::<PaintCfg>(&text).unwrap(), cfg);
    }

    #[test]
    fn written_default_cfg_is_the_default() {
        let mut buf = Vec::new();
        write_default_cfg(&mut buf).unwrap();
        let cfg: PaintCfg = serde_yaml::from_slice(&buf).unwrap();
        assert_eq!(cfg, PaintCfg::default());
        assert_eq!(cfg.canvas.footprint, None);
    }

    #[test]
    fn catalog_doc_builds_a_catalog() {
        let doc: CatalogDoc = serde_yaml::from_str(
            "source: hand-made\ncosmology:\n  h: 0.7\n  omega_m: 0.3\ncolumns: [lon, lat, chi, R200c]\nrows:\n  - [10.0, 20.0, 300.0, 1.5]\n  - [200.0, -5.0, 150.0, 0.8]\n",
        )
        .unwrap();
        let cat = doc.into_catalog().unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.meta().source, "hand-made");
        assert_eq!(cat.meta().cosmology.as_ref().map(|c| c.h), Some(0.7));
        assert_eq!(cat.distance(1), 150.0);

        let bad = CatalogDoc {
            source: "bad".to_string(),
            cosmology: None,
            columns: vec!["x".to_string(), "y".to_string(), "z".to_string()],
            rows: vec![vec![1.0, 2.0]],
        };
        assert!(matches!(bad.into_catalog(), Err(CfgError::Catalog(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        match load_cfg("/nonexistent/paint.yaml") {
            Err(CfgError::Io { path, .. }) => assert_eq!(path, "/nonexistent/paint.yaml"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn profile_choice_builds_projected_profiles() {
        let mut cfg = PaintCfg::default();
        assert_eq!(cfg.build_profile().unwrap().kind(), ProfileKind::Projected);
        cfg.profile = ProfileChoice::Gaussian;
        let p = cfg.build_profile().unwrap();
        assert_eq!(p.kind(), ProfileKind::Projected);
        assert_eq!(p.fields(), ["R200c".to_string()]);
    }

    #[test]
    fn mock_is_seeded() {
        let a = MockCfg::default().generate(10).unwrap();
        let b = MockCfg::default().generate(10).unwrap();
        assert_eq!(a.data(), b.data());
        assert_eq!(a.len(), 10);
    }

    #[test]
    fn reversed_mock_range_from_yaml_is_an_error() {
        let cfg: PaintCfg = serde_yaml::from_str("mock:\n  chi_range: [1000.0, 100.0]\n").unwrap();
        assert_eq!(
            cfg.mock.generate(3).unwrap_err(),
            CatalogError::BadMockRange {
                name: "distance",
                lo: 1000.0,
                hi: 100.0
            }
        );
    }
}
