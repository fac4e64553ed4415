use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

use crate::{
    canvas::Canvas,
    catalog::{Catalog, FieldBinding},
    errors::PaintError,
    profile::Profile,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SprayReport {
    pub n_halos: usize,
    /// Sum of disc sizes; a pixel covered by two halos counts twice.
    pub n_pixels_touched: usize,
}

/// One halo's profile sampled at the requested radii.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateCurve {
    pub halo: usize,
    pub points: Vec<(f64, f64)>,
}

/// Rasterizes a profile around every halo of a canvas' catalog.
#[derive(Clone)]
pub struct Painter {
    profile: Arc<dyn Profile>,
}

impl Painter {
    pub fn new<P: Profile + 'static>(profile: P) -> Painter {
        Painter {
            profile: Arc::new(profile),
        }
    }

    pub fn from_arc(profile: Arc<dyn Profile>) -> Painter {
        Painter { profile }
    }

    pub fn profile(&self) -> &dyn Profile {
        self.profile.as_ref()
    }

    fn bind(&self, catalog: &Catalog, first_halo: usize) -> Result<FieldBinding, PaintError> {
        catalog
            .bind(self.profile.fields())
            .map_err(|field| PaintError::MissingField {
                field,
                halo: first_halo,
            })
    }

    /// Disc pixels and profile values for one halo.
    fn paint_halo(
        &self,
        canvas: &Canvas,
        binding: &FieldBinding,
        halo: usize,
        args: &mut Vec<f64>,
    ) -> Result<(Vec<usize>, Vec<f64>), PaintError> {
        binding.gather(canvas.catalog(), halo, args);
        if let Some((field, &value)) = binding
            .names()
            .iter()
            .zip(args.iter())
            .find(|(_, v)| !v.is_finite())
        {
            return Err(PaintError::UndefinedField {
                field: field.clone(),
                halo,
                value,
            });
        }
        let disc = canvas.pixel_disc(halo)?;
        let values = disc.radii.iter().map(|&r| self.profile.eval(r, args)).collect();
        debug!("halo {}: {} pixels", halo, disc.len());
        Ok((disc.pixels, values))
    }

    /// Add the profile of every catalog halo into `canvas`, in catalog order.
    ///
    /// The profile's fields are checked against the catalog schema before any
    /// pixel is written. A halo with an undefined field value or distance aborts
    /// the spray and leaves the canvas untouched.
    pub fn spray(&self, canvas: &mut Canvas) -> Result<SprayReport, PaintError> {
        let n = canvas.catalog().len();
        if n == 0 {
            return Ok(SprayReport::default());
        }
        let binding = self.bind(canvas.catalog(), 0)?;
        info!("spraying {} halos at nside={}", n, canvas.pixel_index().nside());
        let mut report = SprayReport {
            n_halos: n,
            n_pixels_touched: 0,
        };
        let mut args = Vec::with_capacity(binding.names().len());
        let view: &Canvas = canvas;
        let contributions = (0..n)
            .map(|halo| self.paint_halo(view, &binding, halo, &mut args))
            .collect::<Result<Vec<_>, _>>()?;
        for (pixels, values) in &contributions {
            report.n_pixels_touched += pixels.len();
            canvas.add(pixels, values);
        }
        info!("spray done: {} pixel contributions", report.n_pixels_touched);
        Ok(report)
    }

    /// Same result as [`Painter::spray`], with halos split into `n_workers`
    /// contiguous chunks. Each worker keeps its own contribution list; the lists
    /// are added to the canvas in chunk order once every worker has finished, so
    /// the buffer matches the serial spray exactly. Nothing is written if any
    /// halo fails.
    pub fn spray_parallel(&self, canvas: &mut Canvas, n_workers: usize) -> Result<SprayReport, PaintError> {
        let n = canvas.catalog().len();
        if n == 0 {
            return Ok(SprayReport::default());
        }
        let n_workers = n_workers.max(1);
        let binding = self.bind(canvas.catalog(), 0)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .build()
            .map_err(|e| PaintError::Pool(e.to_string()))?;
        info!("spraying {} halos at nside={} on {} workers", n, canvas.pixel_index().nside(), n_workers);

        let chunk = (n + n_workers - 1) / n_workers;
        let halos: Vec<usize> = (0..n).collect();
        let view: &Canvas = canvas;
        let partials = pool.install(|| {
            halos
                .par_chunks(chunk)
                .map(|chunk| {
                    let mut args = Vec::with_capacity(binding.names().len());
                    chunk
                        .iter()
                        .map(|&halo| self.paint_halo(view, &binding, halo, &mut args))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()
        })?;

        let mut report = SprayReport {
            n_halos: n,
            n_pixels_touched: 0,
        };
        for (pixels, values) in partials.iter().flatten() {
            report.n_pixels_touched += pixels.len();
            canvas.add(pixels, values);
        }
        info!("spray done: {} pixel contributions", report.n_pixels_touched);
        Ok(report)
    }

    /// Evaluate the profile at `r_values` for each halo in `halo_list`, without
    /// any projection onto pixels.
    pub fn plot_template(
        &self,
        r_values: &[f64],
        catalog: &Catalog,
        halo_list: &[usize],
    ) -> Result<Vec<TemplateCurve>, PaintError> {
        let first = halo_list.first().copied().unwrap_or(0);
        let binding = self.bind(catalog, first)?;
        let mut args = Vec::new();
        halo_list
            .iter()
            .map(|&halo| -> Result<TemplateCurve, PaintError> {
                catalog.halo(halo)?;
                binding.gather(catalog, halo, &mut args);
                let points = r_values.iter().map(|&r| (r, self.profile.eval(r, &args))).collect();
                Ok(TemplateCurve { halo, points })
            })
            .collect()
    }
}
