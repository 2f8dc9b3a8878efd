//! Scenes of several spheres sharing one focused beam.
//!
//! Each sphere is evaluated independently against the same grid, illumination
//! and [`PlaneWaveSet`], and the per-sphere total fields are summed
//! elementwise. Spheres are assumed not to overlap; no further masking is
//! applied to the composed field.

use std::time::Instant;

use indicatif::ProgressBar;
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::info;

use crate::beam::PlaneWaveSet;
use crate::error::MieError;
use crate::field::{self, SphereField};
use crate::grid::Grid;
use crate::illumination::Illumination;
use crate::mie::MieCoefficients;
use crate::sphere::Sphere;


/// Sums field maps defined over a shared grid.
///
/// Fails on an empty input or when the shapes differ.
pub fn compose<'a, I>(fields: I) -> Result<Array2<Complex64>, MieError>
where
    I: IntoIterator<Item = ArrayView2<'a, Complex64>>,
{
    let mut fields = fields.into_iter();
    let mut total = fields.next().ok_or(MieError::EmptyScene)?.to_owned();
    for field in fields {
        if field.dim() != total.dim() {
            return Err(MieError::ShapeMismatch {
                expected: total.dim(),
                found: field.dim(),
            });
        }
        total += &field;
    }
    Ok(total)
}

/// A collection of spheres illuminated together.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    spheres: Vec<Sphere>,
}

/// Per-sphere fields and their composition.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneField {
    spheres: Vec<SphereField>,
    total: Array2<Complex64>,
    focused: Array2<Complex64>,
}

impl SceneField {
    /// Fields of each sphere, in scene order.
    pub fn spheres(&self) -> &[SphereField] {
        &self.spheres
    }

    /// Elementwise sum of the per-sphere total fields.
    pub fn total(&self) -> &Array2<Complex64> {
        &self.total
    }

    /// Focused incident field shared by every sphere.
    pub fn focused(&self) -> &Array2<Complex64> {
        &self.focused
    }
}

impl Scene {
    pub fn new(spheres: Vec<Sphere>) -> Result<Self, MieError> {
        if spheres.is_empty() {
            return Err(MieError::EmptyScene);
        }
        Ok(Self { spheres })
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    /// Evaluates every sphere against one beam realisation and composes the result.
    pub fn render(
        &self,
        grid: &Grid,
        illumination: &Illumination,
        waves: &PlaneWaveSet,
    ) -> Result<SceneField, MieError> {
        self.render_with_progress(grid, illumination, waves, &ProgressBar::hidden())
    }

    /// Like [`Scene::render`], ticking `progress` once per sphere.
    ///
    /// **Context**: Spheres are independent given the shared plane-wave set,
    /// so they are evaluated in parallel.
    ///
    /// **How it Works**: The focused field is computed once. Each sphere gets
    /// its own Mie coefficients and is evaluated on the rayon pool. The fields
    /// are collected in scene order and summed sequentially, so the composed
    /// field does not depend on thread scheduling.
    pub fn render_with_progress(
        &self,
        grid: &Grid,
        illumination: &Illumination,
        waves: &PlaneWaveSet,
        progress: &ProgressBar,
    ) -> Result<SceneField, MieError> {
        let start = Instant::now();
        let focused = field::focused_field(grid, illumination);

        let spheres = self
            .spheres
            .par_iter()
            .map(|sphere| {
                let coeffs = MieCoefficients::for_sphere(sphere, illumination.wavelength());
                let result =
                    field::evaluate_with_focused(grid, sphere, illumination, waves, &coeffs, &focused);
                progress.inc(1);
                result
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total = compose(spheres.iter().map(|s| s.total().view()))?;
        info!(
            spheres = spheres.len(),
            elapsed = ?start.elapsed(),
            "rendered scene"
        );

        Ok(SceneField {
            spheres,
            total,
            focused,
        })
    }
}
