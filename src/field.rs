//! Field maps of a focused beam scattered by a single sphere.
//!
//! Three complex fields are evaluated on the observation grid:
//! - the focused incident field `Ef`, as a closed partial-wave expansion about
//!   the focal point
//! - the scattered field `Es`, summed over the sampled plane waves with the
//!   scattered Mie coefficients and spherical Hankel functions
//! - the internal field `Ei`, summed over the same plane waves with the internal
//!   Mie coefficients and spherical Bessel functions at `k n r`
//!
//! The total field is `Ei` inside the sphere and `Es + Ef` outside it.

use std::time::Instant;

use nalgebra::Vector3;
use ndarray::{s, Array1, Array2, Zip};
use num_complex::Complex64;
use tracing::debug;

use crate::beam::PlaneWaveSet;
use crate::config;
use crate::error::MieError;
use crate::grid::Grid;
use crate::illumination::Illumination;
use crate::mie::MieCoefficients;
use crate::special::{self, Shift};
use crate::sphere::Sphere;


/// Field maps of one sphere on an observation grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereField {
    total: Array2<Complex64>,
    mask: Array2<f64>,
    focused: Array2<Complex64>,
}

impl SphereField {
    /// Total field, internal inside the sphere and scattered plus focused outside.
    pub fn total(&self) -> &Array2<Complex64> {
        &self.total
    }

    /// 1 outside the sphere, 0 inside.
    pub fn mask(&self) -> &Array2<f64> {
        &self.mask
    }

    /// Focused incident field, independent of the sphere.
    pub fn focused(&self) -> &Array2<Complex64> {
        &self.focused
    }
}

/// Computes the total field, mask and focused field of one sphere.
///
/// **Context**: Every sphere of a scene must be evaluated with the same
/// [`PlaneWaveSet`] for the per-sphere fields to be superposable.
///
/// **How it Works**: Builds the focused field about the illumination focal
/// point, then delegates to [`evaluate_with_focused`].
pub fn evaluate(
    grid: &Grid,
    sphere: &Sphere,
    illumination: &Illumination,
    waves: &PlaneWaveSet,
    coeffs: &MieCoefficients,
) -> Result<SphereField, MieError> {
    let focused = focused_field(grid, illumination);
    evaluate_with_focused(grid, sphere, illumination, waves, coeffs, &focused)
}

/// Like [`evaluate`], but reuses a precomputed focused field.
///
/// The focused field depends only on the grid and illumination, so a scene
/// computes it once and shares it between spheres.
pub fn evaluate_with_focused(
    grid: &Grid,
    sphere: &Sphere,
    illumination: &Illumination,
    waves: &PlaneWaveSet,
    coeffs: &MieCoefficients,
    focused: &Array2<Complex64>,
) -> Result<SphereField, MieError> {
    grid.check_shape(focused.dim())?;
    if waves.is_empty() {
        return Err(MieError::EmptyPlaneWaves);
    }

    let start = Instant::now();
    let (scattered, internal) = scattered_and_internal(grid, sphere, illumination, waves, coeffs);
    let mask = sphere_mask(grid, sphere);
    let total = combine(&scattered, &internal, focused, &mask);
    debug!(
        radius = sphere.radius(),
        order = coeffs.order(),
        waves = waves.len(),
        elapsed = ?start.elapsed(),
        "evaluated sphere field"
    );

    Ok(SphereField {
        total,
        mask,
        focused: focused.to_owned(),
    })
}

/// Weights `c_l` of the focused field `Ef = sum_l c_l j_l(kr) P_l(cos theta)`.
///
/// `c_l = 2 pi E0 i^l w_l` with
/// `w_l = P_{l+1}(cos a_in) - P_{l+1}(cos a_out) - P_m(cos a_in) + P_m(cos a_out)`
/// where `m = 0` for orders 0 and 1 and `m = l - 1` otherwise.
pub fn focused_weights(illumination: &Illumination) -> Array1<Complex64> {
    let order = config::FOCUSED_FIELD_ORDER;
    let p_in = special::legendre(order + 1, illumination.alpha_in().cos());
    let p_out = special::legendre(order + 1, illumination.alpha_out().cos());
    let scale = 2.0 * std::f64::consts::PI * illumination.amplitude();

    Array1::from_shape_fn(order + 1, |l| {
        let low = if l < 2 { 0 } else { l - 1 };
        let weight = p_in[l + 1] - p_out[l + 1] - p_in[low] + p_out[low];
        scale * weight * Complex64::i().powu(l as u32)
    })
}

/// Focused incident field on the grid, expanded about the focal point.
pub fn focused_field(grid: &Grid, illumination: &Illumination) -> Array2<Complex64> {
    let start = Instant::now();
    let field = focused_field_at(grid.positions(), illumination);
    debug!(elapsed = ?start.elapsed(), "evaluated focused field");
    field
}

/// Mask that is 1 where the distance from the sphere centre is at least the
/// radius and 0 inside.
pub fn sphere_mask(grid: &Grid, sphere: &Sphere) -> Array2<f64> {
    mask_at(grid.positions(), sphere)
}

/// Scattered and internal fields of a sphere, `(Es, Ei)`.
///
/// For each sampled direction `w` the contribution is
/// `exp(i k w . (p_s - p_f)) sum_l C_l R_l(r) P_l(r_hat . w)`, with `C_l R_l`
/// the scattered coefficients times `h_l(kr)` outside the sphere and the
/// internal coefficients times `j_l(knr)` inside. The sum over directions is
/// scaled by the aperture weight over the sample count. `Es` is zero inside
/// the sphere and `Ei` is zero outside.
pub fn scattered_and_internal(
    grid: &Grid,
    sphere: &Sphere,
    illumination: &Illumination,
    waves: &PlaneWaveSet,
    coeffs: &MieCoefficients,
) -> (Array2<Complex64>, Array2<Complex64>) {
    scattered_and_internal_at(grid.positions(), sphere, illumination, waves, coeffs)
}

fn focused_field_at(positions: &Array2<Vector3<f64>>, illumination: &Illumination) -> Array2<Complex64> {
    let weights = focused_weights(illumination);
    let order = config::FOCUSED_FIELD_ORDER;
    let k = illumination.wavenumber();
    let axis = illumination.direction();
    let focus = illumination.focal_point();

    positions.map(|p| {
        let rel = p - focus;
        let r = rel.norm();
        // j_l(0) vanishes for l > 0
        if r == 0.0 {
            return weights[0];
        }
        let radial = special::sph_bessel_j(order, k * r, Shift::None);
        let series = &weights * &radial;
        special::legendre_series(series.view(), rel.dot(axis) / r)
    })
}

fn mask_at(positions: &Array2<Vector3<f64>>, sphere: &Sphere) -> Array2<f64> {
    positions.map(|p| {
        if (p - sphere.position()).norm() < sphere.radius() {
            0.0
        } else {
            1.0
        }
    })
}

fn scattered_and_internal_at(
    positions: &Array2<Vector3<f64>>,
    sphere: &Sphere,
    illumination: &Illumination,
    waves: &PlaneWaveSet,
    coeffs: &MieCoefficients,
) -> (Array2<Complex64>, Array2<Complex64>) {
    let k = illumination.wavenumber();
    let n = sphere.relative_index();
    let order = coeffs.order();

    let relative = positions.map(|p| p - sphere.position());
    let distance = relative.map(|v| v.norm());

    // order-indexed radial terms, pre-weighted by the Mie coefficients
    let scattered_coeffs = Array1::from(coeffs.scattered().to_vec());
    let internal_coeffs = Array1::from(coeffs.internal().to_vec());
    let hl_kr = special::sph_hankel_array(order, &distance.mapv(|r| k * r), Shift::None) * &scattered_coeffs;
    let jl_knr =
        special::sph_bessel_j_array(order, &distance.mapv(|r| n * (k * r)), Shift::None) * &internal_coeffs;

    let offset = sphere.position() - illumination.focal_point();
    let phases: Vec<Complex64> = waves
        .directions()
        .iter()
        .map(|w| Complex64::new(0.0, k * w.dot(&offset)).exp())
        .collect();
    let scale = illumination.aperture_weight() / waves.len() as f64;

    let mut scattered = Array2::zeros(positions.dim());
    let mut internal = Array2::zeros(positions.dim());
    for ((i, j), rel) in relative.indexed_iter() {
        let r = distance[[i, j]];
        let (series, target) = if r >= sphere.radius() {
            (hl_kr.slice(s![i, j, ..]), &mut scattered)
        } else {
            (jl_knr.slice(s![i, j, ..]), &mut internal)
        };
        let r_hat = rel / r;
        let sum: Complex64 = waves
            .directions()
            .iter()
            .zip(phases.iter())
            .map(|(w, phase)| *phase * special::legendre_series(series, r_hat.dot(w)))
            .sum();
        target[[i, j]] = sum * scale;
    }

    (scattered, internal)
}

fn combine(
    scattered: &Array2<Complex64>,
    internal: &Array2<Complex64>,
    focused: &Array2<Complex64>,
    mask: &Array2<f64>,
) -> Array2<Complex64> {
    Zip::from(scattered)
        .and(internal)
        .and(focused)
        .and(mask)
        .map_collect(|&es, &ei, &ef, &m| if m == 0.0 { ei } else { es + ef })
}
