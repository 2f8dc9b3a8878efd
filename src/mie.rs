//! Partial-wave coefficients of a homogeneous sphere.
//!
//! The field outside a sphere illuminated by a plane wave expands as
//! `sum_l [(2l+1) i^l j_l(kr) + S_l h_l(kr)] P_l(cos theta)` and the field
//! inside as `sum_l T_l j_l(nkr) P_l(cos theta)`. Matching the field and its
//! radial derivative at `r = a` yields the scattered coefficients `S_l` and the
//! internal coefficients `T_l` computed here.
//!
//! # Limitations
//!
//! The shared denominator can approach zero at resonances. No guard is
//! applied; the coefficients simply lose precision there.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::config;
use crate::special::{self, Shift};
use crate::sphere::Sphere;


/// Scattered and internal partial-wave coefficients of one sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct MieCoefficients {
    scattered: Vec<Complex64>,
    internal: Vec<Complex64>,
}

impl MieCoefficients {
    /// Computes the coefficients for orders `0..=order` of a sphere of radius
    /// `radius` and relative index `n` at wavenumber `k`.
    ///
    /// With `x = ka` and `m = kna`, and the shared denominator
    /// `D_l = j_l(m) h_l'(x) - h_l(x) j_l'(m) n`:
    /// - scattered `S_l = (2l+1) i^l (j_l(x) j_l'(m) n - j_l(m) j_l'(x)) / D_l`
    /// - internal `T_l = (2l+1) i^l (j_l(x) h_l'(x) - j_l'(x) h_l(x)) / D_l`
    pub fn new(order: usize, k: f64, radius: f64, n: Complex64) -> Self {
        let ka = k * radius;
        let kna = n * ka;

        let j_ka = special::sph_bessel_j(order, ka, Shift::None);
        let dj_ka = special::sph_bessel_j_deriv(order, ka);
        let j_kna = special::sph_bessel_j(order, kna, Shift::None);
        let dj_kna = special::sph_bessel_j_deriv(order, kna);
        let h_ka = special::sph_hankel(order, ka, Shift::None);
        let dh_ka = special::sph_hankel_deriv(order, ka);

        let mut scattered = Vec::with_capacity(order + 1);
        let mut internal = Vec::with_capacity(order + 1);
        for l in 0..=order {
            let prefix = (2 * l + 1) as f64 * Complex64::i().powu(l as u32);
            let denominator = j_kna[l] * dh_ka[l] - h_ka[l] * dj_kna[l] * n;
            let num_scattered = j_ka[l] * dj_kna[l] * n - j_kna[l] * dj_ka[l];
            let num_internal = j_ka[l] * dh_ka[l] - dj_ka[l] * h_ka[l];
            scattered.push(prefix * num_scattered / denominator);
            internal.push(prefix * num_internal / denominator);
        }

        Self {
            scattered,
            internal,
        }
    }

    /// Computes the coefficients for a sphere, truncating the series at the
    /// order returned by [`Sphere::truncation_order`].
    pub fn for_sphere(sphere: &Sphere, wavelength: f64) -> Self {
        let order = sphere.truncation_order(wavelength);
        let k = 2.0 * PI * config::MEDIUM_REFR_INDEX / wavelength;
        Self::new(order, k, sphere.radius(), sphere.relative_index())
    }

    /// Highest partial-wave order held.
    pub fn order(&self) -> usize {
        self.scattered.len() - 1
    }

    /// Coefficients weighting `h_l(kr) P_l` outside the sphere.
    pub fn scattered(&self) -> &[Complex64] {
        &self.scattered
    }

    /// Coefficients weighting `j_l(knr) P_l` inside the sphere.
    pub fn internal(&self) -> &[Complex64] {
        &self.internal
    }
}
