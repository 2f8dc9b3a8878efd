use std::f64::consts::PI;

use nalgebra::Vector3;
use num_complex::Complex64;

use crate::config;
use crate::error::MieError;


/// A homogeneous dielectric sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    position: Vector3<f64>,
    radius: f64,
    refr_index: Complex64,
}

impl Sphere {
    /// Creates a sphere, checking that the radius is positive and the
    /// refractive index has a positive real part and non-negative imaginary part.
    pub fn new(position: Vector3<f64>, radius: f64, refr_index: Complex64) -> Result<Self, MieError> {
        if !position.iter().all(|c| c.is_finite()) {
            return Err(MieError::InvalidSphere(format!(
                "position must be finite, got {:?}",
                position
            )));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(MieError::InvalidSphere(format!(
                "radius must be positive, got {}",
                radius
            )));
        }
        if !(refr_index.re > 0.0) || !(refr_index.im >= 0.0) {
            return Err(MieError::InvalidSphere(format!(
                "refractive index must have positive real and non-negative imaginary part, got {}",
                refr_index
            )));
        }
        Ok(Self {
            position,
            radius,
            refr_index,
        })
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn refr_index(&self) -> Complex64 {
        self.refr_index
    }

    /// Refractive index relative to the surrounding medium.
    pub fn relative_index(&self) -> Complex64 {
        self.refr_index / config::MEDIUM_REFR_INDEX
    }

    /// Size parameter `2 pi a / lambda`.
    pub fn size_parameter(&self, wavelength: f64) -> f64 {
        2.0 * PI * self.radius / wavelength
    }

    /// Number of partial-wave orders needed for the Mie series to converge,
    /// `ceil(x + 4 x^(1/3) + 2)` for size parameter `x`.
    ///
    /// This is a convergence heuristic, not an error bound.
    pub fn truncation_order(&self, wavelength: f64) -> usize {
        let x = self.size_parameter(wavelength);
        (x + 4.0 * x.cbrt() + 2.0).ceil() as usize
    }

    /// Whether `point` lies strictly inside the sphere.
    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        (point - self.position).norm() < self.radius
    }
}
