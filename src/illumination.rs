//! Focused illumination produced by a condenser with an annular aperture.
//!
//! The illumination fixes the nominal propagation direction, wavelength,
//! amplitude and the inner and outer numerical apertures of the condenser. The
//! apertures map onto the half-angles of the illumination cone through
//! `alpha = asin(NA)`.

use std::f64::consts::PI;

use nalgebra::Vector3;

use crate::config;
use crate::error::MieError;

#[cfg(test)]
mod tests {
    use super::*;

    fn down() -> Vector3<f64> {
        Vector3::new(0.0, 0.0, -1.0)
    }

    #[test]
    fn normalises_direction() {
        let illum = Illumination::new(Vector3::new(0.0, 0.0, -4.0), 8.0, 1.0, 0.0, 0.9).unwrap();
        assert!((illum.direction().norm() - 1.0).abs() < 1e-15);
        assert_eq!(illum.direction().z, -1.0);
    }

    #[test]
    fn rejects_inverted_aperture() {
        let err = Illumination::new(down(), 8.0, 1.0, 0.5, 0.5).unwrap_err();
        assert!(matches!(err, MieError::InvalidAperture { .. }));
        assert!(Illumination::new(down(), 8.0, 1.0, 0.6, 0.2).is_err());
        assert!(Illumination::new(down(), 8.0, 1.0, -0.1, 0.2).is_err());
        assert!(Illumination::new(down(), 8.0, 1.0, 0.0, 1.1).is_err());
    }

    #[test]
    fn rejects_bad_wavelength_and_direction() {
        assert!(matches!(
            Illumination::new(down(), 0.0, 1.0, 0.0, 0.9),
            Err(MieError::InvalidWavelength(_))
        ));
        assert!(Illumination::new(down(), f64::NAN, 1.0, 0.0, 0.9).is_err());
        assert!(matches!(
            Illumination::new(Vector3::zeros(), 8.0, 1.0, 0.0, 0.9),
            Err(MieError::InvalidDirection(_))
        ));
    }

    #[test]
    fn aperture_weight_is_cone_solid_angle() {
        let illum = Illumination::new(down(), 8.0, 2.0, 0.0, 1.0).unwrap();
        // full hemisphere: 2 pi E0
        assert!((illum.aperture_weight() - 4.0 * PI).abs() < 1e-12);

        let annular = Illumination::new(down(), 8.0, 1.0, 0.3, 0.6).unwrap();
        let expected = 2.0 * PI * ((0.3f64).asin().cos() - (0.6f64).asin().cos());
        assert!((annular.aperture_weight() - expected).abs() < 1e-12);
    }

    #[test]
    fn focal_point_defaults_to_origin() {
        let illum = Illumination::new(down(), 8.0, 1.0, 0.0, 0.9).unwrap();
        assert_eq!(illum.focal_point(), &Vector3::zeros());
        let moved = illum.clone().with_focal_point(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(moved.focal_point(), &Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(moved.aperture_weight(), illum.aperture_weight());
    }

    #[test]
    fn wavenumber() {
        let illum = Illumination::new(down(), 8.0, 1.0, 0.0, 0.9).unwrap();
        assert!((illum.wavenumber() - PI / 4.0).abs() < 1e-15);
    }
}

/// Focused beam parameters shared by every sphere in a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Illumination {
    direction: Vector3<f64>,
    wavelength: f64,
    amplitude: f64,
    na_in: f64,
    na_out: f64,
    focal_point: Vector3<f64>,
}

impl Illumination {
    /// Creates an illumination focused at the origin.
    ///
    /// Fails if the direction is zero or non-finite, the wavelength is not
    /// positive, or the apertures do not satisfy `0 <= na_in < na_out <= 1`.
    pub fn new(
        direction: Vector3<f64>,
        wavelength: f64,
        amplitude: f64,
        na_in: f64,
        na_out: f64,
    ) -> Result<Self, MieError> {
        let norm = direction.norm();
        if !norm.is_finite() || norm == 0.0 {
            return Err(MieError::InvalidDirection([direction.x, direction.y, direction.z]));
        }
        if !wavelength.is_finite() || wavelength <= 0.0 {
            return Err(MieError::InvalidWavelength(wavelength));
        }
        if !(0.0..=1.0).contains(&na_in) || !(0.0..=1.0).contains(&na_out) || na_in >= na_out {
            return Err(MieError::InvalidAperture { na_in, na_out });
        }

        Ok(Self {
            direction: direction / norm,
            wavelength,
            amplitude,
            na_in,
            na_out,
            focal_point: Vector3::zeros(),
        })
    }

    /// Moves the focal point of the beam.
    pub fn with_focal_point(mut self, focal_point: Vector3<f64>) -> Self {
        self.focal_point = focal_point;
        self
    }

    /// Unit vector of the nominal propagation direction.
    pub fn direction(&self) -> &Vector3<f64> {
        &self.direction
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn na_in(&self) -> f64 {
        self.na_in
    }

    pub fn na_out(&self) -> f64 {
        self.na_out
    }

    pub fn focal_point(&self) -> &Vector3<f64> {
        &self.focal_point
    }

    /// Magnitude of the wave vector in the surrounding medium.
    pub fn wavenumber(&self) -> f64 {
        2.0 * PI * config::MEDIUM_REFR_INDEX / self.wavelength
    }

    /// Inner half-angle of the illumination cone.
    pub fn alpha_in(&self) -> f64 {
        self.na_in.asin()
    }

    /// Outer half-angle of the illumination cone.
    pub fn alpha_out(&self) -> f64 {
        self.na_out.asin()
    }

    /// Solid-angle normalisation of the Monte Carlo plane-wave sum,
    /// `2 pi E0 [(1 - cos alpha_out) - (1 - cos alpha_in)]`.
    pub fn aperture_weight(&self) -> f64 {
        2.0 * PI
            * self.amplitude
            * ((1.0 - self.alpha_out().cos()) - (1.0 - self.alpha_in().cos()))
    }
}
