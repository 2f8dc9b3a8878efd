//! Monte Carlo sampling of the plane waves that make up a focused beam.
//!
//! A focused beam is approximated by a finite set of plane waves whose
//! directions are drawn uniformly over the solid angle of the illumination
//! cone. Uniform solid-angle density requires sampling uniformly in the cosine
//! of the polar angle rather than in the angle itself.
//!
//! The same [`PlaneWaveSet`] must be shared by every sphere in a scene so that
//! the per-sphere fields are built from one realisation of the beam and can be
//! superposed.

use std::f64::consts::PI;
use std::time::Instant;

use nalgebra::{Unit, UnitQuaternion, Vector3};
use num_complex::Complex64;
use rand::Rng;
use tracing::debug;

use crate::config;
use crate::error::MieError;
use crate::illumination::Illumination;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn illumination(direction: Vector3<f64>) -> Illumination {
        Illumination::new(direction, 8.0, 1.0, 0.0, 0.9).unwrap()
    }

    #[test]
    fn samples_lie_inside_cone() {
        let illum = illumination(Vector3::new(0.0, 0.0, -1.0));
        let n = Complex64::new(1.3, 2.58604e-4);
        let mut rng = StdRng::seed_from_u64(7);
        let waves = PlaneWaveSet::sample(&illum, n, 500, &mut rng).unwrap();
        assert_eq!(waves.len(), 500);

        let cos_max = (0.9f64 / 1.3).asin().cos();
        for k in waves.directions() {
            assert!((k.norm() - 1.0).abs() < 1e-12);
            let cos_theta = k.dot(illum.direction());
            assert!(cos_theta >= cos_max - 1e-12, "cos_theta = {}", cos_theta);
        }
    }

    #[test]
    fn uniform_in_cosine() {
        let illum = illumination(Vector3::new(0.0, 0.0, 1.0));
        let mut rng = StdRng::seed_from_u64(11);
        let waves = PlaneWaveSet::sample(&illum, Complex64::new(1.0, 0.0), 20_000, &mut rng).unwrap();
        let cos_max = (0.9f64).asin().cos();
        // mean of a uniform variable on [cos_max, 1]
        let mean: f64 = waves.directions().iter().map(|k| k.z).sum::<f64>() / waves.len() as f64;
        assert!((mean - 0.5 * (1.0 + cos_max)).abs() < 5e-3, "mean = {}", mean);
        // azimuth is centred on the axis
        let mean_x: f64 = waves.directions().iter().map(|k| k.x).sum::<f64>() / waves.len() as f64;
        assert!(mean_x.abs() < 2e-2);
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let illum = illumination(Vector3::new(0.0, 0.0, -1.0));
        let n = Complex64::new(1.3, 0.0);
        let a = PlaneWaveSet::sample(&illum, n, 50, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = PlaneWaveSet::sample(&illum, n, 50, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tilted_axis() {
        let axis = Vector3::new(1.0, 1.0, 0.0).normalize();
        let illum = illumination(axis);
        let mut rng = StdRng::seed_from_u64(5);
        let waves = PlaneWaveSet::sample(&illum, Complex64::new(1.0, 0.0), 200, &mut rng).unwrap();
        let cos_max = (0.9f64).asin().cos();
        assert!(waves.directions().iter().all(|k| k.dot(&axis) >= cos_max - 1e-12));
    }

    #[test]
    fn steering_identity_and_rotation() {
        let nominal = Vector3::new(0.0, 0.0, 1.0);
        let same = steering_rotation(&nominal, &nominal).unwrap();
        assert!(same.angle().abs() < 1e-15);

        let target = Vector3::new(1.0, 0.0, 1.0).normalize();
        let rotation = steering_rotation(&nominal, &target).unwrap();
        assert!((rotation * nominal - target).norm() < 1e-12);

        let opposite = Vector3::new(0.0, 0.0, -1.0);
        assert!(matches!(
            steering_rotation(&nominal, &opposite),
            Err(MieError::DegenerateSteering { .. })
        ));
    }

    #[test]
    fn steered_samples_follow_target() {
        let illum = illumination(Vector3::new(0.0, 0.0, 1.0));
        let target = Vector3::new(0.0, 1.0, 1.0).normalize();
        let mut rng = StdRng::seed_from_u64(9);
        let waves =
            PlaneWaveSet::sample_steered(&illum, &target, Complex64::new(1.0, 0.0), 300, &mut rng).unwrap();
        let cos_max = (0.9f64).asin().cos();
        assert!(waves.directions().iter().all(|k| k.dot(&target) >= cos_max - 1e-12));
    }

    #[test]
    fn rejects_aperture_above_index() {
        let illum = illumination(Vector3::new(0.0, 0.0, -1.0));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            PlaneWaveSet::sample(&illum, Complex64::new(0.5, 0.0), 10, &mut rng),
            Err(MieError::ApertureExceedsIndex { .. })
        ));
        assert!(matches!(
            PlaneWaveSet::sample(&illum, Complex64::new(1.3, 0.0), 0, &mut rng),
            Err(MieError::EmptyPlaneWaves)
        ));
    }

    #[test]
    fn from_directions_normalises() {
        let waves = PlaneWaveSet::from_directions(vec![Vector3::new(0.0, 0.0, -2.0)]).unwrap();
        assert_eq!(waves.directions()[0], Vector3::new(0.0, 0.0, -1.0));
        assert!(PlaneWaveSet::from_directions(vec![]).is_err());
        assert!(PlaneWaveSet::from_directions(vec![Vector3::zeros()]).is_err());
    }
}

/// Directions of the plane waves approximating one realisation of a focused beam.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneWaveSet {
    directions: Vec<Vector3<f64>>,
}

impl PlaneWaveSet {
    /// Draws `count` directions uniformly over the illumination cone.
    ///
    /// **Context**: The condenser focuses light arriving from every direction
    /// inside its aperture. Summing a finite number of randomly oriented plane
    /// waves is a Monte Carlo estimate of that angular integral.
    ///
    /// **How it Works**: The cone half-angle is `asin(NA_out / re(n))`. For
    /// each sample an azimuth is drawn uniformly in `[0, 2 pi)` and the cosine
    /// of the polar angle uniformly between `cos(half-angle)` and 1. The
    /// resulting vector, built about the +z axis, is rotated onto the nominal
    /// beam direction.
    pub fn sample<R: Rng + ?Sized>(
        illumination: &Illumination,
        refr_index: Complex64,
        count: usize,
        rng: &mut R,
    ) -> Result<Self, MieError> {
        Self::sample_about(illumination, refr_index, count, rng, UnitQuaternion::identity())
    }

    /// Like [`PlaneWaveSet::sample`], but steers the cone from the nominal
    /// direction onto `target`.
    pub fn sample_steered<R: Rng + ?Sized>(
        illumination: &Illumination,
        target: &Vector3<f64>,
        refr_index: Complex64,
        count: usize,
        rng: &mut R,
    ) -> Result<Self, MieError> {
        let steering = steering_rotation(illumination.direction(), target)?;
        Self::sample_about(illumination, refr_index, count, rng, steering)
    }

    /// Builds a set from explicit directions, normalising each.
    pub fn from_directions(directions: Vec<Vector3<f64>>) -> Result<Self, MieError> {
        if directions.is_empty() {
            return Err(MieError::EmptyPlaneWaves);
        }
        let directions = directions
            .into_iter()
            .map(|k| {
                let norm = k.norm();
                if !norm.is_finite() || norm == 0.0 {
                    Err(MieError::InvalidDirection([k.x, k.y, k.z]))
                } else {
                    Ok(k / norm)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { directions })
    }

    pub fn directions(&self) -> &[Vector3<f64>] {
        &self.directions
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    fn sample_about<R: Rng + ?Sized>(
        illumination: &Illumination,
        refr_index: Complex64,
        count: usize,
        rng: &mut R,
        steering: UnitQuaternion<f64>,
    ) -> Result<Self, MieError> {
        let start = Instant::now();
        if count == 0 {
            return Err(MieError::EmptyPlaneWaves);
        }
        let ratio = illumination.na_out() / refr_index.re;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(MieError::ApertureExceedsIndex {
                na: illumination.na_out(),
                index: refr_index.re,
            });
        }

        let cos_max = ratio.asin().cos();
        let range = 1.0 - cos_max;
        let rotation = steering * axis_rotation(illumination.direction());

        let directions = (0..count)
            .map(|_| {
                let azimuth = rng.random::<f64>() * 2.0 * PI;
                let cos_polar = 1.0 - rng.random::<f64>() * range;
                let sin_polar = (1.0 - cos_polar * cos_polar).max(0.0).sqrt();
                let local = Vector3::new(
                    sin_polar * azimuth.cos(),
                    sin_polar * azimuth.sin(),
                    cos_polar,
                );
                rotation * local
            })
            .collect();

        debug!(
            samples = count,
            elapsed = ?start.elapsed(),
            "sampled plane waves"
        );
        Ok(Self { directions })
    }
}

/// Rotation taking +z onto `axis`.
fn axis_rotation(axis: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::rotation_between(&Vector3::z(), axis)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI))
}

/// Rotation that steers a beam from its `nominal` axis onto `target`.
///
/// The identity when the two coincide. Otherwise the rotation axis is
/// `nominal x target` and the angle is the polar angle of `target` measured
/// from `nominal`.
pub fn steering_rotation(
    nominal: &Vector3<f64>,
    target: &Vector3<f64>,
) -> Result<UnitQuaternion<f64>, MieError> {
    let norm = target.norm();
    if !norm.is_finite() || norm == 0.0 {
        return Err(MieError::InvalidDirection([target.x, target.y, target.z]));
    }
    let nominal = nominal.normalize();
    let target = target / norm;
    if (target - nominal).norm() < config::COLINEAR_THRESHOLD {
        return Ok(UnitQuaternion::identity());
    }

    let axis = Unit::try_new(nominal.cross(&target), config::COLINEAR_THRESHOLD).ok_or(
        MieError::DegenerateSteering {
            from: [nominal.x, nominal.y, nominal.z],
            to: [target.x, target.y, target.z],
        },
    )?;
    Ok(UnitQuaternion::from_axis_angle(&axis, nominal.angle(&target)))
}
