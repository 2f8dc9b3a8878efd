//! Observation planes on which fields are evaluated.
//!
//! A grid is a square array of 3D positions. The simulated resolution is the
//! base resolution multiplied by `2 * padding + 1`; the padding oversamples the
//! field so that Fourier-domain filtering and propagation do not alias. The
//! central `resolution x resolution` window is the region of interest and can
//! be recovered with [`Grid::crop`].

use clap::ValueEnum;
use nalgebra::Vector3;
use ndarray::{s, Array1, Array2};
use num_complex::Complex64;
use serde::Deserialize;

use crate::error::MieError;


/// Orientation of the observation plane relative to the optical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
pub enum PlaneOrientation {
    /// Plane perpendicular to the optical (z) axis at a fixed depth.
    Horizontal,
    /// Plane containing the optical axis (the y-z plane at a fixed x).
    Vertical,
}

/// A square plane of observation points.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    positions: Array2<Vector3<f64>>,
    fov: f64,
    resolution: usize,
    padding: usize,
    half_extent: f64,
    orientation: PlaneOrientation,
    offset: f64,
}

impl Grid {
    /// Builds a plane covering a field of view `fov` with `resolution` pixels,
    /// oversampled by `2 * padding + 1`.
    ///
    /// **Context**: The padded plane is what the field evaluator and the
    /// spectral propagator operate on; the padding keeps the periodic FFT
    /// from wrapping the field of view onto itself.
    ///
    /// **How it Works**: The half-extent is `ceil(fov / 2) * (2 * padding + 1)`
    /// and each axis runs linearly from `-half_extent` to `half_extent - 1`.
    /// Horizontal planes sit at `z = offset` with columns along x and rows
    /// along y. Vertical planes sit at `x = offset` with columns along y and
    /// rows along z.
    pub fn new(
        fov: f64,
        resolution: usize,
        padding: usize,
        orientation: PlaneOrientation,
        offset: f64,
    ) -> Result<Self, MieError> {
        if resolution == 0 {
            return Err(MieError::InvalidGrid("resolution must be at least 1".to_string()));
        }
        if !fov.is_finite() || fov <= 0.0 {
            return Err(MieError::InvalidGrid(format!("field of view must be positive, got {}", fov)));
        }
        if !offset.is_finite() {
            return Err(MieError::InvalidGrid(format!("plane offset must be finite, got {}", offset)));
        }

        let scale = (2 * padding + 1) as f64;
        let half_extent = (fov / 2.0).ceil() * scale;
        let sim_res = resolution * (2 * padding + 1);
        let axis = Array1::linspace(-half_extent, half_extent - 1.0, sim_res);

        let positions = Array2::from_shape_fn((sim_res, sim_res), |(i, j)| match orientation {
            PlaneOrientation::Horizontal => Vector3::new(axis[j], axis[i], offset),
            PlaneOrientation::Vertical => Vector3::new(offset, axis[j], axis[i]),
        });

        Ok(Self {
            positions,
            fov,
            resolution,
            padding,
            half_extent,
            orientation,
            offset,
        })
    }

    /// Returns a copy of the grid with every position mapped through `f`.
    pub fn transformed<F>(&self, f: F) -> Self
    where
        F: Fn(&Vector3<f64>) -> Vector3<f64>,
    {
        Self {
            positions: self.positions.map(f),
            ..self.clone()
        }
    }

    pub fn positions(&self) -> &Array2<Vector3<f64>> {
        &self.positions
    }

    pub fn fov(&self) -> f64 {
        self.fov
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Number of pixels along each side of the padded plane.
    pub fn sim_resolution(&self) -> usize {
        self.resolution * (2 * self.padding + 1)
    }

    pub fn half_extent(&self) -> f64 {
        self.half_extent
    }

    pub fn orientation(&self) -> PlaneOrientation {
        self.orientation
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn shape(&self) -> (usize, usize) {
        self.positions.dim()
    }

    /// Coordinates along either in-plane axis.
    pub fn axis(&self) -> Array1<f64> {
        Array1::linspace(-self.half_extent, self.half_extent - 1.0, self.sim_resolution())
    }

    /// Distance between neighbouring pixels.
    pub fn spacing(&self) -> f64 {
        let n = self.sim_resolution();
        if n < 2 {
            return 2.0 * self.half_extent - 1.0;
        }
        (2.0 * self.half_extent - 1.0) / (n - 1) as f64
    }

    /// Physical width sampled by the padded plane, `spacing * sim_resolution`.
    pub fn sampled_width(&self) -> f64 {
        self.spacing() * self.sim_resolution() as f64
    }

    /// Extracts the central `resolution x resolution` window of a padded field.
    pub fn crop(&self, field: &Array2<Complex64>) -> Result<Array2<Complex64>, MieError> {
        self.check_shape(field.dim())?;
        let start = self.padding * self.resolution;
        let end = start + self.resolution;
        Ok(field.slice(s![start..end, start..end]).to_owned())
    }

    /// Fails unless `dim` is the shape of this grid.
    pub fn check_shape(&self, dim: (usize, usize)) -> Result<(), MieError> {
        if dim != self.shape() {
            return Err(MieError::ShapeMismatch {
                expected: self.shape(),
                found: dim,
            });
        }
        Ok(())
    }
}
