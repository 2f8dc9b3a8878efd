//! Outputs of a simulation run and their summary statistics.
//!
//! Field maps are kept in memory; writing them to disk or plotting them is
//! left to the caller. [`FieldStats`] condenses a map into the few numbers the
//! binary reports.

use std::fmt;

use ndarray::Array2;
use num_complex::Complex64;

use crate::scene::SceneField;


/// Magnitude statistics of a complex field map.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldStats {
    pub min: f64,    // smallest |E|
    pub max: f64,    // largest |E|
    pub mean: f64,   // mean |E|
    pub energy: f64, // sum of |E|^2 over all pixels
}

impl FieldStats {
    pub fn of(field: &Array2<Complex64>) -> Self {
        if field.is_empty() {
            return Self::default();
        }
        let (min, max, sum, energy) = field.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0, 0.0),
            |(min, max, sum, energy), v| {
                let magnitude = v.norm();
                (
                    min.min(magnitude),
                    max.max(magnitude),
                    sum + magnitude,
                    energy + v.norm_sqr(),
                )
            },
        );
        Self {
            min,
            max,
            mean: sum / field.len() as f64,
            energy,
        }
    }
}

impl fmt::Display for FieldStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min |E|: {:.6}, max |E|: {:.6}, mean |E|: {:.6}, sum |E|^2: {:.6}",
            self.min, self.max, self.mean, self.energy
        )
    }
}

/// Everything a simulation run produces.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Per-sphere and composed fields on the padded plane.
    pub field: SceneField,
    /// Composed field imaged through the objective, cropped to the field of view.
    pub detector_total: Array2<Complex64>,
    /// Focused field imaged through the objective, cropped to the field of view.
    pub detector_focused: Array2<Complex64>,
    /// Composed field propagated to each requested offset, cropped.
    pub refocused: Vec<(f64, Array2<Complex64>)>,
}

impl SimulationResult {
    pub fn total_stats(&self) -> FieldStats {
        FieldStats::of(self.field.total())
    }

    pub fn detector_stats(&self) -> FieldStats {
        FieldStats::of(&self.detector_total)
    }
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Results:")?;
        for (i, sphere) in self.field.spheres().iter().enumerate() {
            writeln!(f, "  - Sphere {}: {}", i, FieldStats::of(sphere.total()))?;
        }
        writeln!(f, "  - Total: {}", self.total_stats())?;
        writeln!(f, "  - Detector (total): {}", self.detector_stats())?;
        writeln!(
            f,
            "  - Detector (focused): {}",
            FieldStats::of(&self.detector_focused)
        )?;
        for (distance, field) in &self.refocused {
            writeln!(f, "  - Refocused at {:+.3}: {}", distance, FieldStats::of(field))?;
        }
        Ok(())
    }
}
