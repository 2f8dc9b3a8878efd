//! End-to-end run of a configured scene.
//!
//! A [`Simulation`] turns [`Settings`] into validated inputs and then:
//! 1. samples one plane-wave realisation of the focused beam
//! 2. renders every sphere against it and composes the scene
//! 3. images the composed and focused fields through the objective aperture
//! 4. propagates the composed field to each requested axial offset
//!
//! All maps handed back are cropped to the field of view except the raw scene
//! field, which stays on the padded plane.

use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use num_complex::Complex64;
use tracing::info;

use crate::beam::PlaneWaveSet;
use crate::grid::Grid;
use crate::illumination::Illumination;
use crate::propagate;
use crate::result::SimulationResult;
use crate::scene::Scene;
use crate::settings::Settings;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::PlaneOrientation;
    use crate::settings::SphereSpec;

    fn small_settings() -> Settings {
        Settings {
            direction: [0.0, 0.0, -1.0],
            wavelength: 8.0,
            amplitude: 1.0,
            resolution: 6,
            fov: 20.0,
            padding: 1,
            num_samples: 10,
            na_in: 0.0,
            na_out: 0.9,
            sampling_index: Complex64::new(1.3, 2.58604e-4),
            orientation: PlaneOrientation::Horizontal,
            plane_offset: 8.0,
            seed: Some(4),
            steer: None,
            propagation_distances: vec![-4.0, 4.0],
            spheres: vec![SphereSpec {
                position: [0.0, 0.0, 0.0],
                radius: 3.0,
                refr_index: Complex64::new(1.3, 2.58604e-4),
            }],
        }
    }

    #[test]
    fn solve_produces_cropped_maps() {
        let settings = small_settings();
        let simulation = Simulation::new(&settings).unwrap();
        let result = simulation.solve().unwrap();

        assert_eq!(result.field.total().dim(), (18, 18));
        assert_eq!(result.detector_total.dim(), (6, 6));
        assert_eq!(result.detector_focused.dim(), (6, 6));
        assert_eq!(result.refocused.len(), 2);
        assert_eq!(result.refocused[0].0, -4.0);
        assert!(result.refocused.iter().all(|(_, f)| f.dim() == (6, 6)));
        assert!(result.total_stats().max > 0.0);
    }

    #[test]
    fn seeded_runs_agree() {
        let settings = small_settings();
        let a = Simulation::new(&settings).unwrap().solve().unwrap();
        let b = Simulation::new(&settings).unwrap().solve().unwrap();
        assert_eq!(a.field.total(), b.field.total());
    }

    #[test]
    fn steered_run() {
        let mut settings = small_settings();
        settings.steer = Some([0.0, 0.2, -1.0]);
        let result = Simulation::new(&settings).unwrap().solve().unwrap();
        assert!(result.field.total().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut settings = small_settings();
        settings.wavelength = 0.0;
        assert!(Simulation::new(&settings).is_err());
    }
}

/// Validated inputs of one run.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub settings: Settings,
    pub illumination: Illumination,
    pub grid: Grid,
    pub scene: Scene,
}

impl Simulation {
    pub fn new(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings: settings.clone(),
            illumination: settings.illumination()?,
            grid: settings.grid()?,
            scene: settings.scene()?,
        })
    }

    /// Draws the plane-wave realisation shared by every sphere of the scene.
    pub fn sample_waves(&self) -> Result<PlaneWaveSet> {
        let mut rng = self.settings.rng();
        let waves = match self.settings.steer_target() {
            Some(target) => PlaneWaveSet::sample_steered(
                &self.illumination,
                &target,
                self.settings.sampling_index,
                self.settings.num_samples,
                &mut rng,
            ),
            None => PlaneWaveSet::sample(
                &self.illumination,
                self.settings.sampling_index,
                self.settings.num_samples,
                &mut rng,
            ),
        };
        waves.context("failed to sample plane waves")
    }

    /// Runs the full pipeline.
    ///
    /// **Context**: The padded plane is needed for filtering and propagation,
    /// but only its central window is meaningful.
    ///
    /// **How it Works**: Renders the scene with a progress bar over spheres,
    /// builds the objective bandpass from the padded plane's half-extent, and
    /// refocuses the composed field with a `kz` map sized to the physical
    /// width of the padded plane. Filtered and propagated maps are cropped.
    pub fn solve(&self) -> Result<SimulationResult> {
        let start = Instant::now();
        info!("solving scene with {} spheres", self.scene.spheres().len());

        let waves = self.sample_waves()?;

        let pb = ProgressBar::new(self.scene.spheres().len() as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
        ) {
            pb.set_style(style.progress_chars("█▇▆▅▄▃▂▁"));
        }
        pb.set_message("sphere".to_string());
        let field = self
            .scene
            .render_with_progress(&self.grid, &self.illumination, &waves, &pb)?;
        pb.finish_and_clear();

        let bpf = propagate::bandpass(
            self.grid.half_extent(),
            self.grid.sim_resolution(),
            self.illumination.na_in(),
            self.illumination.na_out(),
            self.illumination.wavelength(),
        );
        let detector_total = self
            .grid
            .crop(&propagate::detector_image(field.total(), &bpf)?)?;
        let detector_focused = self
            .grid
            .crop(&propagate::detector_image(field.focused(), &bpf)?)?;

        let refocused = self.refocus(field.total())?;

        info!(elapsed = ?start.elapsed(), "solved scene");
        Ok(SimulationResult {
            field,
            detector_total,
            detector_focused,
            refocused,
        })
    }

    fn refocus(&self, total: &Array2<Complex64>) -> Result<Vec<(f64, Array2<Complex64>)>> {
        let distances = &self.settings.propagation_distances;
        if distances.is_empty() {
            return Ok(Vec::new());
        }
        let kz = propagate::kz_map(self.grid.sampled_width(), self.grid.sim_resolution());
        let planes = propagate::propagate_stack(total, distances, &kz)?;
        distances
            .iter()
            .zip(planes.iter())
            .map(|(&d, plane)| -> Result<_> { Ok((d, self.grid.crop(plane)?)) })
            .collect()
    }
}
