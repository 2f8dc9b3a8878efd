use std::env;
use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use nalgebra::Vector3;
use num_complex::Complex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::info;

use crate::grid::{Grid, PlaneOrientation};
use crate::illumination::Illumination;
use crate::scene::Scene;
use crate::sphere::Sphere;


/// One sphere of the scene as written in the configuration file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SphereSpec {
    pub position: [f64; 3],
    pub radius: f64,
    pub refr_index: Complex<f64>,
}

/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub direction: [f64; 3],
    pub wavelength: f64,
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    pub resolution: usize,
    pub fov: f64,
    pub padding: usize,
    pub num_samples: usize,
    pub na_in: f64,
    pub na_out: f64,
    /// Index that bounds the sampled cone, `asin(NA_out / re(n))`.
    pub sampling_index: Complex<f64>,
    pub orientation: PlaneOrientation,
    pub plane_offset: f64,
    pub seed: Option<u64>,
    /// Steers the sampled cone onto this direction instead of `direction`.
    #[serde(default)]
    pub steer: Option<[f64; 3]>,
    /// Axial offsets to refocus the composed field to.
    #[serde(default)]
    pub propagation_distances: Vec<f64>,
    pub spheres: Vec<SphereSpec>,
}

fn default_amplitude() -> f64 {
    crate::config::DEFAULT_AMPLITUDE
}

impl Settings {
    pub fn illumination(&self) -> Result<Illumination> {
        let [x, y, z] = self.direction;
        Illumination::new(
            Vector3::new(x, y, z),
            self.wavelength,
            self.amplitude,
            self.na_in,
            self.na_out,
        )
        .context("invalid illumination")
    }

    pub fn grid(&self) -> Result<Grid> {
        Grid::new(
            self.fov,
            self.resolution,
            self.padding,
            self.orientation,
            self.plane_offset,
        )
        .context("invalid observation grid")
    }

    pub fn scene(&self) -> Result<Scene> {
        let spheres = self
            .spheres
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let [x, y, z] = spec.position;
                Sphere::new(Vector3::new(x, y, z), spec.radius, spec.refr_index)
                    .with_context(|| format!("invalid sphere {}", i))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Scene::new(spheres)?)
    }

    pub fn steer_target(&self) -> Option<Vector3<f64>> {
        self.steer.map(|[x, y, z]| Vector3::new(x, y, z))
    }

    /// Random source for the beam sampler, seeded when `seed` is set.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Checks every derived input so that a bad configuration fails before any
    /// field is evaluated.
    pub fn validate(&self) -> Result<()> {
        self.illumination()?;
        self.grid()?;
        self.scene()?;
        if self.num_samples == 0 {
            bail!("number of plane-wave samples must be at least 1");
        }
        if self.na_out > self.sampling_index.re {
            bail!(
                "NA_out = {} exceeds the real part of the sampling index {}",
                self.na_out,
                self.sampling_index.re
            );
        }
        if self.propagation_distances.iter().any(|d| !d.is_finite()) {
            bail!("propagation distances must be finite");
        }
        Ok(())
    }
}

pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .context("error loading configuration")?;

    let config: Settings = settings
        .try_deserialize()
        .context("error deserializing configuration")?;

    config.validate()?;

    Ok(config)
}

/// Loads the configuration file, then environment variables prefixed with
/// `MIEFIELD_`, then command-line overrides.
pub fn load_config() -> Result<Settings> {
    let root = retrieve_project_root()?;

    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    // Check if local config exists, if not use default
    let config_file = if local_config.exists() {
        info!("using local configuration: {:?}", local_config);
        local_config
    } else {
        info!("using default configuration: {:?}", default_config_file);
        default_config_file
    };

    let settings: Config = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(Environment::with_prefix("miefield"))
        .build()
        .context("error loading configuration")?;

    let mut config: Settings = settings
        .try_deserialize()
        .context("error deserializing configuration")?;

    let args = CliArgs::parse();
    apply_overrides(&mut config, &args);

    config.validate()?;

    info!("{}", config);

    Ok(config)
}

/// Replaces configuration values with those given on the command line.
pub fn apply_overrides(config: &mut Settings, args: &CliArgs) {
    if let Some(wavelength) = args.w {
        config.wavelength = wavelength;
    }
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    if let Some(fov) = args.fov {
        config.fov = fov;
    }
    if let Some(padding) = args.padding {
        config.padding = padding;
    }
    if let Some(samples) = args.samples {
        config.num_samples = samples;
    }
    if let Some(na_in) = args.na_in {
        config.na_in = na_in;
    }
    if let Some(na_out) = args.na_out {
        config.na_out = na_out;
    }
    if let Some(orientation) = args.orientation {
        config.orientation = orientation;
    }
    if let Some(offset) = args.offset {
        config.plane_offset = offset;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(steer) = &args.steer {
        if let [x, y, z] = steer.as_slice() {
            config.steer = Some([*x, *y, *z]);
        }
    }
    if let Some(distances) = &args.propagate {
        config.propagation_distances = distances.clone();
    }
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the MIEFIELD_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("MIEFIELD_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    // Walk upward from the executable directory
    let exe_path = env::current_exe().context("failed to get current executable path")?;
    let mut current_dir = exe_path
        .parent()
        .ok_or_else(|| anyhow!("failed to get executable directory"))?
        .to_path_buf();
    loop {
        if current_dir.join("config").is_dir() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            bail!("could not find project root directory");
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "miefield - focused-beam Mie scattering fields")]
pub struct CliArgs {
    /// Wavelength in units of the grid.
    #[arg(short, long)]
    w: Option<f64>,

    /// Number of pixels along each side of the field of view.
    #[arg(long)]
    resolution: Option<usize>,

    /// Field of view, the side length of the imaged region.
    #[arg(long)]
    fov: Option<f64>,

    /// Padding factor. The simulated plane has `resolution * (2 * padding + 1)` pixels per side.
    #[arg(long)]
    padding: Option<usize>,

    /// Number of Monte Carlo plane-wave samples.
    #[arg(short = 'n', long)]
    samples: Option<usize>,

    /// Inner numerical aperture of the condenser.
    #[arg(long)]
    na_in: Option<f64>,

    /// Outer numerical aperture of the condenser.
    #[arg(long)]
    na_out: Option<f64>,

    /// Orientation of the observation plane.
    #[arg(long, value_enum)]
    orientation: Option<PlaneOrientation>,

    /// Position of the observation plane along its normal.
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<f64>,

    /// Random seed for the plane-wave sampler.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Steer the illumination cone onto this direction.
    /// Format: x y z
    #[arg(long, num_args = 3, value_delimiter = ' ', allow_hyphen_values = true)]
    steer: Option<Vec<f64>>,

    /// Axial distances to propagate the composed field by, separated by spaces.
    #[arg(long, num_args = 1.., value_delimiter = ' ', allow_hyphen_values = true)]
    propagate: Option<Vec<f64>>,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Direction: {:?}
  - Wavelength: {:.6}
  - Amplitude: {:.6}
  - Resolution: {} (padding {})
  - Field of View: {:.6}
  - Numerical Aperture: {:.6} - {:.6}
  - Samples: {}
  - Sampling Index: {:.6} + {:.6}i
  - Plane: {:?} at {:.6}
  - Spheres: {}
  ",
            self.direction,
            self.wavelength,
            self.amplitude,
            self.resolution,
            self.padding,
            self.fov,
            self.na_in,
            self.na_out,
            self.num_samples,
            self.sampling_index.re,
            self.sampling_index.im,
            self.orientation,
            self.plane_offset,
            self.spheres.len(),
        )
    }
}
