use thiserror::Error;

/// Errors raised while building or running a scattering simulation.
///
/// Numerical kernels never return these. Singular inputs such as a zero
/// argument to a Bessel function, or a resonant Mie denominator, degrade
/// precision instead of failing.
#[derive(Debug, Error)]
pub enum MieError {
    #[error("invalid numerical aperture: NA_in = {na_in}, NA_out = {na_out} (need 0 <= NA_in < NA_out <= 1)")]
    InvalidAperture { na_in: f64, na_out: f64 },

    #[error("numerical aperture {na} exceeds the real refractive index {index} used for sampling")]
    ApertureExceedsIndex { na: f64, index: f64 },

    #[error("invalid sphere: {0}")]
    InvalidSphere(String),

    #[error("wavelength must be positive and finite, got {0}")]
    InvalidWavelength(f64),

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("direction vector must be finite and non-zero, got {0:?}")]
    InvalidDirection([f64; 3]),

    #[error("cannot steer beam from {from:?} onto the antiparallel direction {to:?}")]
    DegenerateSteering { from: [f64; 3], to: [f64; 3] },

    #[error("field shape mismatch: expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("plane-wave set is empty")]
    EmptyPlaneWaves,

    #[error("nothing to compose: no spheres or field maps were given")]
    EmptyScene,

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
