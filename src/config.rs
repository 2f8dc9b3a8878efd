/// Truncation order of the partial-wave expansion of the focused beam.
pub const FOCUSED_FIELD_ORDER: usize = 100;
/// Refractive index of the surrounding medium.
pub const MEDIUM_REFR_INDEX: f64 = 1.0;
/// Default amplitude of the incident field.
pub const DEFAULT_AMPLITUDE: f64 = 1.0;
/// Magnitude at which the downward Bessel recurrence is rescaled to avoid overflow.
pub const RECURRENCE_RESCALE: f64 = 1e100;
/// Seed value of the downward Bessel recurrence.
pub const RECURRENCE_SEED: f64 = 1e-30;
/// Minimum norm for two unit vectors to be considered distinct.
pub const COLINEAR_THRESHOLD: f64 = 1e-9;
