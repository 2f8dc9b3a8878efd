//! # miefield
//!
//! Synthetic fields for validating digital refocusing. A focused beam from a
//! condenser with an annular aperture illuminates one or more homogeneous
//! dielectric spheres, and the resulting complex field is evaluated on an
//! observation plane.
//!
//! The crate is organised leaf-first:
//! - [`special`]: Legendre polynomials and spherical Bessel and Hankel functions
//! - [`beam`]: Monte Carlo sampling of the plane waves making up the beam
//! - [`mie`]: partial-wave coefficients of a sphere
//! - [`field`]: focused, scattered and internal fields of one sphere
//! - [`scene`]: superposition of several spheres
//! - [`propagate`]: angular-spectrum propagation and aperture filtering
//!
//! [`settings`] and [`simulation`] wire these together for the binary.

pub mod beam;
pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod illumination;
pub mod logging;
pub mod mie;
pub mod propagate;
pub mod result;
pub mod scene;
pub mod settings;
pub mod simulation;
pub mod special;
pub mod sphere;
