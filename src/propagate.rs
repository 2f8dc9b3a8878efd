//! Angular-spectrum propagation and aperture filtering of field maps.
//!
//! Fields are moved between parallel planes by multiplying their 2D spectrum
//! with the transfer function `exp(i d kz)`. Spectra are kept in FFT order
//! (zero frequency at index 0, negative frequencies in the upper half), so the
//! `kz` map and bandpass masks built here are laid out the same way.
//!
//! # Limitations
//!
//! Evanescent orders are given `kz = 0` and pass through propagation with no
//! phase change. Their information is not physically meaningful and a round
//! trip through `d` and `-d` only restores the propagating band faithfully.

use std::sync::Arc;
use std::time::Instant;

use ndarray::{Array1, Array2, Zip};
use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};
use tracing::debug;

use crate::error::MieError;


/// Sample frequencies of a length-`n` FFT with sample spacing `spacing`, in FFT order.
pub fn fft_frequencies(n: usize, spacing: f64) -> Array1<f64> {
    let scale = 1.0 / (n as f64 * spacing);
    Array1::from_shape_fn(n, |i| {
        let index = if i < (n + 1) / 2 {
            i as f64
        } else {
            i as f64 - n as f64
        };
        index * scale
    })
}

/// Axial frequency at each cell of the Fourier domain of a square field.
///
/// The in-plane frequencies are the FFT frequencies for a pixel size of
/// `fov / resolution`. `kz = sqrt(1 - kx^2 - ky^2)` where `kx^2 + ky^2 < 1` and
/// 0 at evanescent cells.
pub fn kz_map(fov: f64, resolution: usize) -> Array2<f64> {
    let freqs = fft_frequencies(resolution, fov / resolution as f64);
    Array2::from_shape_fn((resolution, resolution), |(i, j)| {
        let k_para = freqs[j] * freqs[j] + freqs[i] * freqs[i];
        if k_para < 1.0 {
            (1.0 - k_para).sqrt()
        } else {
            0.0
        }
    })
}

/// Propagates `field` by `distance` along the optical axis.
///
/// Forward transforms the field, multiplies by `exp(i distance kz)` and
/// transforms back.
pub fn propagate(
    field: &Array2<Complex64>,
    distance: f64,
    kz: &Array2<f64>,
) -> Result<Array2<Complex64>, MieError> {
    check_dim(field.dim(), kz.dim())?;
    let start = Instant::now();
    let fft = Fft2::new(field.dim());
    let spectrum = fft.forward(field)?;
    let propagated = fft.inverse(&transfer(&spectrum, distance, kz))?;
    debug!(distance, elapsed = ?start.elapsed(), "propagated field");
    Ok(propagated)
}

/// Propagates one field to several axial offsets, sharing the forward transform.
pub fn propagate_stack(
    field: &Array2<Complex64>,
    distances: &[f64],
    kz: &Array2<f64>,
) -> Result<Vec<Array2<Complex64>>, MieError> {
    check_dim(field.dim(), kz.dim())?;
    let start = Instant::now();
    let fft = Fft2::new(field.dim());
    let spectrum = fft.forward(field)?;

    let stack = distances
        .par_iter()
        .map(|&d| fft.inverse(&transfer(&spectrum, d, kz)))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(planes = stack.len(), elapsed = ?start.elapsed(), "propagated stack");
    Ok(stack)
}

/// Annular pass mask in the Fourier domain of a padded square field.
///
/// **Context**: The objective only collects spatial frequencies between
/// `NA_in / lambda` and `NA_out / lambda`. Applying this mask to a spectrum
/// emulates imaging through that aperture.
///
/// **How it Works**: The frequency step is `1 / (2 half_extent)`. Index `i`
/// maps to frequency index `i` when `2i <= resolution` and `i - resolution`
/// otherwise. Cells whose radial frequency is below `NA_in / lambda` or above
/// `NA_out / lambda` are zeroed; the boundaries themselves pass.
pub fn bandpass(
    half_extent: f64,
    resolution: usize,
    na_in: f64,
    na_out: f64,
    wavelength: f64,
) -> Array2<f64> {
    let wrap = |i: usize| -> f64 {
        if 2 * i <= resolution {
            i as f64
        } else {
            i as f64 - resolution as f64
        }
    };
    let width = 2.0 * half_extent;
    let low = na_in / wavelength;
    let high = na_out / wavelength;

    Array2::from_shape_fn((resolution, resolution), |(i, j)| {
        let (u, v) = (wrap(i), wrap(j));
        let magnitude = (u * u + v * v).sqrt() / width;
        if magnitude < low || magnitude > high {
            0.0
        } else {
            1.0
        }
    })
}

/// Field seen through the finite aperture described by `bandpass`.
pub fn detector_image(
    field: &Array2<Complex64>,
    bandpass: &Array2<f64>,
) -> Result<Array2<Complex64>, MieError> {
    check_dim(field.dim(), bandpass.dim())?;
    let fft = Fft2::new(field.dim());
    let mut spectrum = fft.forward(field)?;
    Zip::from(&mut spectrum)
        .and(bandpass)
        .for_each(|s, &m| *s *= m);
    fft.inverse(&spectrum)
}

fn transfer(spectrum: &Array2<Complex64>, distance: f64, kz: &Array2<f64>) -> Array2<Complex64> {
    Zip::from(spectrum)
        .and(kz)
        .map_collect(|&s, &kz| s * Complex64::new(0.0, distance * kz).exp())
}

fn check_dim(expected: (usize, usize), found: (usize, usize)) -> Result<(), MieError> {
    if expected != found {
        return Err(MieError::ShapeMismatch { expected, found });
    }
    Ok(())
}

/// Planned 2D transform over a row-major buffer.
///
/// Rows are transformed in place, then the buffer is transposed so that the
/// columns become contiguous, transformed and transposed back.
struct Fft2 {
    rows: usize,
    cols: usize,
    row_forward: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl Fft2 {
    fn new((rows, cols): (usize, usize)) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            rows,
            cols,
            row_forward: planner.plan_fft_forward(cols),
            col_forward: planner.plan_fft_forward(rows),
            row_inverse: planner.plan_fft_inverse(cols),
            col_inverse: planner.plan_fft_inverse(rows),
        }
    }

    fn forward(&self, field: &Array2<Complex64>) -> Result<Array2<Complex64>, MieError> {
        let mut data: Vec<Complex64> = field.iter().copied().collect();
        self.transform(&mut data, &self.row_forward, &self.col_forward);
        Ok(Array2::from_shape_vec((self.rows, self.cols), data)?)
    }

    /// Inverse transform, scaled by `1 / (rows * cols)`.
    fn inverse(&self, spectrum: &Array2<Complex64>) -> Result<Array2<Complex64>, MieError> {
        let mut data: Vec<Complex64> = spectrum.iter().copied().collect();
        self.transform(&mut data, &self.row_inverse, &self.col_inverse);

        // rustfft is unnormalised
        let scale = 1.0 / (self.rows * self.cols) as f64;
        data.par_iter_mut().for_each(|v| *v *= scale);
        Ok(Array2::from_shape_vec((self.rows, self.cols), data)?)
    }

    fn transform(&self, data: &mut [Complex64], row_fft: &Arc<dyn Fft<f64>>, col_fft: &Arc<dyn Fft<f64>>) {
        let (rows, cols) = (self.rows, self.cols);
        if rows == 0 || cols == 0 {
            return;
        }

        data.par_chunks_mut(cols).for_each(|row| row_fft.process(row));

        // transpose so each column is contiguous: tmp[c * rows + r] = data[r * cols + c]
        let mut tmp = vec![Complex64::new(0.0, 0.0); rows * cols];
        {
            let data_ro: &[Complex64] = data;
            tmp.par_chunks_mut(rows).enumerate().for_each(|(c, col)| {
                for (r, value) in col.iter_mut().enumerate() {
                    *value = data_ro[r * cols + c];
                }
            });
        }

        tmp.par_chunks_mut(rows).for_each(|col| col_fft.process(col));

        data.par_chunks_mut(cols).enumerate().for_each(|(r, row)| {
            for (c, value) in row.iter_mut().enumerate() {
                *value = tmp[c * rows + r];
            }
        });
    }
}
