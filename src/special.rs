//! Special functions for partial-wave expansions.
//!
//! This module provides the numerical kernels shared by the Mie coefficient
//! solver and the field evaluator. Every evaluator returns the values for all
//! orders from 0 up to the requested maximum, so that a partial-wave sum can be
//! formed directly from the result.
//!
//! The kernels provided are:
//! - Legendre polynomials via the three-term recurrence
//! - Spherical Bessel functions of the first kind, for complex arguments
//! - Spherical Bessel functions of the second kind, for real arguments
//! - Spherical Hankel functions of the first kind and their derivatives
//!
//! # Array Layout
//!
//! The `_array` variants accept an argument of any dimensionality (including
//! zero-dimensional scalars) and return an array with one extra trailing axis
//! holding the order index, i.e. `[input-shape..., order + 1]`.
//!
//! # Singularities
//!
//! Bessel and Hankel functions are undefined at a zero argument. Callers must
//! exclude such points (the field evaluator does so through the sphere mask).

use ndarray::{Array, Array1, ArrayBase, ArrayView1, ArrayViewMut1, Axis, Data, Dimension};
use num_complex::Complex64;

use crate::config;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr0, array, Array2};
    use std::f64::consts::PI;

    const TOL: f64 = 1e-12;

    #[test]
    fn legendre_low_orders() {
        for &x in &[-1.0, -0.3, 0.0, 0.5, 0.9, 1.0] {
            let p = legendre(4, x);
            assert_eq!(p[0], 1.0);
            assert_eq!(p[1], x);
            let p2 = 0.5 * (3.0 * x * x - 1.0);
            assert!((p[2] - p2).abs() < TOL, "P2({}) = {}", x, p[2]);
        }
    }

    #[test]
    fn legendre_unity_at_one() {
        let p = legendre(60, 1.0);
        for (l, value) in p.iter().enumerate() {
            assert!((value - 1.0).abs() < 1e-12, "P_{}(1) = {}", l, value);
        }
    }

    #[test]
    fn legendre_order_zero() {
        let p = legendre(0, 0.7);
        assert_eq!(p.len(), 1);
        assert_eq!(p[0], 1.0);
    }

    #[test]
    fn legendre_array_shapes() {
        let scalar = legendre_array(3, &arr0(0.25));
        assert_eq!(scalar.shape(), &[4]);

        let vector = legendre_array(5, &array![0.1, 0.2, 0.3]);
        assert_eq!(vector.shape(), &[3, 6]);

        let grid = Array2::from_shape_fn((2, 4), |(i, j)| (i as f64 - j as f64) * 0.2);
        let out = legendre_array(7, &grid);
        assert_eq!(out.shape(), &[2, 4, 8]);
        for ((i, j), &x) in grid.indexed_iter() {
            let expected = legendre(7, x);
            for l in 0..=7 {
                assert_eq!(out[[i, j, l]], expected[l]);
            }
        }
    }

    #[test]
    fn legendre_series_matches_explicit_sum() {
        let coeffs = Array1::from_shape_fn(12, |l| Complex64::new(1.0 / (l + 1) as f64, l as f64));
        let x = 0.37;
        let p = legendre(11, x);
        let explicit: Complex64 = coeffs.iter().zip(p.iter()).map(|(c, p)| *c * *p).sum();
        let series = legendre_series(coeffs.view(), x);
        assert!((series - explicit).norm() < 1e-10);
    }

    #[test]
    fn bessel_j0_closed_form() {
        for i in 1..200 {
            let x = i as f64 * 0.37;
            let j = sph_bessel_j(5, x, Shift::None);
            let expected = x.sin() / x;
            assert!((j[0].re - expected).abs() < 1e-12, "x = {}: {} vs {}", x, j[0], expected);
            assert!(j[0].im.abs() < 1e-15);
        }
    }

    #[test]
    fn bessel_j1_closed_form() {
        for &x in &[0.1, 1.0, 2.5, PI, 10.0, 47.3] {
            let j = sph_bessel_j(3, x, Shift::None);
            let expected = x.sin() / (x * x) - x.cos() / x;
            assert!((j[1].re - expected).abs() < 1e-12, "x = {}", x);
        }
    }

    #[test]
    fn bessel_j_complex_argument() {
        let z = Complex64::new(3.0, 0.5);
        let j = sph_bessel_j(8, z, Shift::None);
        let expected = z.sin() / z;
        assert!((j[0] - expected).norm() < 1e-12);
        let expected1 = z.sin() / (z * z) - z.cos() / z;
        assert!((j[1] - expected1).norm() < 1e-12);
    }

    #[test]
    fn bessel_j_small_argument_high_order() {
        // leading terms of the power series j_l(x) = x^l / (2l+1)!! (1 - x^2 / (2(2l+3)))
        let x: f64 = 0.5;
        let l = 10;
        let double_factorial: f64 = (1..=2 * l + 1).step_by(2).map(|k| k as f64).product();
        let expected = x.powi(l as i32) / double_factorial
            * (1.0 - x * x / (2.0 * (2 * l + 3) as f64));
        let j = sph_bessel_j(l, x, Shift::None);
        assert!(((j[l].re - expected) / expected).abs() < 1e-6, "{} vs {}", j[l].re, expected);
    }

    #[test]
    fn bessel_j0_closed_form_at_focused_order() {
        // the focused field evaluates to order 100 over a wide range of kr
        for i in 1..=240 {
            let x = i as f64 * 0.25;
            let j = sph_bessel_j(100, x, Shift::None);
            let expected = x.sin() / x;
            assert!((j[0].re - expected).abs() < 1e-12, "x = {}: {} vs {}", x, j[0], expected);
        }
    }

    #[test]
    fn bessel_wronskian_at_focused_order() {
        // j_l y_{l-1} - j_{l-1} y_l = 1 / x^2
        for i in 1..=120 {
            let x = i as f64 * 0.5;
            let j = sph_bessel_j(100, x, Shift::None);
            let y = sph_bessel_y(100, x, Shift::None);
            for l in 1..=100 {
                let w = j[l].re * y[l - 1] - j[l - 1].re * y[l];
                assert!(
                    (w * x * x - 1.0).abs() < 1e-8,
                    "x = {}, l = {}: x^2 W = {}",
                    x,
                    l,
                    w * x * x
                );
            }
        }
    }

    #[test]
    fn bessel_j_small_complex_argument() {
        let z = Complex64::new(1.3, 2.58604e-4) * 0.05;
        let j = sph_bessel_j(20, z, Shift::None);
        assert!((j[0] - z.sin() / z).norm() < 1e-12, "j0 = {}", j[0]);
        for l in [1usize, 5, 20] {
            let double_factorial: f64 = (1..=2 * l + 1).step_by(2).map(|k| k as f64).product();
            let a = (2 * l + 3) as f64;
            let z2 = z * z;
            let expected = z.powi(l as i32) / double_factorial
                * (1.0 - z2 / (2.0 * a) + z2 * z2 / (8.0 * a * (a + 2.0)));
            assert!(
                ((j[l] - expected) / expected).norm() < 1e-9,
                "l = {}: {} vs {}",
                l,
                j[l],
                expected
            );
        }
    }

    #[test]
    fn bessel_j_shifts() {
        let x = 2.7;
        let base = sph_bessel_j(6, x, Shift::None);
        let down = sph_bessel_j(6, x, Shift::Down);
        let up = sph_bessel_j(6, x, Shift::Up);
        assert!((down[0].re - x.cos() / x).abs() < TOL);
        for l in 1..=6 {
            assert!((down[l] - base[l - 1]).norm() < TOL);
        }
        for l in 0..6 {
            assert!((up[l] - base[l + 1]).norm() < TOL);
        }
    }

    #[test]
    fn bessel_y_closed_form() {
        for &x in &[0.3, 1.0, 4.2, 25.0] {
            let y = sph_bessel_y(2, x, Shift::None);
            assert!((y[0] - (-x.cos() / x)).abs() < 1e-12);
            assert!((y[1] - (-x.cos() / (x * x) - x.sin() / x)).abs() < 1e-12);
            let down = sph_bessel_y(2, x, Shift::Down);
            assert!((down[0] - x.sin() / x).abs() < 1e-12);
        }
    }

    #[test]
    fn hankel_h0_closed_form() {
        let i = Complex64::i();
        for k in 1..100 {
            let x = k as f64 * 0.5;
            let h = sph_hankel(4, x, Shift::None);
            let expected = -i * (i * x).exp() / x;
            assert!((h[0] - expected).norm() < 1e-12, "x = {}", x);
        }
    }

    #[test]
    fn bessel_derivative_identity() {
        // j_0' = -j_1
        for &x in &[0.4, 1.7, 9.0] {
            let dj = sph_bessel_j_deriv(3, x);
            let j = sph_bessel_j(3, x, Shift::None);
            assert!((dj[0] + j[1]).norm() < 1e-12);
            // j_l' = j_{l-1} - (l + 1) / x j_l
            for l in 1..=3 {
                let expected = j[l - 1] - j[l] * ((l + 1) as f64 / x);
                assert!((dj[l] - expected).norm() < 1e-12);
            }
        }
    }

    #[test]
    fn hankel_derivative_finite_difference() {
        let x = 3.3;
        let h = 1e-6;
        let dh = sph_hankel_deriv(5, x);
        let plus = sph_hankel(5, x + h, Shift::None);
        let minus = sph_hankel(5, x - h, Shift::None);
        for l in 0..=5 {
            let fd = (plus[l] - minus[l]) / (2.0 * h);
            assert!((dh[l] - fd).norm() < 1e-6, "l = {}: {} vs {}", l, dh[l], fd);
        }
    }

    #[test]
    fn array_variants_match_scalar() {
        let x = Array2::from_shape_fn((3, 3), |(i, j)| 0.5 + i as f64 + 0.25 * j as f64);
        let j = sph_bessel_j_array(4, &x, Shift::None);
        let h = sph_hankel_array(4, &x, Shift::Up);
        assert_eq!(j.shape(), &[3, 3, 5]);
        for ((a, b), &value) in x.indexed_iter() {
            let js = sph_bessel_j(4, value, Shift::None);
            let hs = sph_hankel(4, value, Shift::Up);
            for l in 0..=4 {
                assert_eq!(j[[a, b, l]], js[l]);
                assert_eq!(h[[a, b, l]], hs[l]);
            }
        }
    }
}

/// Order shift applied when evaluating a spherical Bessel or Hankel function.
///
/// `Down` returns the values at orders `l - 1`, `Up` at orders `l + 1`. The
/// shifted sequences feed the derivative recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    None,
    Down,
    Up,
}

impl Shift {
    /// Index of order 0 in a window starting at order -1.
    fn window_start(self) -> usize {
        match self {
            Shift::Down => 0,
            Shift::None => 1,
            Shift::Up => 2,
        }
    }
}

/// Legendre polynomials `P_0..=P_order` at `x`.
pub fn legendre(order: usize, x: f64) -> Array1<f64> {
    let mut p = Array1::zeros(order + 1);
    fill_legendre(x, p.view_mut());
    p
}

/// Legendre polynomials evaluated elementwise, with a trailing order axis.
pub fn legendre_array<S, D>(order: usize, x: &ArrayBase<S, D>) -> Array<f64, D::Larger>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    order_indexed(order, x, |&value, lane| fill_legendre(value, lane))
}

/// Sums `coeffs[l] * P_l(x)` over all orders without materialising the polynomials.
///
/// Uses the same recurrence as [`legendre`], so the result is the dot product of
/// `coeffs` with `legendre(coeffs.len() - 1, x)`.
pub fn legendre_series(coeffs: ArrayView1<Complex64>, x: f64) -> Complex64 {
    let n = coeffs.len();
    if n == 0 {
        return Complex64::new(0.0, 0.0);
    }
    let mut sum = coeffs[0];
    if n == 1 {
        return sum;
    }
    let mut p_prev = 1.0;
    let mut p = x;
    sum += coeffs[1] * p;
    for j in 1..n - 1 {
        let jf = j as f64;
        let p_next = ((2.0 * jf + 1.0) / (jf + 1.0)) * x * p - (jf / (jf + 1.0)) * p_prev;
        sum += coeffs[j + 1] * p_next;
        p_prev = p;
        p = p_next;
    }
    sum
}

fn fill_legendre(x: f64, mut p: ArrayViewMut1<f64>) {
    let order = p.len() - 1;
    p[0] = 1.0;
    if order == 0 {
        return;
    }
    p[1] = x;
    for j in 1..order {
        let jf = j as f64;
        p[j + 1] = ((2.0 * jf + 1.0) / (jf + 1.0)) * x * p[j] - (jf / (jf + 1.0)) * p[j - 1];
    }
}

/// Spherical Bessel functions of the first kind `j_0..=j_order` at `z`, shifted by `shift`.
pub fn sph_bessel_j(order: usize, z: impl Into<Complex64>, shift: Shift) -> Array1<Complex64> {
    let window = bessel_j_window(order, z.into());
    select(&window, order, shift)
}

/// Spherical Bessel functions of the second kind `y_0..=y_order` at a real `x`.
pub fn sph_bessel_y(order: usize, x: f64, shift: Shift) -> Array1<f64> {
    let window = bessel_y_window(order, x);
    select(&window, order, shift)
}

/// Spherical Hankel functions of the first kind, `h_l = j_l + i y_l`, at a real `x`.
pub fn sph_hankel(order: usize, x: f64, shift: Shift) -> Array1<Complex64> {
    let window = hankel_window(order, x);
    select(&window, order, shift)
}

/// Derivatives `j_l'(z)` for `l = 0..=order`.
///
/// Combines the shifted sequences as `j_l' = (j_{l-1} - (j_l + z j_{l+1}) / z) / 2`.
pub fn sph_bessel_j_deriv(order: usize, z: impl Into<Complex64>) -> Array1<Complex64> {
    let z = z.into();
    let window = bessel_j_window(order, z);
    derivative(&window, order, z)
}

/// Derivatives `h_l'(x)` for `l = 0..=order`, by the same recurrence as [`sph_bessel_j_deriv`].
pub fn sph_hankel_deriv(order: usize, x: f64) -> Array1<Complex64> {
    let window = hankel_window(order, x);
    derivative(&window, order, Complex64::from(x))
}

/// Spherical Bessel functions of the first kind evaluated elementwise, with a trailing order axis.
pub fn sph_bessel_j_array<S, D, A>(
    order: usize,
    z: &ArrayBase<S, D>,
    shift: Shift,
) -> Array<Complex64, D::Larger>
where
    S: Data<Elem = A>,
    D: Dimension,
    A: Copy + Into<Complex64>,
{
    order_indexed(order, z, |&value, mut lane| {
        let window = bessel_j_window(order, value.into());
        let start = shift.window_start();
        lane.iter_mut()
            .zip(&window[start..])
            .for_each(|(out, v)| *out = *v);
    })
}

/// Spherical Hankel functions of the first kind evaluated elementwise, with a trailing order axis.
pub fn sph_hankel_array<S, D>(order: usize, x: &ArrayBase<S, D>, shift: Shift) -> Array<Complex64, D::Larger>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    order_indexed(order, x, |&value, mut lane| {
        let window = hankel_window(order, value);
        let start = shift.window_start();
        lane.iter_mut()
            .zip(&window[start..])
            .for_each(|(out, v)| *out = *v);
    })
}

/// Allocates `[x-shape..., order + 1]` and fills each order lane from its argument.
fn order_indexed<S, D, A, F>(order: usize, x: &ArrayBase<S, D>, mut fill: F) -> Array<A, D::Larger>
where
    S: Data,
    D: Dimension,
    A: Clone + Default,
    F: FnMut(&S::Elem, ArrayViewMut1<A>),
{
    let axis = x.ndim();
    let mut shape = x.view().insert_axis(Axis(axis)).raw_dim();
    shape[axis] = order + 1;
    let mut out = Array::from_elem(shape, A::default());
    for (lane, value) in out.lanes_mut(Axis(axis)).into_iter().zip(x.iter()) {
        fill(value, lane);
    }
    out
}

fn select<T: Copy>(window: &[T], order: usize, shift: Shift) -> Array1<T> {
    let start = shift.window_start();
    Array1::from(window[start..start + order + 1].to_vec())
}

fn derivative(window: &[Complex64], order: usize, z: Complex64) -> Array1<Complex64> {
    Array1::from_shape_fn(order + 1, |l| {
        0.5 * (window[l] - (window[l + 1] + z * window[l + 2]) / z)
    })
}

/// `j_{-1}..=j_{order+1}` at a complex argument, by Miller's downward recurrence.
///
/// The unnormalised sequence is scaled onto the closed forms of `j_0` or `j_1`,
/// whichever is larger in magnitude at `z`.
fn bessel_j_window(order: usize, z: Complex64) -> Vec<Complex64> {
    let zero = Complex64::new(0.0, 0.0);
    let top = (order + 1).max(1);
    let reach = top.max(z.norm().ceil() as usize);
    let start = reach + 20 + (40.0 * reach as f64).sqrt() as usize;

    let mut values = vec![zero; top + 1];
    let mut next = zero;
    let mut current = Complex64::new(config::RECURRENCE_SEED, 0.0);
    for l in (1..=start).rev() {
        let previous = Complex64::from((2 * l + 1) as f64) / z * current - next;
        next = current;
        current = previous;
        if l - 1 <= top {
            values[l - 1] = current;
        }
        if current.norm() > config::RECURRENCE_RESCALE {
            let scale = 1.0 / config::RECURRENCE_RESCALE;
            current *= scale;
            next *= scale;
            values.iter_mut().skip(l - 1).for_each(|v| *v *= scale);
        }
    }

    let (sin, cos) = (z.sin(), z.cos());
    let j0 = sin / z;
    let j1 = sin / (z * z) - cos / z;
    let norm = if j0.norm() >= j1.norm() {
        scale_onto(j0, values[0])
    } else {
        scale_onto(j1, values[1])
    };

    let mut window = Vec::with_capacity(order + 3);
    window.push(cos / z);
    window.extend(values.iter().take(order + 2).map(|v| v * norm));
    window
}

/// `target / value` without forming `|value|^2`, which overflows for large unnormalised values.
fn scale_onto(target: Complex64, value: Complex64) -> Complex64 {
    let magnitude = value.norm();
    target * (value / magnitude).conj() / magnitude
}

/// `y_{-1}..=y_{order+1}` at a real argument, by upward recurrence.
fn bessel_y_window(order: usize, x: f64) -> Vec<f64> {
    let (sin, cos) = x.sin_cos();
    let mut window = Vec::with_capacity(order + 3);
    window.push(sin / x);
    window.push(-cos / x);
    for l in 0..=order {
        let y = (2 * l + 1) as f64 / x * window[l + 1] - window[l];
        window.push(y);
    }
    window
}

fn hankel_window(order: usize, x: f64) -> Vec<Complex64> {
    let j = bessel_j_window(order, Complex64::from(x));
    let y = bessel_y_window(order, x);
    j.iter()
        .zip(y.iter())
        .map(|(j, y)| Complex64::new(j.re, *y))
        .collect()
}
