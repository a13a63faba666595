//! Numerical integration.
//!
//! Two flavours are provided:
//!
//! - [`Quadrature::integrate`]: globally adaptive Gauss–Kronrod (7/15 points).
//!   The interval with the largest error estimate is bisected until the total
//!   error satisfies the tolerance. Exhausting the interval budget is reported
//!   as a numerical error rather than returning a silently inaccurate value.
//! - [`gauss_legendre`]: a fixed composite 8-point rule. Used where the
//!   integrand is smooth and bounded by construction (normalization constants,
//!   angular averages) and the caller cannot propagate an error.
//!
//! [`Quadrature::integrate_truncated`] first shrinks the domain with the
//! effective-bound search from [`crate::math::root`], so that long near-zero
//! tails do not eat the interval budget.

use std::cell::RefCell;

use crate::error::AppError;
use crate::math::root::{effective_lower_bound, effective_upper_bound};

/// Kronrod abscissae on `[0, 1]` (symmetric rule, QUADPACK ordering).
const XGK: [f64; 8] = [
    0.991_455_371_120_812_639,
    0.949_107_912_342_758_525,
    0.864_864_423_359_769_073,
    0.741_531_185_599_394_440,
    0.586_087_235_467_691_130,
    0.405_845_151_377_397_167,
    0.207_784_955_007_898_468,
    0.0,
];

const WGK: [f64; 8] = [
    0.022_935_322_010_529_225,
    0.063_092_092_629_978_553,
    0.104_790_010_322_250_184,
    0.140_653_259_715_525_919,
    0.169_004_726_639_267_903,
    0.190_350_578_064_785_410,
    0.204_432_940_075_298_892,
    0.209_482_141_084_727_828,
];

/// Gauss weights for the odd-indexed Kronrod abscissae (7-point rule).
const WG: [f64; 4] = [
    0.129_484_966_168_869_693,
    0.279_705_391_489_276_668,
    0.381_830_050_505_118_945,
    0.417_959_183_673_469_388,
];

const GL8_X: [f64; 4] = [
    0.183_434_642_495_649_805,
    0.525_532_409_916_328_986,
    0.796_666_477_413_626_740,
    0.960_289_856_497_536_232,
];

const GL8_W: [f64; 4] = [
    0.362_683_783_378_361_983,
    0.313_706_645_877_887_287,
    0.222_381_034_453_374_471,
    0.101_228_536_290_376_259,
];

/// Fraction of the integrand's peak below which tails are dropped by
/// [`Quadrature::integrate_truncated`].
pub const DEFAULT_TAIL_CUTOFF: f64 = 1e-4;

/// Adaptive integration settings.
#[derive(Debug, Clone, Copy)]
pub struct Quadrature {
    pub rel_tol: f64,
    pub abs_tol: f64,
    /// Maximum number of subintervals before giving up.
    pub max_intervals: usize,
}

impl Default for Quadrature {
    fn default() -> Self {
        Self {
            rel_tol: 1e-6,
            abs_tol: 0.0,
            max_intervals: 500,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

impl Quadrature {
    pub fn with_rel_tol(rel_tol: f64) -> Self {
        Self {
            rel_tol,
            ..Self::default()
        }
    }

    /// Integrate `f` over `[a, b]`.
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F, a: f64, b: f64) -> Result<f64, AppError> {
        if !(a.is_finite() && b.is_finite()) {
            return Err(AppError::config(format!(
                "Integration bounds must be finite, got [{a}, {b}]."
            )));
        }
        if a == b {
            return Ok(0.0);
        }
        if a > b {
            return self.integrate(f, b, a).map(|v| -v);
        }

        let mut segments = vec![gauss_kronrod(&f, a, b)];
        loop {
            let total: f64 = segments.iter().map(|s| s.value).sum();
            let error: f64 = segments.iter().map(|s| s.error).sum();
            if !total.is_finite() {
                return Err(AppError::numerical(format!(
                    "Non-finite integrand on [{a:e}, {b:e}]."
                )));
            }
            if error <= self.abs_tol.max(self.rel_tol * total.abs()) {
                return Ok(total);
            }
            if segments.len() >= self.max_intervals {
                return Err(AppError::numerical(format!(
                    "Adaptive quadrature on [{a:e}, {b:e}] did not converge: \
                     estimate {total:e} with error {error:e} after {} intervals.",
                    segments.len()
                )));
            }

            let (worst, _) = segments
                .iter()
                .enumerate()
                .fold((0usize, f64::NEG_INFINITY), |acc, (i, s)| {
                    if s.error > acc.1 { (i, s.error) } else { acc }
                });
            let seg = segments.swap_remove(worst);
            let mid = 0.5 * (seg.a + seg.b);
            if mid <= seg.a || mid >= seg.b {
                return Err(AppError::numerical(format!(
                    "Adaptive quadrature exhausted floating-point resolution near {mid:e}."
                )));
            }
            segments.push(gauss_kronrod(&f, seg.a, mid));
            segments.push(gauss_kronrod(&f, mid, seg.b));
        }
    }

    /// Integrate `f` over `[a, b]` after dropping leading and trailing regions
    /// where `|f|` stays below `cutoff` times its sampled peak.
    pub fn integrate_truncated<F: Fn(f64) -> f64>(
        &self,
        f: F,
        a: f64,
        b: f64,
        cutoff: f64,
    ) -> Result<f64, AppError> {
        if a >= b {
            return self.integrate(f, a, b);
        }
        let lo = effective_lower_bound(&f, a, b, cutoff)?;
        let hi = effective_upper_bound(&f, lo, b, cutoff)?;
        if hi <= lo {
            return Ok(0.0);
        }
        self.integrate(f, lo, hi)
    }
}

impl Quadrature {
    /// [`Quadrature::integrate`] for integrands that can fail; the first
    /// error raised by `f` is returned instead of the integral.
    pub fn try_integrate<F: Fn(f64) -> Result<f64, AppError>>(&self, f: F, a: f64, b: f64) -> Result<f64, AppError> {
        let failure = RefCell::new(None);
        let value = self.integrate(|x| capture(&f, x, &failure), a, b);
        match failure.into_inner() {
            Some(err) => Err(err),
            None => value,
        }
    }

    /// [`Quadrature::integrate_truncated`] for integrands that can fail.
    pub fn try_integrate_truncated<F: Fn(f64) -> Result<f64, AppError>>(
        &self,
        f: F,
        a: f64,
        b: f64,
        cutoff: f64,
    ) -> Result<f64, AppError> {
        let failure = RefCell::new(None);
        let value = self.integrate_truncated(|x| capture(&f, x, &failure), a, b, cutoff);
        match failure.into_inner() {
            Some(err) => Err(err),
            None => value,
        }
    }
}

fn capture<F: Fn(f64) -> Result<f64, AppError>>(f: &F, x: f64, failure: &RefCell<Option<AppError>>) -> f64 {
    match f(x) {
        Ok(v) => v,
        Err(err) => {
            failure.borrow_mut().get_or_insert(err);
            0.0
        }
    }
}

fn gauss_kronrod<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> Segment {
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let fc = f(center);
    let mut kronrod = WGK[7] * fc;
    let mut gauss = WG[3] * fc;

    for j in 0..7 {
        let dx = half * XGK[j];
        let sum = f(center - dx) + f(center + dx);
        kronrod += WGK[j] * sum;
        if j % 2 == 1 {
            gauss += WG[j / 2] * sum;
        }
    }

    Segment {
        a,
        b,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    }
}

/// Fixed composite 8-point Gauss–Legendre rule with `panels` equal panels.
pub fn gauss_legendre<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, panels: usize) -> f64 {
    if a == b {
        return 0.0;
    }
    gauss_legendre_rule(a, b, panels)
        .into_iter()
        .map(|(x, w)| w * f(x))
        .sum()
}

/// Abscissae and weights of [`gauss_legendre`] on `[a, b]`, for callers that
/// need several moments of one expensive integrand.
pub fn gauss_legendre_rule(a: f64, b: f64, panels: usize) -> Vec<(f64, f64)> {
    let panels = panels.max(1);
    let width = (b - a) / panels as f64;
    let half = 0.5 * width;

    let mut rule = Vec::with_capacity(8 * panels);
    for p in 0..panels {
        let center = a + (p as f64 + 0.5) * width;
        for k in 0..4 {
            let dx = half * GL8_X[k];
            rule.push((center - dx, GL8_W[k] * half));
            rule.push((center + dx, GL8_W[k] * half));
        }
    }
    rule
}
