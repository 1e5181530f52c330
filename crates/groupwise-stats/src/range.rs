//! Studentized range distribution.
//!
//! `statrs` carries the F and normal distributions but not the studentized
//! range, so the CDF is computed here from its standard double-integral
//! form: the probability that the range of `k` standard normals, divided by
//! an independent pooled-scale estimate on `df` degrees of freedom, stays
//! below `q`. Both integrals use fixed-grid Simpson quadrature; the normal
//! CDF/PDF delegate to `statrs`.

use statrs::function::erf;
use statrs::function::gamma::ln_gamma;
use std::f64::consts::{LN_2, PI, SQRT_2};

const INNER_STEPS: usize = 256;
const OUTER_STEPS: usize = 800;
const Z_LIMIT: f64 = 8.0;

/// Degrees of freedom above this are treated as infinite: the scale
/// estimate is then exact and the outer integral collapses.
const DF_INFINITE: f64 = 1.0e5;

fn norm_cdf(z: f64) -> f64 {
    0.5 * erf::erfc(-z / SQRT_2)
}

fn norm_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

fn simpson(f: impl Fn(f64) -> f64, lo: f64, hi: f64, steps: usize) -> f64 {
    debug_assert!(steps % 2 == 0);
    let h = (hi - lo) / steps as f64;
    let mut acc = f(lo) + f(hi);
    for i in 1..steps {
        let weight = if i % 2 == 0 { 2.0 } else { 4.0 };
        acc += weight * f(lo + h * i as f64);
    }
    acc * h / 3.0
}

/// CDF of the range of `k` independent standard normals at `w`.
///
/// P(R < w) = k ∫ φ(z) (Φ(z) − Φ(z − w))^(k−1) dz, integrating over the
/// position of the maximum.
fn normal_range_cdf(w: f64, k: usize) -> f64 {
    if w <= 0.0 {
        return 0.0;
    }
    let exponent = (k - 1) as i32;
    let integral = simpson(
        |z| norm_pdf(z) * (norm_cdf(z) - norm_cdf(z - w)).powi(exponent),
        -Z_LIMIT,
        Z_LIMIT,
        INNER_STEPS,
    );
    (k as f64 * integral).clamp(0.0, 1.0)
}

/// CDF of the studentized range distribution: P(Q < q) for `k` groups and
/// `df` pooled degrees of freedom.
#[must_use]
pub fn ptukey(q: f64, k: usize, df: f64) -> f64 {
    debug_assert!(k >= 2);
    debug_assert!(df >= 1.0);
    if q <= 0.0 {
        return 0.0;
    }
    if df > DF_INFINITE {
        return normal_range_cdf(q, k);
    }

    // Density of u = sqrt(chi2_df / df): 2 (df/2)^(df/2) u^(df-1) e^(-df u^2 / 2) / Gamma(df/2).
    let half_df = df / 2.0;
    let ln_coeff = LN_2 + half_df * half_df.ln() - ln_gamma(half_df);
    // Scale density mass sits near u = 1 with spread ~ 1/sqrt(2 df).
    let upper = 1.0 + 14.0 / df.sqrt();
    let integral = simpson(
        |u| {
            if u <= 0.0 {
                return 0.0;
            }
            let ln_density = ln_coeff + (df - 1.0) * u.ln() - df * u * u / 2.0;
            ln_density.exp() * normal_range_cdf(q * u, k)
        },
        0.0,
        upper,
        OUTER_STEPS,
    );
    integral.clamp(0.0, 1.0)
}

/// Quantile of the studentized range distribution, by bisection on
/// [`ptukey`]. `p` must lie in (0, 1).
#[must_use]
pub fn qtukey(p: f64, k: usize, df: f64) -> f64 {
    debug_assert!(p > 0.0 && p < 1.0);
    let mut lo = 0.0_f64;
    let mut hi = 16.0_f64;
    while ptukey(hi, k, df) < p && hi < 1.0e4 {
        hi *= 2.0;
    }
    while hi - lo > 1.0e-8 {
        let mid = 0.5 * (lo + hi);
        if ptukey(mid, k, df) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}
