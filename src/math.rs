//! Numeric kernel shared by construction, shortening and decoding.
//!
//! Everything here is a pure function of its arguments. The log-domain
//! helpers accept infinite operands because shortened positions travel
//! through both the construction recursion and the decoder as `±∞`.

use tracing::trace;

/// Lower end of the bisection bracket used by [`phi_inv`].
pub const PHI_INV_LOWER: f64 = 0.0;
/// Upper end of the bisection bracket used by [`phi_inv`].
pub const PHI_INV_UPPER: f64 = 10_000.0;
/// Absolute tolerance of the [`phi_inv`] bisection.
pub const PHI_INV_TOLERANCE: f64 = 0.01;

const BORJESSON_A: f64 = 0.339;
const BORJESSON_B: f64 = 5.510;

/// `log(e^x + e^y)` pivoting on the larger operand.
pub fn logdomain_sum(x: f64, y: f64) -> f64 {
    let (hi, lo) = if x > y { (x, y) } else { (y, x) };
    if lo == f64::NEG_INFINITY || hi == f64::INFINITY {
        return hi;
    }
    hi + (lo - hi).exp().ln_1p()
}

/// `log(|e^x - e^y|)` pivoting on the larger operand.
///
/// Equal finite operands give `-∞` (the logarithm of zero). Callers that can
/// feed two equal infinities must special-case them first.
pub fn logdomain_diff(x: f64, y: f64) -> f64 {
    let (hi, lo) = if x > y { (x, y) } else { (y, x) };
    if lo == f64::NEG_INFINITY {
        return hi;
    }
    hi + (-(lo - hi).exp()).ln_1p()
}

/// Reverse the `n`-bit binary representation of `x`.
pub fn bit_reversed(x: usize, n: usize) -> usize {
    let mut result = 0;
    for i in 0..n {
        if x & (1 << i) != 0 {
            result |= 1 << (n - 1 - i);
        }
    }
    result
}

/// Permute the bits of an `n`-bit index.
///
/// Output bit `n - 1 - i` takes input bit `p[i]`, so `p = [0, 1, .., n-1]`
/// is the bit reversal and `p = [n-1, .., 0]` the identity.
pub fn bit_perm(x: usize, p: &[usize], n: usize) -> usize {
    let mut result = 0;
    for (i, &src) in p.iter().enumerate().take(n) {
        let bit = (x >> src) & 1;
        result |= bit << (n - 1 - i);
    }
    result
}

/// Check that `p` is a permutation of `0..n`.
pub fn is_bit_permutation(p: &[usize], n: usize) -> bool {
    if p.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &bit in p {
        if bit >= n || seen[bit] {
            return false;
        }
        seen[bit] = true;
    }
    true
}

/// Number of set bits among the low `n` bits of `x`.
pub fn hamming_weight(x: usize, n: usize) -> usize {
    (0..n).filter(|&i| (x >> i) & 1 == 1).count()
}

/// Stable sort of indices by their Hamming weight.
pub fn sort_by_weight(xs: &[usize], n: usize) -> Vec<usize> {
    let mut sorted = xs.to_vec();
    sorted.sort_by_key(|&x| hamming_weight(x, n));
    sorted
}

/// `{0, .., len-1} \ set`, ascending.
pub fn complement(set: &[usize], len: usize) -> Vec<usize> {
    let mut member = vec![false; len];
    for &i in set {
        if i < len {
            member[i] = true;
        }
    }
    (0..len).filter(|&i| !member[i]).collect()
}

/// Elements of `xs` that are not in `ys`, keeping the order of `xs`.
pub fn subtract(xs: &[usize], ys: &[usize]) -> Vec<usize> {
    xs.iter().copied().filter(|x| !ys.contains(x)).collect()
}

/// Mean-update function of the Gaussian approximation.
///
/// `phi(0) = 1` by definition; the curve fit below is only used for
/// strictly positive means.
pub fn phi(x: f64) -> f64 {
    if x <= 0.0 {
        1.0
    } else if x < 10.0 {
        (-0.4527 * x.powf(0.86) + 0.0218).exp()
    } else {
        (std::f64::consts::PI / x).sqrt() * (1.0 - 10.0 / (7.0 * x)) * (-x / 4.0).exp()
    }
}

/// Inverse of [`phi`] by bisection over `[0, 10000]`.
///
/// Returns the last midpoint once the bracket is narrower than
/// [`PHI_INV_TOLERANCE`], or the first midpoint with a zero residual. Targets
/// outside the range of `phi` on the bracket are not an error: the search
/// walks towards the closer end and returns wherever it stops.
pub fn phi_inv(y: f64) -> f64 {
    if y >= 1.0 {
        // phi(0) = 1 and phi < 1 on the rest of the bracket
        return PHI_INV_LOWER;
    }
    bisection(|x| phi(x) - y, PHI_INV_LOWER, PHI_INV_UPPER, PHI_INV_TOLERANCE)
}

fn bisection<F>(residual: F, mut a: f64, mut b: f64, tolerance: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    if residual(a) * residual(b) > 0.0 {
        trace!(a, b, "bisection bracket holds no sign change");
    }

    let mut c = a;
    while b - a >= tolerance {
        c = (a + b) / 2.0;
        let rc = residual(c);
        if rc == 0.0 {
            break;
        }
        if rc * residual(a) < 0.0 {
            b = c;
        } else {
            a = c;
        }
    }
    c
}

/// Börjesson approximation of `log Q(x)`, the log tail probability of a unit
/// Gaussian. Valid for both signs of `x`.
pub fn log_q_borjesson(x: f64) -> f64 {
    let tail = |x: f64| {
        -((1.0 - BORJESSON_A) * x + BORJESSON_A * (BORJESSON_B + x * x).sqrt()).ln()
            - x * x / 2.0
            - 0.5 * (2.0 * std::f64::consts::PI).ln()
    };

    if x < 0.0 {
        (-tail(-x).exp()).ln_1p()
    } else {
        tail(x)
    }
}
