//! Mothercode construction: rank bit-channels by reliability and pick the
//! frozen set.
//!
//! Both algorithms track one parameter per channel through the `n` stages of
//! the polarization butterfly, stage 0 being the channel side:
//!
//! * Bhattacharyya bound: log-domain Bhattacharyya parameters, seeded with
//!   `-Eb/N0`.
//! * Gaussian approximation: mean LLR under density evolution, seeded with
//!   `4 Eb/N0`, mapped to a log bit-error estimate at the end.
//!
//! In both cases a larger final metric means a less reliable channel.

use crate::{
    math::{log_q_borjesson, logdomain_diff, logdomain_sum, phi, phi_inv},
    CodeShape, IndexSet, PolarError, PunctureKind,
};
use std::{fmt, str::FromStr};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionType {
    Bhattacharyya,
    GaussianApproximation,
}

impl FromStr for ConstructionType {
    type Err = PolarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bb" | "bhattacharyya" => Ok(Self::Bhattacharyya),
            "ga" | "gaussian" => Ok(Self::GaussianApproximation),
            other => Err(PolarError::Configuration(format!(
                "unknown construction type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ConstructionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bhattacharyya => write!(f, "bb"),
            Self::GaussianApproximation => write!(f, "ga"),
        }
    }
}

/// Result of a construction run. Immutable once built.
#[derive(Debug, Clone)]
pub struct Construction {
    construction_type: ConstructionType,
    /// Least reliable first
    reliabilities: Vec<usize>,
    frozen: IndexSet,
    /// Log-domain error metric per bit-channel
    metric: Vec<f64>,
    fer_estimate: f64,
}

impl Construction {
    fn from_metric(
        construction_type: ConstructionType,
        metric: Vec<f64>,
        k: usize,
    ) -> Result<Self, PolarError> {
        let (reliabilities, frozen) = rank_channels(&metric, k);
        let frozen = IndexSet::new(frozen, metric.len())?;
        let fer_estimate = fer_estimate(&metric, &frozen);

        Ok(Self {
            construction_type,
            reliabilities,
            frozen,
            metric,
            fer_estimate,
        })
    }

    /// Swap in a reconciled frozen set; the estimate follows it.
    pub(crate) fn with_frozen(mut self, frozen: IndexSet) -> Self {
        self.fer_estimate = fer_estimate(&self.metric, &frozen);
        self.frozen = frozen;
        self
    }

    pub fn construction_type(&self) -> ConstructionType {
        self.construction_type
    }
    pub fn reliabilities(&self) -> &[usize] {
        &self.reliabilities
    }
    pub fn frozen(&self) -> &IndexSet {
        &self.frozen
    }
    pub fn metric(&self) -> &[f64] {
        &self.metric
    }
    /// Analytic frame-error estimate for the current frozen set
    pub fn fer_estimate(&self) -> f64 {
        self.fer_estimate
    }
}

/// Construct the mothercode for a design SNR in dB.
pub fn construct(
    shape: &CodeShape,
    design_snr_db: f64,
    construction_type: ConstructionType,
) -> Result<Construction, PolarError> {
    let z0 = initial_state(shape, design_snr_db, construction_type, None);
    let mut metric = channel_metric(construction_type, z0);
    enforce_partial_order(&mut metric);
    let construction = Construction::from_metric(construction_type, metric, shape.k())?;

    debug!(
        n = shape.n(),
        k = shape.k(),
        %construction_type,
        fer_estimate = construction.fer_estimate,
        "constructed mothercode"
    );
    Ok(construction)
}

/// Construct with the rate-matched positions seeded as known (shortening) or
/// erased (puncturing) before running the recursion.
pub fn construct_rate_matched(
    shape: &CodeShape,
    design_snr_db: f64,
    construction_type: ConstructionType,
    punct_set: &IndexSet,
    kind: PunctureKind,
) -> Result<Construction, PolarError> {
    if punct_set.universe() != shape.n() {
        return Err(PolarError::LengthMismatch {
            expected: shape.n(),
            actual: punct_set.universe(),
        });
    }

    let z0 = initial_state(
        shape,
        design_snr_db,
        construction_type,
        Some((punct_set, kind)),
    );
    let metric = channel_metric(construction_type, z0);
    let construction = Construction::from_metric(construction_type, metric, shape.k())?;

    debug!(
        n = shape.n(),
        m = shape.m(),
        k = shape.k(),
        %construction_type,
        ?kind,
        "constructed rate-matched code"
    );
    Ok(construction)
}

fn initial_state(
    shape: &CodeShape,
    design_snr_db: f64,
    construction_type: ConstructionType,
    rate_matched: Option<(&IndexSet, PunctureKind)>,
) -> Vec<f64> {
    let snr = shape.normalised_snr(design_snr_db);
    let (nominal, known, erased) = match construction_type {
        ConstructionType::Bhattacharyya => (-snr, f64::NEG_INFINITY, 0.0),
        ConstructionType::GaussianApproximation => (4.0 * snr, f64::INFINITY, 0.0),
    };

    let mut z0 = vec![nominal; shape.n()];
    if let Some((punct_set, kind)) = rate_matched {
        let seed = match kind {
            PunctureKind::Shorten => known,
            PunctureKind::Puncture => erased,
        };
        for &i in punct_set.indices() {
            z0[i] = seed;
        }
    }
    z0
}

fn channel_metric(construction_type: ConstructionType, z0: Vec<f64>) -> Vec<f64> {
    match construction_type {
        ConstructionType::Bhattacharyya => bhattacharyya_metric(z0),
        ConstructionType::GaussianApproximation => gaussian_metric(z0),
    }
}

/// Raise every channel's metric to the worst metric among the channels whose
/// index bits contain its own.
///
/// The mothercode ordering must extend the polar partial order (a bitwise
/// superset is never less reliable), otherwise BGL patterns are not
/// reciprocal. Ties fall back to the index, which keeps the subset first.
pub fn enforce_partial_order(metric: &mut [f64]) {
    let len = metric.len();
    let mut bit = 1;
    while bit < len {
        for i in 0..len {
            if i & bit == 0 {
                metric[i] = metric[i].max(metric[i | bit]);
            }
        }
        bit <<= 1;
    }
}

/// Apply `combine` to every sibling pair of every butterfly stage, channel
/// side first. `values.len()` must be a power of two.
pub(crate) fn butterfly<T, F>(values: &mut [T], mut combine: F)
where
    T: Copy,
    F: FnMut(T, T) -> (T, T),
{
    let len = values.len();
    let mut block = 2;
    while block <= len {
        let half = block / 2;
        for start in (0..len).step_by(block) {
            for k in start..start + half {
                let (top, bottom) = combine(values[k], values[k + half]);
                values[k] = top;
                values[k + half] = bottom;
            }
        }
        block *= 2;
    }
}

/// Final log-domain Bhattacharyya parameters for initial values `z0`.
///
/// `-∞` marks a position known at the receiver: it hands its sibling's value
/// to the top branch and stays `-∞` on the bottom branch.
pub fn bhattacharyya_metric(mut z0: Vec<f64>) -> Vec<f64> {
    butterfly(&mut z0, |top, bottom| {
        match (top == f64::NEG_INFINITY, bottom == f64::NEG_INFINITY) {
            (true, true) => (f64::NEG_INFINITY, f64::NEG_INFINITY),
            (true, false) => (bottom, f64::NEG_INFINITY),
            (false, true) => (top, f64::NEG_INFINITY),
            (false, false) => (
                logdomain_diff(logdomain_sum(top, bottom), top + bottom),
                top + bottom,
            ),
        }
    });
    z0
}

/// Gaussian-approximation density evolution for initial means `z0`,
/// returning `log Q(0.707 sqrt(z))` per channel.
pub fn gaussian_metric(mut z0: Vec<f64>) -> Vec<f64> {
    butterfly(&mut z0, |top, bottom| {
        // 1 - (1 - a)(1 - b) without the cancellation at large means
        let (a, b) = (phi(top), phi(bottom));
        (phi_inv(a + b - a * b), top + bottom)
    });
    z0.into_iter()
        .map(|z| log_q_borjesson(0.707 * z.sqrt()))
        .collect()
}

/// Reliability ordering (least reliable first) and the `N - K` least
/// reliable channels. Both sorts are stable on the channel index.
fn rank_channels(metric: &[f64], k: usize) -> (Vec<usize>, Vec<usize>) {
    let mut reliabilities: Vec<usize> = (0..metric.len()).collect();
    reliabilities.sort_by(|&a, &b| metric[b].total_cmp(&metric[a]));

    let mut ascending: Vec<usize> = (0..metric.len()).collect();
    ascending.sort_by(|&a, &b| metric[a].total_cmp(&metric[b]));
    let frozen = ascending.split_off(k.min(metric.len()));

    (reliabilities, frozen)
}

/// Frame-error estimate assuming independent errors on the information
/// channels: `1 - prod(1 - p_i)`, accumulated as `FER += p_i (1 - FER)`.
///
/// `p_i = exp(metric_i)` is clamped to `[0, 1]`.
pub fn fer_estimate(metric: &[f64], frozen: &IndexSet) -> f64 {
    let mut fer = 0.0;
    for (i, &m) in metric.iter().enumerate() {
        if frozen.contains(i) {
            continue;
        }
        let p = if m.is_nan() { 1.0 } else { m.exp().clamp(0.0, 1.0) };
        fer += p * (1.0 - fer);
    }
    fer
}

/// Boolean-expression propagation of a coded-domain puncturing lookup
/// (`0` = punctured) through the butterfly: `top = top & bottom`,
/// `bottom = top | bottom`. The result is the uncoded-domain lookup of bits
/// that lose all capacity. For shortening, feed and read back complemented
/// lookups.
pub fn propagate_pattern(punct_lookup: &[u8]) -> Vec<u8> {
    let mut z = punct_lookup.to_vec();
    butterfly(&mut z, |top, bottom| (top & bottom, top | bottom));
    z
}
