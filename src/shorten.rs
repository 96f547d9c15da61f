//! Shortening and puncturing patterns for non-power-of-two block lengths.
//!
//! Patterns supported: Wang-Liu (WLS), bit-reversal (BRS),
//! Bioglio-Gabry-Land (BGL) and permuted WLS. They are all reciprocal: the
//! uncoded positions that lose their capacity are exactly the coded
//! positions removed at the channel. The frozen set is then reconciled so
//! that those positions are always frozen.

use crate::{
    construct::{construct, construct_rate_matched, propagate_pattern, Construction},
    math::{bit_perm, bit_reversed, is_bit_permutation},
    CodeShape, ConstructionType, IndexSet, PolarError,
};
use std::str::FromStr;
use tracing::debug;

/// How the removed coded bits reach the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunctureKind {
    /// Known zeros, never transmitted; LLR `+∞`
    Shorten,
    /// Unknown, never transmitted; LLR `0`
    Puncture,
}

impl PunctureKind {
    /// LLR the channel reports for a removed position.
    pub fn channel_llr(&self) -> f64 {
        match self {
            Self::Shorten => f64::INFINITY,
            Self::Puncture => 0.0,
        }
    }
}

impl FromStr for PunctureKind {
    type Err = PolarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shorten" => Ok(Self::Shorten),
            "punct" | "puncture" => Ok(Self::Puncture),
            other => Err(PolarError::Configuration(format!(
                "unknown puncturing type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternAlgorithm {
    /// The last `s` indices
    Wls,
    /// Bit reversal of the WLS indices
    Brs,
    /// Last `s` entries of the bit-reversed reliability ordering
    Bgl,
    /// WLS indices under a bit permutation of `0..n`
    PermutedWls(Vec<usize>),
}

impl FromStr for PatternAlgorithm {
    type Err = PolarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wls" => Ok(Self::Wls),
            "brs" => Ok(Self::Brs),
            "bgl" => Ok(Self::Bgl),
            "perm" => Err(PolarError::Configuration(
                "permuted WLS needs a bit permutation".to_string(),
            )),
            other => Err(PolarError::Configuration(format!(
                "unknown puncturing algorithm: {}",
                other
            ))),
        }
    }
}

/// Which reliabilities feed the frozen-set reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrozenUpdate {
    /// Keep the mothercode ordering
    #[default]
    Mothercode,
    /// Rerun the construction with the removed positions seeded
    Recompute,
}

/// Rate-matching configuration resolved once per code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateMatching {
    pub kind: PunctureKind,
    pub algorithm: PatternAlgorithm,
    pub frozen_update: FrozenUpdate,
}

impl RateMatching {
    pub fn shorten(algorithm: PatternAlgorithm) -> Self {
        Self {
            kind: PunctureKind::Shorten,
            algorithm,
            frozen_update: FrozenUpdate::Mothercode,
        }
    }

    pub fn puncture(algorithm: PatternAlgorithm) -> Self {
        Self {
            kind: PunctureKind::Puncture,
            algorithm,
            frozen_update: FrozenUpdate::Mothercode,
        }
    }

    pub fn recompute(mut self) -> Self {
        self.frozen_update = FrozenUpdate::Recompute;
        self
    }
}

/// Coded-domain punctured set and the matching uncoded-domain source set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateMatchPattern {
    kind: PunctureKind,
    punct_set: IndexSet,
    source_set: IndexSet,
}

impl RateMatchPattern {
    /// Derive the source set of `punct_set` and insist that it is
    /// reciprocal.
    pub fn new(kind: PunctureKind, punct_set: IndexSet) -> Result<Self, PolarError> {
        let source_set = source_set(&punct_set, kind)?;
        Self::with_source_set(kind, punct_set, source_set)
    }

    /// Pair explicit punctured and source sets.
    pub fn with_source_set(
        kind: PunctureKind,
        punct_set: IndexSet,
        source_set: IndexSet,
    ) -> Result<Self, PolarError> {
        if !punct_set.same_members(&source_set) {
            return Err(PolarError::ReciprocityViolation {
                punct_set: punct_set.sorted(),
                source_set: source_set.sorted(),
            });
        }

        Ok(Self {
            kind,
            punct_set,
            source_set,
        })
    }

    pub fn kind(&self) -> PunctureKind {
        self.kind
    }
    pub fn punct_set(&self) -> &IndexSet {
        &self.punct_set
    }
    pub fn source_set(&self) -> &IndexSet {
        &self.source_set
    }
    pub fn is_reciprocal(&self) -> bool {
        self.punct_set.same_members(&self.source_set)
    }

    /// Overwrite the removed positions of `llrs` with the channel convention
    /// for this kind of pattern.
    pub fn apply_to_llrs(&self, llrs: &mut [f64]) -> Result<(), PolarError> {
        if llrs.len() != self.punct_set.universe() {
            return Err(PolarError::LengthMismatch {
                expected: self.punct_set.universe(),
                actual: llrs.len(),
            });
        }
        let llr = self.kind.channel_llr();
        for &i in self.punct_set.indices() {
            llrs[i] = llr;
        }
        Ok(())
    }
}

/// Uncoded-domain set of bits that lose all capacity when `punct_set` is
/// removed at the channel.
pub fn source_set(punct_set: &IndexSet, kind: PunctureKind) -> Result<IndexSet, PolarError> {
    let len = punct_set.universe();
    if !len.is_power_of_two() {
        return Err(PolarError::Configuration(format!(
            "block length {} is not a power of two",
            len
        )));
    }

    let lookup = match kind {
        PunctureKind::Puncture => propagate_pattern(punct_set.lookup()),
        PunctureKind::Shorten => {
            let flipped: Vec<u8> = punct_set.lookup().iter().map(|&v| v ^ 1).collect();
            propagate_pattern(&flipped).into_iter().map(|v| v ^ 1).collect()
        }
    };
    Ok(IndexSet::from_lookup(&lookup))
}

/// Coded-domain indices selected by `algorithm`, before reciprocity checks.
///
/// Puncturing uses the mirror image `N - 1 - i` of the shortening pattern.
pub fn pattern_indices(
    shape: &CodeShape,
    reliabilities: &[usize],
    algorithm: &PatternAlgorithm,
    kind: PunctureKind,
) -> Result<Vec<usize>, PolarError> {
    let n = shape.n();
    let stages = shape.stages();
    let s = shape.shortened();
    let wls = n - s..n;

    let indices: Vec<usize> = match algorithm {
        PatternAlgorithm::Wls => wls.collect(),
        PatternAlgorithm::Brs => wls.map(|i| bit_reversed(i, stages)).collect(),
        PatternAlgorithm::Bgl => {
            if reliabilities.len() != n {
                return Err(PolarError::LengthMismatch {
                    expected: n,
                    actual: reliabilities.len(),
                });
            }
            let reversed: Vec<usize> = reliabilities
                .iter()
                .map(|&i| bit_reversed(i, stages))
                .collect();
            reversed[n - s..].to_vec()
        }
        PatternAlgorithm::PermutedWls(p) => {
            if !is_bit_permutation(p, stages) {
                return Err(PolarError::Configuration(format!(
                    "{:?} is not a permutation of 0..{}",
                    p, stages
                )));
            }
            wls.map(|i| bit_perm(i, p, stages)).collect()
        }
    };

    Ok(match kind {
        PunctureKind::Shorten => indices,
        PunctureKind::Puncture => indices.into_iter().map(|i| n - 1 - i).collect(),
    })
}

/// Build the pattern for `algorithm` from a reliability ordering.
pub fn generate_pattern(
    shape: &CodeShape,
    reliabilities: &[usize],
    algorithm: &PatternAlgorithm,
    kind: PunctureKind,
) -> Result<RateMatchPattern, PolarError> {
    let indices = pattern_indices(shape, reliabilities, algorithm, kind)?;
    let pattern = RateMatchPattern::new(kind, IndexSet::new(indices, shape.n())?)?;

    debug!(
        ?algorithm,
        ?kind,
        punct_set = ?pattern.punct_set().indices(),
        "generated rate-matching pattern"
    );
    Ok(pattern)
}

/// Frozen set forced by a pattern: the `M - K` least reliable channels
/// outside the source set, followed by the source set itself.
pub fn frozen_from_pattern(
    shape: &CodeShape,
    reliabilities: &[usize],
    pattern: &RateMatchPattern,
) -> Result<IndexSet, PolarError> {
    if !pattern.is_reciprocal() {
        return Err(PolarError::ReciprocityViolation {
            punct_set: pattern.punct_set().sorted(),
            source_set: pattern.source_set().sorted(),
        });
    }
    if reliabilities.len() != shape.n() {
        return Err(PolarError::LengthMismatch {
            expected: shape.n(),
            actual: reliabilities.len(),
        });
    }
    let source = pattern.source_set();
    if source.len() != shape.shortened() {
        return Err(PolarError::Configuration(format!(
            "pattern removes {} positions, block length {} needs {}",
            source.len(),
            shape.m(),
            shape.shortened()
        )));
    }

    let mut frozen: Vec<usize> = reliabilities
        .iter()
        .copied()
        .filter(|&i| !source.contains(i))
        .take(shape.m() - shape.k())
        .collect();
    frozen.extend_from_slice(source.indices());

    IndexSet::new(frozen, shape.n())
}

/// Full rate-matched construction: mothercode, pattern, optional
/// reconstruction with the pattern seeded, then reconciliation.
pub fn rate_match(
    shape: &CodeShape,
    design_snr_db: f64,
    construction_type: ConstructionType,
    rate_matching: &RateMatching,
) -> Result<(Construction, RateMatchPattern), PolarError> {
    let mothercode = construct(shape, design_snr_db, construction_type)?;
    let pattern = generate_pattern(
        shape,
        mothercode.reliabilities(),
        &rate_matching.algorithm,
        rate_matching.kind,
    )?;

    rate_match_with_pattern(
        shape,
        design_snr_db,
        construction_type,
        mothercode,
        pattern,
        rate_matching.frozen_update,
    )
}

/// Reconcile an existing mothercode construction with a given pattern.
pub fn rate_match_with_pattern(
    shape: &CodeShape,
    design_snr_db: f64,
    construction_type: ConstructionType,
    mothercode: Construction,
    pattern: RateMatchPattern,
    frozen_update: FrozenUpdate,
) -> Result<(Construction, RateMatchPattern), PolarError> {
    let construction = match frozen_update {
        FrozenUpdate::Mothercode => mothercode,
        FrozenUpdate::Recompute => construct_rate_matched(
            shape,
            design_snr_db,
            construction_type,
            pattern.punct_set(),
            pattern.kind(),
        )?,
    };

    let frozen = frozen_from_pattern(shape, construction.reliabilities(), &pattern)?;
    let construction = construction.with_frozen(frozen);

    debug!(
        frozen = ?construction.frozen().indices(),
        fer_estimate = construction.fer_estimate(),
        "reconciled frozen set with pattern"
    );
    Ok((construction, pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mother_order(shape: &CodeShape) -> Vec<usize> {
        construct(shape, 2.0, ConstructionType::Bhattacharyya)
            .unwrap()
            .reliabilities()
            .to_vec()
    }

    #[test]
    fn test_wls_and_brs_n8() {
        let shape = CodeShape::new(6, 3).unwrap();
        let order = mother_order(&shape);

        let wls = pattern_indices(&shape, &order, &PatternAlgorithm::Wls, PunctureKind::Shorten)
            .unwrap();
        assert_eq!(wls, vec![6, 7]);

        let brs = pattern_indices(&shape, &order, &PatternAlgorithm::Brs, PunctureKind::Shorten)
            .unwrap();
        assert_eq!(brs, vec![3, 7]);
    }

    #[test]
    fn test_bgl_n8() {
        let shape = CodeShape::new(6, 3).unwrap();
        let order = mother_order(&shape);
        assert_eq!(order, vec![0, 4, 2, 1, 6, 5, 3, 7]);

        let bgl = pattern_indices(&shape, &order, &PatternAlgorithm::Bgl, PunctureKind::Shorten)
            .unwrap();
        assert_eq!(bgl, vec![6, 7]);
    }

    #[test]
    fn test_permuted_wls() {
        let shape = CodeShape::new(6, 3).unwrap();
        let order = mother_order(&shape);

        // [0, 1, 2] is the bit reversal, so this is BRS
        let perm = PatternAlgorithm::PermutedWls(vec![0, 1, 2]);
        let indices = pattern_indices(&shape, &order, &perm, PunctureKind::Shorten).unwrap();
        assert_eq!(indices, vec![3, 7]);

        // [2, 1, 0] is the identity, so this is WLS
        let perm = PatternAlgorithm::PermutedWls(vec![2, 1, 0]);
        let indices = pattern_indices(&shape, &order, &perm, PunctureKind::Shorten).unwrap();
        assert_eq!(indices, vec![6, 7]);

        let bad = PatternAlgorithm::PermutedWls(vec![0, 0, 1]);
        assert!(matches!(
            pattern_indices(&shape, &order, &bad, PunctureKind::Shorten),
            Err(PolarError::Configuration(_))
        ));
    }

    #[test]
    fn test_puncture_patterns_mirror_shortening() {
        let shape = CodeShape::new(6, 3).unwrap();
        let order = mother_order(&shape);

        let wls = pattern_indices(&shape, &order, &PatternAlgorithm::Wls, PunctureKind::Puncture)
            .unwrap();
        assert_eq!(wls, vec![1, 0]);

        let brs = pattern_indices(&shape, &order, &PatternAlgorithm::Brs, PunctureKind::Puncture)
            .unwrap();
        assert_eq!(brs, vec![4, 0]);
    }

    #[test]
    fn test_all_patterns_are_reciprocal() {
        for m in 17..=32 {
            for k in [1, m / 2, m] {
                let shape = CodeShape::new(m, k).unwrap();
                let order = mother_order(&shape);
                let algorithms = [
                    PatternAlgorithm::Wls,
                    PatternAlgorithm::Brs,
                    PatternAlgorithm::Bgl,
                    PatternAlgorithm::PermutedWls(vec![3, 0, 4, 1, 2]),
                ];
                for algorithm in &algorithms {
                    for kind in [PunctureKind::Shorten, PunctureKind::Puncture] {
                        let pattern = generate_pattern(&shape, &order, algorithm, kind)
                            .unwrap_or_else(|e| panic!("{:?} {:?} M={}: {}", algorithm, kind, m, e));
                        assert_eq!(pattern.punct_set().len(), shape.shortened());
                        assert!(pattern.is_reciprocal());
                    }
                }
            }
        }
    }

    #[test]
    fn test_source_set_derivation() {
        // puncturing the last coded bit disables uncoded bit 0, not bit 3
        let punct = IndexSet::new(vec![3], 4).unwrap();
        let source = source_set(&punct, PunctureKind::Puncture).unwrap();
        assert_eq!(source.indices(), &[0]);

        let shortened = source_set(&punct, PunctureKind::Shorten).unwrap();
        assert_eq!(shortened.indices(), &[3]);
    }

    #[test]
    fn test_reciprocity_violation() {
        let punct = IndexSet::new(vec![3], 4).unwrap();
        assert!(matches!(
            RateMatchPattern::new(PunctureKind::Puncture, punct.clone()),
            Err(PolarError::ReciprocityViolation { .. })
        ));

        let other = IndexSet::new(vec![2], 4).unwrap();
        assert!(matches!(
            RateMatchPattern::with_source_set(PunctureKind::Shorten, punct.clone(), other),
            Err(PolarError::ReciprocityViolation { .. })
        ));

        // same members in another order is still reciprocal
        let punct = IndexSet::new(vec![7, 3], 8).unwrap();
        let source = IndexSet::new(vec![3, 7], 8).unwrap();
        assert!(RateMatchPattern::with_source_set(PunctureKind::Shorten, punct, source).is_ok());
    }

    #[test]
    fn test_frozen_from_pattern() {
        let shape = CodeShape::new(6, 3).unwrap();
        let order = mother_order(&shape);
        let pattern = generate_pattern(&shape, &order, &PatternAlgorithm::Brs, PunctureKind::Shorten)
            .unwrap();

        let frozen = frozen_from_pattern(&shape, &order, &pattern).unwrap();
        assert_eq!(frozen.indices(), &[0, 4, 2, 3, 7]);
        assert_eq!(frozen.len(), shape.frozen_count());
        assert!(pattern.source_set().is_subset_of(&frozen));
    }

    #[test]
    fn test_frozen_from_pattern_wrong_size() {
        let shape = CodeShape::new(6, 3).unwrap();
        let order = mother_order(&shape);
        let pattern =
            RateMatchPattern::new(PunctureKind::Shorten, IndexSet::new(vec![7], 8).unwrap())
                .unwrap();
        assert!(frozen_from_pattern(&shape, &order, &pattern).is_err());
    }

    #[test]
    fn test_rate_match_recompute() {
        let shape = CodeShape::new(6, 3).unwrap();
        for construction_type in [
            ConstructionType::Bhattacharyya,
            ConstructionType::GaussianApproximation,
        ] {
            let config = RateMatching::shorten(PatternAlgorithm::Brs).recompute();
            let (construction, pattern) =
                rate_match(&shape, 2.0, construction_type, &config).unwrap();

            assert_eq!(pattern.punct_set().indices(), &[3, 7]);
            assert_eq!(construction.frozen().indices(), &[0, 4, 2, 3, 7]);
            // a known bit at the bottom of every butterfly stays known
            assert_eq!(construction.metric()[7], f64::NEG_INFINITY);
            assert_eq!(construction.reliabilities().last(), Some(&7));
        }
    }

    #[test]
    fn test_gaussian_bgl_reciprocal_at_n512() {
        for snr in [-5.0, -2.0, 0.0, 2.0, 5.0, 10.0] {
            for m in [257, 384, 500, 511] {
                for k in [1, m / 4, m / 2, 3 * m / 4, m] {
                    let shape = CodeShape::new(m, k).unwrap();
                    for kind in [PunctureKind::Shorten, PunctureKind::Puncture] {
                        let config = RateMatching {
                            kind,
                            algorithm: PatternAlgorithm::Bgl,
                            frozen_update: FrozenUpdate::Mothercode,
                        };
                        let (construction, pattern) =
                            rate_match(&shape, snr, ConstructionType::GaussianApproximation, &config)
                                .unwrap_or_else(|e| {
                                    panic!("{:?} M={} K={} at {} dB: {}", kind, m, k, snr, e)
                                });
                        assert_eq!(pattern.punct_set().len(), 512 - m);
                        assert!(pattern.source_set().is_subset_of(construction.frozen()));
                    }
                }
            }
        }

        let config = RateMatching::shorten(PatternAlgorithm::Bgl).recompute();
        let shape = CodeShape::new(500, 250).unwrap();
        assert!(rate_match(&shape, 2.0, ConstructionType::GaussianApproximation, &config).is_ok());
    }

    #[test]
    fn test_rate_match_unshortened() {
        let shape = CodeShape::new(16, 8).unwrap();
        let (construction, pattern) = rate_match(
            &shape,
            2.0,
            ConstructionType::Bhattacharyya,
            &RateMatching::shorten(PatternAlgorithm::Wls),
        )
        .unwrap();
        assert!(pattern.punct_set().is_empty());
        assert_eq!(construction.frozen().sorted(), vec![0, 1, 2, 4, 6, 8, 10, 12]);
    }

    #[test]
    fn test_apply_to_llrs() {
        let punct = IndexSet::new(vec![3, 7], 8).unwrap();
        let pattern = RateMatchPattern::new(PunctureKind::Shorten, punct).unwrap();
        let mut llrs = vec![1.5; 8];
        pattern.apply_to_llrs(&mut llrs).unwrap();
        assert_eq!(llrs[3], f64::INFINITY);
        assert_eq!(llrs[7], f64::INFINITY);
        assert_eq!(llrs[0], 1.5);

        assert!(pattern.apply_to_llrs(&mut [0.0; 4]).is_err());
    }

    #[test]
    fn test_parsing() {
        assert_eq!("brs".parse::<PatternAlgorithm>().unwrap(), PatternAlgorithm::Brs);
        assert!("perm".parse::<PatternAlgorithm>().is_err());
        assert!("qup".parse::<PatternAlgorithm>().is_err());
        assert_eq!("punct".parse::<PunctureKind>().unwrap(), PunctureKind::Puncture);
        assert_eq!("shorten".parse::<PunctureKind>().unwrap(), PunctureKind::Shorten);
    }
}
