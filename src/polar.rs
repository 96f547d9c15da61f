use crate::{
    construct::{construct, Construction},
    shorten::{rate_match, rate_match_with_pattern, FrozenUpdate, RateMatchPattern, RateMatching},
    AwgnChannel, CodeShape, ConstructionType, EncodingMode, Encoder, IndexSet, PolarError,
    ScDecoder,
};
use std::fmt;
use tracing::debug;

/// Main polar code structure - construction, rate matching, encoding and
/// decoding for one `(M, K)` configuration
///
/// Everything here is fixed once `new` returns, so a code can be shared by
/// reference between threads. Decoding needs mutable working tables: use one
/// [`ScDecoder`] per thread via [`PolarCode::decoder`].
#[derive(Debug, Clone)]
pub struct PolarCode {
    shape: CodeShape,
    design_snr_db: f64,
    construction: Construction,
    rate_matching: Option<RateMatching>,
    pattern: Option<RateMatchPattern>,
    encoder: Encoder,
}

impl PolarCode {
    /// Build a code with block length `m` and `k` message bits.
    ///
    /// A non-power-of-two `m` needs a rate-matching configuration.
    pub fn new(
        m_length: usize,
        k_message_bits: usize,
        design_snr_db: f64,
        construction_type: ConstructionType,
        rate_matching: Option<RateMatching>,
    ) -> Result<Self, PolarError> {
        let shape = CodeShape::new(m_length, k_message_bits)?;

        let (construction, pattern) = match &rate_matching {
            None => {
                if shape.is_rate_matched() {
                    return Err(PolarError::Configuration(format!(
                        "block length {} is not a power of two and no rate matching was given",
                        m_length
                    )));
                }
                (construct(&shape, design_snr_db, construction_type)?, None)
            }
            Some(config) => {
                let (construction, pattern) =
                    rate_match(&shape, design_snr_db, construction_type, config)?;
                (construction, Some(pattern))
            }
        };

        Self::assemble(shape, design_snr_db, construction, rate_matching, pattern)
    }

    /// Build a code from an explicit pattern instead of one of the pattern
    /// algorithms.
    pub fn with_pattern(
        m_length: usize,
        k_message_bits: usize,
        design_snr_db: f64,
        construction_type: ConstructionType,
        pattern: RateMatchPattern,
        frozen_update: FrozenUpdate,
    ) -> Result<Self, PolarError> {
        let shape = CodeShape::new(m_length, k_message_bits)?;
        if pattern.punct_set().universe() != shape.n() {
            return Err(PolarError::LengthMismatch {
                expected: shape.n(),
                actual: pattern.punct_set().universe(),
            });
        }

        let mothercode = construct(&shape, design_snr_db, construction_type)?;
        let (construction, pattern) = rate_match_with_pattern(
            &shape,
            design_snr_db,
            construction_type,
            mothercode,
            pattern,
            frozen_update,
        )?;

        Self::assemble(shape, design_snr_db, construction, None, Some(pattern))
    }

    fn assemble(
        shape: CodeShape,
        design_snr_db: f64,
        construction: Construction,
        rate_matching: Option<RateMatching>,
        pattern: Option<RateMatchPattern>,
    ) -> Result<Self, PolarError> {
        let encoder = Encoder::new(construction.frozen(), EncodingMode::NonSystematic)?;

        debug!(
            n = shape.n(),
            m = shape.m(),
            k = shape.k(),
            design_snr_db,
            fer_estimate = construction.fer_estimate(),
            "polar code ready"
        );

        Ok(Self {
            shape,
            design_snr_db,
            construction,
            rate_matching,
            pattern,
            encoder,
        })
    }

    /// Switch the encoding mode; the systematic transform is built here.
    pub fn with_encoding(mut self, mode: EncodingMode) -> Result<Self, PolarError> {
        self.encoder = Encoder::new(self.construction.frozen(), mode)?;
        Ok(self)
    }

    pub fn shape(&self) -> &CodeShape {
        &self.shape
    }
    pub fn n(&self) -> usize {
        self.shape.n()
    }
    pub fn m(&self) -> usize {
        self.shape.m()
    }
    pub fn k(&self) -> usize {
        self.shape.k()
    }
    pub fn rate(&self) -> f64 {
        self.shape.rate()
    }
    pub fn design_snr_db(&self) -> f64 {
        self.design_snr_db
    }
    pub fn construction(&self) -> &Construction {
        &self.construction
    }
    pub fn construction_type(&self) -> ConstructionType {
        self.construction.construction_type()
    }
    /// Least reliable first
    pub fn reliabilities(&self) -> &[usize] {
        self.construction.reliabilities()
    }
    pub fn frozen(&self) -> &IndexSet {
        self.construction.frozen()
    }
    /// Information positions, ascending
    pub fn information(&self) -> &[usize] {
        self.encoder.information()
    }
    pub fn fer_estimate(&self) -> f64 {
        self.construction.fer_estimate()
    }
    pub fn rate_matching(&self) -> Option<&RateMatching> {
        self.rate_matching.as_ref()
    }
    pub fn pattern(&self) -> Option<&RateMatchPattern> {
        self.pattern.as_ref()
    }
    pub fn encoding_mode(&self) -> EncodingMode {
        self.encoder.mode()
    }
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Fresh decoder for this code's frozen set.
    pub fn decoder(&self) -> Result<ScDecoder, PolarError> {
        ScDecoder::new(self.frozen())
    }

    /// AWGN channel at `Eb/N0` (dB) normalised by this code's rate.
    pub fn channel(&self, eb_no_db: f64, seed: u64) -> Result<AwgnChannel, PolarError> {
        AwgnChannel::for_code(&self.shape, eb_no_db, seed)
    }

    pub fn encode(&self, message: &[u8]) -> Result<Vec<u8>, PolarError> {
        self.encoder.encode(message)
    }

    /// Set the removed positions of channel LLRs to their known values.
    pub fn apply_pattern(&self, llrs: &mut [f64]) -> Result<(), PolarError> {
        match &self.pattern {
            Some(pattern) => pattern.apply_to_llrs(llrs),
            None if llrs.len() == self.n() => Ok(()),
            None => Err(PolarError::LengthMismatch {
                expected: self.n(),
                actual: llrs.len(),
            }),
        }
    }

    /// Decode into the `K` message bits with a caller-owned decoder.
    pub fn decode_with(
        &self,
        decoder: &mut ScDecoder,
        llrs: &[f64],
    ) -> Result<Vec<u8>, PolarError> {
        if !decoder.frozen().same_members(self.frozen()) {
            return Err(PolarError::Configuration(
                "decoder was built for a different frozen set".to_string(),
            ));
        }
        let decoded = decoder.decode_x(llrs)?;
        self.encoder.recover_message(&decoded)
    }

    /// One-shot decode into the `K` message bits.
    pub fn decode(&self, llrs: &[f64]) -> Result<Vec<u8>, PolarError> {
        let mut decoder = self.decoder()?;
        self.decode_with(&mut decoder, llrs)
    }
}

impl fmt::Display for PolarCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "========== Polar Code ==========")?;
        writeln!(f, "N: {}", self.n())?;
        writeln!(f, "M: {}", self.m())?;
        writeln!(f, "K: {}", self.k())?;
        writeln!(f, "Mothercode construction: {}", self.construction_type())?;
        writeln!(f, "Design SNR: {} dB", self.design_snr_db)?;
        writeln!(
            f,
            "Ordered bits (least reliable to most reliable): {:?}",
            self.reliabilities()
        )?;
        writeln!(f, "Frozen bits: {:?}", self.frozen().indices())?;
        writeln!(f, "Encoding: {:?}", self.encoding_mode())?;
        writeln!(f, "Rate matched: {}", self.shape.is_rate_matched())?;
        if let Some(pattern) = &self.pattern {
            writeln!(f, "Puncturing type: {:?}", pattern.kind())?;
            if let Some(config) = &self.rate_matching {
                writeln!(f, "Puncturing algorithm: {:?}", config.algorithm)?;
                writeln!(f, "Frozen update: {:?}", config.frozen_update)?;
            }
            writeln!(f, "Punctured set: {:?}", pattern.punct_set().indices())?;
            writeln!(f, "Source set: {:?}", pattern.source_set().indices())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PatternAlgorithm, PunctureKind};

    #[test]
    fn test_mothercode() {
        let code = PolarCode::new(8, 4, 2.0, ConstructionType::Bhattacharyya, None).unwrap();
        assert_eq!(code.n(), 8);
        assert_eq!(code.frozen().sorted(), vec![0, 1, 2, 4]);
        assert_eq!(code.information(), &[3, 5, 6, 7]);
        assert!(code.pattern().is_none());
        assert!((0.0..=1.0).contains(&code.fer_estimate()));
    }

    #[test]
    fn test_rate_matching_required() {
        assert!(matches!(
            PolarCode::new(6, 3, 2.0, ConstructionType::Bhattacharyya, None),
            Err(PolarError::Configuration(_))
        ));
        assert!(PolarCode::new(6, 7, 2.0, ConstructionType::Bhattacharyya, None).is_err());
    }

    #[test]
    fn test_shortened_code() {
        let code = PolarCode::new(
            6,
            3,
            2.0,
            ConstructionType::Bhattacharyya,
            Some(RateMatching::shorten(PatternAlgorithm::Brs)),
        )
        .unwrap();

        let pattern = code.pattern().unwrap();
        assert_eq!(pattern.punct_set().indices(), &[3, 7]);
        assert_eq!(code.frozen().indices(), &[0, 4, 2, 3, 7]);
        assert!(pattern.source_set().is_subset_of(code.frozen()));

        // shortened coded bits are always zero
        for message in [[1, 1, 1], [1, 0, 1], [0, 1, 0]] {
            let u = code.encode(&message).unwrap();
            assert_eq!(u[3], 0);
            assert_eq!(u[7], 0);
        }
    }

    #[test]
    fn test_explicit_pattern() {
        let pattern =
            RateMatchPattern::new(PunctureKind::Shorten, IndexSet::new(vec![6, 7], 8).unwrap())
                .unwrap();
        let code = PolarCode::with_pattern(
            6,
            3,
            2.0,
            ConstructionType::GaussianApproximation,
            pattern,
            FrozenUpdate::Recompute,
        )
        .unwrap();
        assert_eq!(code.frozen().len(), 5);
        assert!(code.frozen().contains(6) && code.frozen().contains(7));

        let wrong_size =
            RateMatchPattern::new(PunctureKind::Shorten, IndexSet::new(vec![3], 4).unwrap())
                .unwrap();
        assert!(PolarCode::with_pattern(
            6,
            3,
            2.0,
            ConstructionType::Bhattacharyya,
            wrong_size,
            FrozenUpdate::Mothercode,
        )
        .is_err());
    }

    #[test]
    fn test_encode_decode_systematic() {
        let code = PolarCode::new(16, 8, 2.0, ConstructionType::Bhattacharyya, None)
            .unwrap()
            .with_encoding(EncodingMode::Systematic)
            .unwrap();

        let message = [1, 0, 0, 1, 1, 1, 0, 1];
        let u = code.encode(&message).unwrap();
        let llrs: Vec<f64> = u.iter().map(|&b| if b == 0 { 60.0 } else { -60.0 }).collect();
        assert_eq!(code.decode(&llrs).unwrap(), message);
    }

    #[test]
    fn test_decode_with_foreign_decoder() {
        let code = PolarCode::new(8, 4, 2.0, ConstructionType::Bhattacharyya, None).unwrap();
        let other = PolarCode::new(8, 2, 2.0, ConstructionType::Bhattacharyya, None).unwrap();
        let mut decoder = other.decoder().unwrap();
        assert!(code.decode_with(&mut decoder, &[1.0; 8]).is_err());
    }

    #[test]
    fn test_display() {
        let code = PolarCode::new(
            6,
            3,
            2.0,
            ConstructionType::Bhattacharyya,
            Some(RateMatching::puncture(PatternAlgorithm::Wls).recompute()),
        )
        .unwrap();
        let summary = code.to_string();
        assert!(summary.contains("N: 8"));
        assert!(summary.contains("M: 6"));
        assert!(summary.contains("Mothercode construction: bb"));
        assert!(summary.contains("Punctured set"));
        assert!(summary.contains("Recompute"));
    }

    #[test]
    fn test_code_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PolarCode>();
        assert_send_sync::<IndexSet>();
        assert_send_sync::<Encoder>();
    }
}
