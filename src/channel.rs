//! BPSK over additive white Gaussian noise, producing decoder LLRs.
//!
//! Only enough of a channel to drive the decoder with noisy input; the
//! Monte-Carlo loop around it belongs to the caller.

use crate::{CodeShape, PolarError, RateMatchPattern};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Turns a transmitted codeword into channel LLRs (`>= 0` favours bit 0).
pub trait Channel {
    fn transmit(&mut self, codeword: &[u8]) -> Vec<f64>;
}

/// BPSK mapping `1 -> +sqrt(Es)`, `0 -> -sqrt(Es)` with noise of double-sided
/// power `No / 2`.
#[derive(Debug, Clone)]
pub struct AwgnChannel {
    rng: ChaCha8Rng,
    noise: Normal<f64>,
    amplitude: f64,
    noise_power: f64,
}

impl AwgnChannel {
    /// Unit noise power `No = 1` and symbol energy `es` (linear).
    pub fn new(es: f64, seed: u64) -> Result<Self, PolarError> {
        if !(es.is_finite() && es > 0.0) {
            return Err(PolarError::Configuration(format!(
                "symbol energy must be positive, got {}",
                es
            )));
        }

        let noise_power = 1.0;
        let noise = Normal::new(0.0, (noise_power / 2.0f64).sqrt())
            .map_err(|e| PolarError::Configuration(format!("noise distribution: {}", e)))?;

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise,
            amplitude: es.sqrt(),
            noise_power,
        })
    }

    /// Channel at `Eb/N0` in dB, normalised by the code rate `K/M`.
    pub fn for_code(shape: &CodeShape, eb_no_db: f64, seed: u64) -> Result<Self, PolarError> {
        Self::new(shape.normalised_snr(eb_no_db), seed)
    }

    pub fn modulate(&self, codeword: &[u8]) -> Vec<f64> {
        codeword
            .iter()
            .map(|&bit| if bit == 0 { -self.amplitude } else { self.amplitude })
            .collect()
    }

    pub fn llr(&self, y: f64) -> f64 {
        -2.0 * y * self.amplitude / self.noise_power
    }

    /// Transmit and then overwrite the removed positions of `pattern`
    /// (`+∞` when shortened, `0` when punctured).
    pub fn transmit_rate_matched(
        &mut self,
        codeword: &[u8],
        pattern: &RateMatchPattern,
    ) -> Result<Vec<f64>, PolarError> {
        let mut llrs = self.transmit(codeword);
        pattern.apply_to_llrs(&mut llrs)?;
        Ok(llrs)
    }
}

impl Channel for AwgnChannel {
    fn transmit(&mut self, codeword: &[u8]) -> Vec<f64> {
        let tx = self.modulate(codeword);
        let rx: Vec<f64> = tx
            .into_iter()
            .map(|s| s + self.noise.sample(&mut self.rng))
            .collect();
        rx.into_iter().map(|y| self.llr(y)).collect()
    }
}
