use crate::PolarError;

/// Dimensions of a (possibly rate-matched) polar code.
///
/// `N` is the mothercode length, the smallest power of two holding the
/// transmitted length `M`; `s = N - M` positions are shortened or punctured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeShape {
    n_mother: usize,
    n_stages: usize,
    m_length: usize,
    k_message_bits: usize,
}

impl CodeShape {
    /// Validate `(M, K)` and derive the mothercode.
    pub fn new(m_length: usize, k_message_bits: usize) -> Result<Self, PolarError> {
        if m_length == 0 {
            return Err(PolarError::Configuration(
                "block length must be > 0".to_string(),
            ));
        }
        if k_message_bits == 0 {
            return Err(PolarError::Configuration(
                "code dimension must be > 0".to_string(),
            ));
        }
        if k_message_bits > m_length {
            // equivalently s > N - K
            return Err(PolarError::Configuration(format!(
                "Code dimension ({}) is greater than block length ({})",
                k_message_bits, m_length
            )));
        }

        let n_mother = m_length.next_power_of_two();

        Ok(Self {
            n_mother,
            n_stages: n_mother.trailing_zeros() as usize,
            m_length,
            k_message_bits,
        })
    }

    /// Mothercode length `N`
    pub fn n(&self) -> usize {
        self.n_mother
    }
    /// `log2(N)`
    pub fn stages(&self) -> usize {
        self.n_stages
    }
    /// Transmitted length `M`
    pub fn m(&self) -> usize {
        self.m_length
    }
    /// Message bits `K`
    pub fn k(&self) -> usize {
        self.k_message_bits
    }
    /// Shortened or punctured positions `s = N - M`
    pub fn shortened(&self) -> usize {
        self.n_mother - self.m_length
    }
    pub fn frozen_count(&self) -> usize {
        self.n_mother - self.k_message_bits
    }
    pub fn is_rate_matched(&self) -> bool {
        self.m_length != self.n_mother
    }
    pub fn rate(&self) -> f64 {
        (self.k_message_bits as f64) / (self.m_length as f64)
    }

    /// Linear `Eb/N0` scaled by the rate `K/M`, so that message bits carry the
    /// same energy whatever the amount of shortening.
    pub fn normalised_snr(&self, snr_db: f64) -> f64 {
        10f64.powf(snr_db / 10.0) * self.rate()
    }
}
