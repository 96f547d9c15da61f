use crate::{IndexSet, PolarError, SystematicTransform};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingMode {
    #[default]
    NonSystematic,
    Systematic,
}

impl FromStr for EncodingMode {
    type Err = PolarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nonsystematic" | "non-systematic" | "nonsys" => Ok(Self::NonSystematic),
            "systematic" | "sys" => Ok(Self::Systematic),
            other => Err(PolarError::Configuration(format!(
                "unknown encoding mode: {}",
                other
            ))),
        }
    }
}

/// In-place polar transform `u = x · F_n`.
///
/// Partitions halve from the full length down to 2 and the left half of
/// each partition absorbs the right half. The transform is its own inverse.
pub fn polar_transform(bits: &mut [u8]) -> Result<(), PolarError> {
    check_power_of_two(bits.len())?;

    let mut partition = bits.len();
    while partition > 1 {
        let half = partition / 2;
        for start in (0..bits.len()).step_by(partition) {
            for k in start..start + half {
                bits[k] ^= bits[k + half];
            }
        }
        partition = half;
    }
    Ok(())
}

/// Same transform written as the recursion `[a ^ b, b]` over the two
/// halves.
pub fn polar_transform_recursive(bits: &[u8]) -> Result<Vec<u8>, PolarError> {
    check_power_of_two(bits.len())?;
    Ok(transform_halves(bits))
}

fn transform_halves(bits: &[u8]) -> Vec<u8> {
    if bits.len() == 1 {
        return bits.to_vec();
    }

    let half = bits.len() / 2;
    let mut upper = transform_halves(&bits[..half]);
    let lower = transform_halves(&bits[half..]);
    for (a, b) in upper.iter_mut().zip(&lower) {
        *a ^= b;
    }
    upper.extend(lower);
    upper
}

fn check_power_of_two(len: usize) -> Result<(), PolarError> {
    if len.is_power_of_two() {
        Ok(())
    } else {
        Err(PolarError::Configuration(format!(
            "block length {} is not a power of two",
            len
        )))
    }
}

/// Spread `K` message bits over the information positions of `frozen`
/// (ascending), zeros elsewhere.
pub fn message_to_x(message: &[u8], frozen: &IndexSet) -> Result<Vec<u8>, PolarError> {
    let information = frozen.complement();
    if message.len() != information.len() {
        return Err(PolarError::LengthMismatch {
            expected: information.len(),
            actual: message.len(),
        });
    }

    let mut x = vec![0u8; frozen.universe()];
    for (&i, &bit) in information.iter().zip(message) {
        x[i] = bit & 1;
    }
    Ok(x)
}

/// Encoder bound to one frozen set.
///
/// The systematic transform is built once here and reused for every block.
#[derive(Debug, Clone)]
pub struct Encoder {
    frozen: IndexSet,
    information: Vec<usize>,
    mode: EncodingMode,
    systematic: Option<SystematicTransform>,
}

impl Encoder {
    pub fn new(frozen: &IndexSet, mode: EncodingMode) -> Result<Self, PolarError> {
        check_power_of_two(frozen.universe())?;

        let systematic = match mode {
            EncodingMode::NonSystematic => None,
            EncodingMode::Systematic => Some(SystematicTransform::new(frozen)?),
        };

        Ok(Self {
            frozen: frozen.clone(),
            information: frozen.complement(),
            mode,
            systematic,
        })
    }

    pub fn mode(&self) -> EncodingMode {
        self.mode
    }
    pub fn frozen(&self) -> &IndexSet {
        &self.frozen
    }
    pub fn information(&self) -> &[usize] {
        &self.information
    }

    /// Encode `K` message bits into a length-`N` codeword.
    pub fn encode(&self, message: &[u8]) -> Result<Vec<u8>, PolarError> {
        let x = message_to_x(message, &self.frozen)?;
        self.encode_x(&x)
    }

    /// Encode a full uncoded vector whose frozen positions are zero.
    pub fn encode_x(&self, x: &[u8]) -> Result<Vec<u8>, PolarError> {
        if x.len() != self.frozen.universe() {
            return Err(PolarError::LengthMismatch {
                expected: self.frozen.universe(),
                actual: x.len(),
            });
        }

        match &self.systematic {
            None => {
                let mut u = x.to_vec();
                polar_transform(&mut u)?;
                Ok(u)
            }
            Some(transform) => transform.encode(x),
        }
    }

    /// Message carried by a decoded uncoded vector `x̂` (length `N`).
    ///
    /// Non-systematic codes read the information positions directly.
    /// Systematic codes re-encode `x̂` first, since the message sits on the
    /// information positions of the codeword.
    pub fn recover_message(&self, decoded: &[u8]) -> Result<Vec<u8>, PolarError> {
        if decoded.len() != self.frozen.universe() {
            return Err(PolarError::LengthMismatch {
                expected: self.frozen.universe(),
                actual: decoded.len(),
            });
        }

        let source = match &self.systematic {
            None => decoded.to_vec(),
            Some(transform) => transform.apply_generator(decoded)?,
        };
        Ok(self.information.iter().map(|&i| source[i]).collect())
    }
}

/// One-shot encode of `K` message bits.
pub fn encode(
    message: &[u8],
    frozen: &IndexSet,
    mode: EncodingMode,
) -> Result<Vec<u8>, PolarError> {
    Encoder::new(frozen, mode)?.encode(message)
}
