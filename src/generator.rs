//! Arikan generator matrix and the systematic pre-transform.

use crate::{IndexSet, Mod2Dense, PolarError};

/// `F_n`: the `n`-th Kronecker power of the kernel `[[1, 1], [0, 1]]`.
///
/// Entry `(i, j)` is one exactly when the bits of `i` are a subset of the
/// bits of `j`. The matrix is an involution over GF(2), which is what makes
/// the encoder its own inverse.
pub fn arikan_matrix(n: usize) -> Result<Mod2Dense, PolarError> {
    let mut kernel = Mod2Dense::allocate(2, 2)?;
    kernel.set(0, 0, true)?;
    kernel.set(0, 1, true)?;
    kernel.set(1, 1, true)?;

    let mut f = Mod2Dense::identity(1)?;
    for _ in 0..n {
        f = Mod2Dense::kronecker(&kernel, &f)?;
    }
    Ok(f)
}

/// Precomputed matrices for systematic encoding.
///
/// `T` is the identity with the information rows replaced by the matching
/// rows of `F_n`. Encoding is `u = F_n · (T · x)`; the message then shows up
/// unchanged on the information positions of `u` for frozen sets that are
/// closed under the polar partial order, which includes every set produced
/// by the Bhattacharyya and Gaussian-approximation constructions.
#[derive(Debug, Clone)]
pub struct SystematicTransform {
    f: Mod2Dense,
    t: Mod2Dense,
}

impl SystematicTransform {
    pub fn new(frozen: &IndexSet) -> Result<Self, PolarError> {
        let len = frozen.universe();
        if !len.is_power_of_two() {
            return Err(PolarError::Configuration(format!(
                "block length {} is not a power of two",
                len
            )));
        }

        let f = arikan_matrix(len.trailing_zeros() as usize)?;
        let mut t = Mod2Dense::identity(len)?;
        for info in frozen.complement() {
            t.copy_row_from(info, &f, info)?;
        }

        Ok(Self { f, t })
    }

    pub fn generator(&self) -> &Mod2Dense {
        &self.f
    }

    pub fn transform(&self) -> &Mod2Dense {
        &self.t
    }

    /// `u = F_n · (T · x) mod 2`
    pub fn encode(&self, x: &[u8]) -> Result<Vec<u8>, PolarError> {
        let v = self.t.mul_vec(x)?;
        Ok(self.f.mul_vec(&v)?)
    }

    /// `F_n · x mod 2`
    pub fn apply_generator(&self, x: &[u8]) -> Result<Vec<u8>, PolarError> {
        Ok(self.f.mul_vec(x)?)
    }
}
