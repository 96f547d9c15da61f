use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DenseError {
    #[error("Invalid matrix dimensions")]
    InvalidDimensions,
    #[error("Index out of bounds")]
    IndexOutOfBounds,
    #[error("Vector length {actual} doesn't match matrix width {expected}")]
    VectorLength { expected: usize, actual: usize },
}

const WORD_BITS: usize = 64;

/// Dense matrix over GF(2), rows packed into `u64` words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mod2Dense {
    n_rows: usize,
    n_cols: usize,
    /// Each row occupies `words_per_row` consecutive words
    data: Vec<u64>,
    words_per_row: usize,
}

impl Mod2Dense {
    /// All-zero matrix
    pub fn allocate(n_rows: usize, n_cols: usize) -> Result<Self, DenseError> {
        if n_rows == 0 || n_cols == 0 {
            return Err(DenseError::InvalidDimensions);
        }

        let words_per_row = n_cols.div_ceil(WORD_BITS);

        Ok(Self {
            n_rows,
            n_cols,
            data: vec![0u64; n_rows * words_per_row],
            words_per_row,
        })
    }

    pub fn identity(n: usize) -> Result<Self, DenseError> {
        let mut matrix = Self::allocate(n, n)?;
        for i in 0..n {
            matrix.set(i, i, true)?;
        }
        Ok(matrix)
    }

    pub fn rows(&self) -> usize {
        self.n_rows
    }
    pub fn cols(&self) -> usize {
        self.n_cols
    }

    /// Out-of-range reads are zero.
    pub fn get(&self, row: usize, col: usize) -> bool {
        if row >= self.n_rows || col >= self.n_cols {
            return false;
        }

        let word = self.data[row * self.words_per_row + col / WORD_BITS];
        (word >> (col % WORD_BITS)) & 1 == 1
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) -> Result<(), DenseError> {
        if row >= self.n_rows || col >= self.n_cols {
            return Err(DenseError::IndexOutOfBounds);
        }

        let word = &mut self.data[row * self.words_per_row + col / WORD_BITS];
        let mask = 1u64 << (col % WORD_BITS);
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }

        Ok(())
    }

    /// Overwrite `row` with row `src_row` of `source`, which must have the
    /// same width.
    pub fn copy_row_from(
        &mut self,
        row: usize,
        source: &Mod2Dense,
        src_row: usize,
    ) -> Result<(), DenseError> {
        if self.n_cols != source.n_cols {
            return Err(DenseError::InvalidDimensions);
        }
        if row >= self.n_rows || src_row >= source.n_rows {
            return Err(DenseError::IndexOutOfBounds);
        }

        let dst = row * self.words_per_row;
        let src = src_row * source.words_per_row;
        self.data[dst..dst + self.words_per_row]
            .copy_from_slice(&source.data[src..src + source.words_per_row]);
        Ok(())
    }

    /// Matrix product over GF(2)
    pub fn multiply(a: &Mod2Dense, b: &Mod2Dense) -> Result<Mod2Dense, DenseError> {
        if a.n_cols != b.n_rows {
            return Err(DenseError::InvalidDimensions);
        }

        let mut result = Mod2Dense::allocate(a.n_rows, b.n_cols)?;

        // Row i of the product is the XOR of the rows of b selected by row i of a
        for i in 0..a.n_rows {
            for k in 0..a.n_cols {
                if a.get(i, k) {
                    result.xor_row_from(i, b, k);
                }
            }
        }

        Ok(result)
    }

    /// Kronecker product `a ⊗ b` over GF(2)
    pub fn kronecker(a: &Mod2Dense, b: &Mod2Dense) -> Result<Mod2Dense, DenseError> {
        let mut result = Mod2Dense::allocate(a.n_rows * b.n_rows, a.n_cols * b.n_cols)?;

        for ai in 0..a.n_rows {
            for aj in 0..a.n_cols {
                if !a.get(ai, aj) {
                    continue;
                }
                for bi in 0..b.n_rows {
                    for bj in 0..b.n_cols {
                        if b.get(bi, bj) {
                            result.set(ai * b.n_rows + bi, aj * b.n_cols + bj, true)?;
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    /// `(A · v) mod 2` for a column vector of bits (any non-zero byte is a one).
    pub fn mul_vec(&self, v: &[u8]) -> Result<Vec<u8>, DenseError> {
        if v.len() != self.n_cols {
            return Err(DenseError::VectorLength {
                expected: self.n_cols,
                actual: v.len(),
            });
        }

        let packed = Self::pack(v, self.words_per_row);
        let result = (0..self.n_rows)
            .map(|row| {
                let start = row * self.words_per_row;
                let ones: u32 = self.data[start..start + self.words_per_row]
                    .iter()
                    .zip(&packed)
                    .map(|(a, b)| (a & b).count_ones())
                    .sum();
                (ones & 1) as u8
            })
            .collect();

        Ok(result)
    }

    pub fn is_identity(&self) -> bool {
        self.n_rows == self.n_cols
            && (0..self.n_rows)
                .all(|i| (0..self.n_cols).all(|j| self.get(i, j) == (i == j)))
    }

    /// Get a row as bits
    pub fn get_row(&self, row: usize) -> Vec<u8> {
        (0..self.n_cols).map(|col| u8::from(self.get(row, col))).collect()
    }

    fn xor_row_from(&mut self, row: usize, source: &Mod2Dense, src_row: usize) {
        let dst = row * self.words_per_row;
        let src = src_row * source.words_per_row;
        for w in 0..self.words_per_row {
            self.data[dst + w] ^= source.data[src + w];
        }
    }

    fn pack(bits: &[u8], words: usize) -> Vec<u64> {
        let mut packed = vec![0u64; words];
        for (i, &bit) in bits.iter().enumerate() {
            if bit != 0 {
                packed[i / WORD_BITS] |= 1u64 << (i % WORD_BITS);
            }
        }
        packed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_matrix_basic() {
        let mut matrix = Mod2Dense::allocate(3, 70).unwrap();

        matrix.set(1, 2, true).unwrap();
        matrix.set(2, 69, true).unwrap();
        assert!(matrix.get(1, 2));
        assert!(matrix.get(2, 69));
        assert!(!matrix.get(1, 1));
        assert!(!matrix.get(5, 5));

        matrix.set(1, 2, false).unwrap();
        assert!(!matrix.get(1, 2));

        assert_eq!(matrix.set(3, 0, true), Err(DenseError::IndexOutOfBounds));
        assert!(Mod2Dense::allocate(0, 4).is_err());
    }

    #[test]
    fn test_dense_matrix_multiply() {
        // the kernel squares to the identity over GF(2)
        let mut kernel = Mod2Dense::allocate(2, 2).unwrap();
        kernel.set(0, 0, true).unwrap();
        kernel.set(0, 1, true).unwrap();
        kernel.set(1, 1, true).unwrap();
        assert!(Mod2Dense::multiply(&kernel, &kernel).unwrap().is_identity());

        // 1x2 row [1, 1] times the kernel: [1, 1 ^ 1]
        let mut row = Mod2Dense::allocate(1, 2).unwrap();
        row.set(0, 0, true).unwrap();
        row.set(0, 1, true).unwrap();
        let product = Mod2Dense::multiply(&row, &kernel).unwrap();
        assert_eq!(product.get_row(0), vec![1, 0]);

        assert_eq!(
            Mod2Dense::multiply(&kernel, &row),
            Err(DenseError::InvalidDimensions)
        );
    }

    #[test]
    fn test_kronecker() {
        // [[1,1],[0,1]] ⊗ [[1,1],[0,1]]
        let mut f = Mod2Dense::allocate(2, 2).unwrap();
        f.set(0, 0, true).unwrap();
        f.set(0, 1, true).unwrap();
        f.set(1, 1, true).unwrap();

        let f2 = Mod2Dense::kronecker(&f, &f).unwrap();
        assert_eq!(f2.get_row(0), vec![1, 1, 1, 1]);
        assert_eq!(f2.get_row(1), vec![0, 1, 0, 1]);
        assert_eq!(f2.get_row(2), vec![0, 0, 1, 1]);
        assert_eq!(f2.get_row(3), vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_mul_vec() {
        // parity of bits {0, 2} and of bit 1
        let mut parity = Mod2Dense::allocate(2, 3).unwrap();
        parity.set(0, 0, true).unwrap();
        parity.set(0, 2, true).unwrap();
        parity.set(1, 1, true).unwrap();

        assert_eq!(parity.mul_vec(&[1, 1, 1]).unwrap(), vec![0, 1]);
        assert_eq!(parity.mul_vec(&[0, 0, 1]).unwrap(), vec![1, 0]);
        assert_eq!(
            parity.mul_vec(&[1, 0]),
            Err(DenseError::VectorLength {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_identity_and_copy_row() {
        let eye = Mod2Dense::identity(5).unwrap();
        assert!(eye.is_identity());

        let mut m = Mod2Dense::identity(5).unwrap();
        let mut other = Mod2Dense::allocate(5, 5).unwrap();
        other.set(3, 0, true).unwrap();
        other.set(3, 4, true).unwrap();
        m.copy_row_from(2, &other, 3).unwrap();
        assert_eq!(m.get_row(2), vec![1, 0, 0, 0, 1]);
        assert!(!m.is_identity());
    }
}
