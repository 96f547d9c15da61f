//! Successive-cancellation decoding.
//!
//! The decoder keeps two `N × (n + 1)` tables: log-likelihood ratios `L`
//! and partial sums `B`. Column `n` of `L` holds the channel values and
//! column 0 of `B` the decided uncoded bits. Stage `j` splits the block into
//! partitions of `2^(n - j)` positions; a position in the upper half of its
//! partition combines its own child with the one `half` below it (`f`), a
//! position in the lower half uses the one `half` above it and the partial
//! sum already decided there (`g`).

use crate::{
    math::{bit_reversed, logdomain_sum},
    IndexSet, PolarError,
};
use tracing::debug;

/// Check-node update `f(l1, l2)`.
///
/// A `+∞` child is a known zero and hands over the other child unchanged.
pub fn upper_llr(l1: f64, l2: f64) -> f64 {
    match (l1 == f64::INFINITY, l2 == f64::INFINITY) {
        (true, true) => f64::INFINITY,
        (true, false) => l2,
        (false, true) => l1,
        (false, false) => logdomain_sum(l1 + l2, 0.0) - logdomain_sum(l1, l2),
    }
}

/// Variable-node update `g(l1, l2, b)` given the partial sum `b` of the
/// upper sibling.
pub fn lower_llr(l1: f64, l2: f64, b: u8) -> f64 {
    let either_known = l1 == f64::INFINITY || l2 == f64::INFINITY;
    if b == 0 {
        if either_known {
            f64::INFINITY
        } else {
            l1 + l2
        }
    } else if l1 == f64::INFINITY && l2 == f64::INFINITY {
        debug!("both children known with partial sum 1, returning an erasure");
        0.0
    } else {
        l1 - l2
    }
}

/// Reusable SC decoder bound to one frozen set.
///
/// One instance per thread: the working tables are overwritten by every
/// call to [`ScDecoder::decode`].
#[derive(Debug, Clone)]
pub struct ScDecoder {
    frozen: IndexSet,
    n_stages: usize,
    llr: Vec<Option<f64>>,
    bits: Vec<u8>,
}

impl ScDecoder {
    pub fn new(frozen: &IndexSet) -> Result<Self, PolarError> {
        let len = frozen.universe();
        if len == 0 || !len.is_power_of_two() {
            return Err(PolarError::Configuration(format!(
                "block length {} is not a power of two",
                len
            )));
        }

        let n_stages = len.trailing_zeros() as usize;
        let cells = len * (n_stages + 1);

        Ok(Self {
            frozen: frozen.clone(),
            n_stages,
            llr: vec![None; cells],
            bits: vec![0; cells],
        })
    }

    /// Mothercode length `N`
    pub fn block_length(&self) -> usize {
        self.frozen.universe()
    }

    pub fn frozen(&self) -> &IndexSet {
        &self.frozen
    }

    /// Decode one block of channel LLRs, returning the `K` information bits
    /// in ascending position order.
    pub fn decode(&mut self, llrs: &[f64]) -> Result<Vec<u8>, PolarError> {
        self.decode_with_progress(llrs, |_, _| {})
    }

    /// As [`ScDecoder::decode`], calling `progress(decided, total)` after
    /// every bit decision.
    pub fn decode_with_progress<P>(
        &mut self,
        llrs: &[f64],
        progress: P,
    ) -> Result<Vec<u8>, PolarError>
    where
        P: FnMut(usize, usize),
    {
        let decoded = self.decode_uncoded(llrs, progress)?;
        Ok(self.frozen.complement().iter().map(|&i| decoded[i]).collect())
    }

    /// Full length-`N` estimate of the encoder input, frozen positions
    /// included.
    pub fn decode_x(&mut self, llrs: &[f64]) -> Result<Vec<u8>, PolarError> {
        self.decode_uncoded(llrs, |_, _| {})
    }

    fn decode_uncoded<P>(&mut self, llrs: &[f64], mut progress: P) -> Result<Vec<u8>, PolarError>
    where
        P: FnMut(usize, usize),
    {
        let len = self.block_length();
        if llrs.len() != len {
            return Err(PolarError::LengthMismatch {
                expected: len,
                actual: llrs.len(),
            });
        }

        self.reset(llrs);

        for step in 0..len {
            let position = bit_reversed(step, self.n_stages);
            let llr = self.evaluate(position, 0);

            let bit = if self.frozen.contains(position) || llr >= 0.0 {
                0
            } else {
                1
            };
            let cell = self.cell(position, 0);
            self.bits[cell] = bit;
            self.propagate(position);

            progress(step + 1, len);
        }

        Ok((0..len).map(|i| self.bits[self.cell(i, 0)]).collect())
    }

    fn reset(&mut self, llrs: &[f64]) {
        self.llr.fill(None);
        self.bits.fill(0);
        let n = self.n_stages;
        for (i, &llr) in llrs.iter().enumerate() {
            let cell = self.cell(i, n);
            self.llr[cell] = Some(llr);
        }
    }

    fn cell(&self, position: usize, stage: usize) -> usize {
        position * (self.n_stages + 1) + stage
    }

    /// Lazily evaluate `L[position, stage]`, caching every node it touches.
    fn evaluate(&mut self, position: usize, stage: usize) -> f64 {
        let cell = self.cell(position, stage);
        if let Some(llr) = self.llr[cell] {
            return llr;
        }

        let partition = 1 << (self.n_stages - stage);
        let half = partition / 2;

        let llr = if position % partition < half {
            let l1 = self.evaluate(position, stage + 1);
            let l2 = self.evaluate(position + half, stage + 1);
            upper_llr(l1, l2)
        } else {
            let l1 = self.evaluate(position, stage + 1);
            let l2 = self.evaluate(position - half, stage + 1);
            lower_llr(l1, l2, self.bits[self.cell(position - half, stage)])
        };

        self.llr[cell] = Some(llr);
        llr
    }

    /// Push a fresh decision towards the channel side. Only a lower-half
    /// position completes a pair; its partial sums feed the next stage.
    fn propagate(&mut self, position: usize) {
        let mut frontier = vec![position];

        for stage in 0..self.n_stages {
            let partition = 1 << (self.n_stages - stage);
            let half = partition / 2;
            let mut next = Vec::with_capacity(frontier.len() * 2);

            for &q in &frontier {
                if q % partition < half {
                    continue;
                }
                let lower = self.bits[self.cell(q, stage)];
                let upper = self.bits[self.cell(q - half, stage)];
                let up_cell = self.cell(q - half, stage + 1);
                let low_cell = self.cell(q, stage + 1);
                self.bits[up_cell] = lower ^ upper;
                self.bits[low_cell] = lower;
                next.push(q);
                next.push(q - half);
            }

            if next.is_empty() {
                break;
            }
            frontier = next;
        }
    }
}

/// One-shot decode of channel LLRs against a frozen set.
pub fn decode(likelihoods: &[f64], frozen: &IndexSet) -> Result<Vec<u8>, PolarError> {
    ScDecoder::new(frozen)?.decode(likelihoods)
}
