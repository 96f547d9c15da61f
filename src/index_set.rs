use crate::{math, PolarError};

/// An ordered subset of `{0, .., len-1}` together with its lookup table.
///
/// The lookup uses the polar convention shared by the frozen, punctured and
/// source sets: `0` marks a member, `1` a non-member. The index order is
/// kept as given because the construction returns frozen bits in a
/// meaningful order (least reliable survivors first, source bits last).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSet {
    len: usize,
    indices: Vec<usize>,
    lookup: Vec<u8>,
}

impl IndexSet {
    /// Build a set over `0..len`. Duplicates and out-of-range indices are
    /// rejected.
    pub fn new(indices: Vec<usize>, len: usize) -> Result<Self, PolarError> {
        let mut lookup = vec![1u8; len];
        for &index in &indices {
            if index >= len {
                return Err(PolarError::IndexOutOfRange { index, len });
            }
            if lookup[index] == 0 {
                return Err(PolarError::Configuration(format!(
                    "index {} appears more than once",
                    index
                )));
            }
            lookup[index] = 0;
        }

        Ok(Self {
            len,
            indices,
            lookup,
        })
    }

    pub fn empty(len: usize) -> Self {
        Self {
            len,
            indices: Vec::new(),
            lookup: vec![1u8; len],
        }
    }

    /// Rebuild a set from a lookup table (`0` = member).
    pub fn from_lookup(lookup: &[u8]) -> Self {
        let indices = lookup
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(|(i, _)| i)
            .collect();
        Self {
            len: lookup.len(),
            indices,
            lookup: lookup.iter().map(|&v| u8::from(v != 0)).collect(),
        }
    }

    /// Size of the universe `0..len`.
    pub fn universe(&self) -> usize {
        self.len
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn lookup(&self) -> &[u8] {
        &self.lookup
    }

    pub fn contains(&self, index: usize) -> bool {
        self.lookup.get(index).map_or(false, |&v| v == 0)
    }

    /// Members in ascending order.
    pub fn sorted(&self) -> Vec<usize> {
        let mut sorted = self.indices.clone();
        sorted.sort_unstable();
        sorted
    }

    /// `{0, .., len-1} \ self`, ascending. For a frozen set this is the
    /// information set.
    pub fn complement(&self) -> Vec<usize> {
        math::complement(&self.indices, self.len)
    }

    pub fn is_subset_of(&self, other: &IndexSet) -> bool {
        self.indices.iter().all(|&i| other.contains(i))
    }

    /// Same members, regardless of order.
    pub fn same_members(&self, other: &IndexSet) -> bool {
        self.len == other.len && self.lookup == other.lookup
    }
}
