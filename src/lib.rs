//! Polar Code Library - construction, rate matching, encoding and
//! successive-cancellation decoding of binary polar codes
//!
//! Codes are built from the Arikan kernel `[[1, 1], [0, 1]]`. Block lengths
//! that are not a power of two are reached by shortening or puncturing a
//! mothercode with one of the WLS, BRS, BGL or permuted-WLS patterns.

pub mod channel;
pub mod construct;
pub mod decode;
pub mod dense_matrix;
pub mod encode;
pub mod generator;
pub mod index_set;
pub mod math;
pub mod polar;
pub mod shape;
pub mod shorten;

// Re-export main types
pub use channel::{AwgnChannel, Channel};
pub use construct::{construct, construct_rate_matched, Construction, ConstructionType};
pub use decode::{decode, ScDecoder};
pub use dense_matrix::{DenseError, Mod2Dense};
pub use encode::{encode, EncodingMode, Encoder};
pub use generator::{arikan_matrix, SystematicTransform};
pub use index_set::IndexSet;
pub use polar::PolarCode;
pub use shape::CodeShape;
pub use shorten::{
    frozen_from_pattern, generate_pattern, FrozenUpdate, PatternAlgorithm, PunctureKind,
    RateMatchPattern, RateMatching,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolarError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Pattern is not reciprocal: punctured {punct_set:?}, source {source_set:?}")]
    ReciprocityViolation {
        punct_set: Vec<usize>,
        source_set: Vec<usize>,
    },
    #[error("Expected length {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Dense matrix error: {0}")]
    DenseMatrix(#[from] dense_matrix::DenseError),
}
