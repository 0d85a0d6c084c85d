//! Sketch construction parameters.
//!
//! `precision` is the only tunable: a sketch holds `2^precision` registers and its
//! estimates have relative standard error of about `1.04 / sqrt(2^precision)`.
//! - precision = 10: 1.04 / sqrt(2^10) = 3.25%
//! - precision = 14: 1.04 / sqrt(2^14) = 0.81%
//! - precision = 18: 1.04 / sqrt(2^18) = 0.20%

use std::hash::Hasher;

use crate::error::SketchError;
use crate::hyperloglog::CardinalitySketch;
use crate::hyperminhash::SimilaritySketch;

/// Smallest supported precision, bias constants are only defined from 16 registers up.
pub const MIN_PRECISION: u8 = 4;
/// Largest supported precision, leaves at least 40 hash bits for ranks.
pub const MAX_PRECISION: u8 = 24;
/// Precision used by `Default` sketches (262,144 registers).
pub const DEFAULT_PRECISION: u8 = 18;

/// Validated sketch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(try_from = "u8", into = "u8"))]
pub struct SketchConfig {
    precision: u8,
}

impl SketchConfig {
    /// Create config, failing if `precision` is outside `[MIN_PRECISION..=MAX_PRECISION]`.
    pub fn new(precision: u8) -> Result<Self, SketchError> {
        validate_precision(precision)?;
        Ok(Self { precision })
    }

    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Number of registers sketches built from this config hold
    #[inline]
    pub fn register_count(&self) -> usize {
        1 << self.precision
    }

    /// Expected relative standard error of estimates
    pub fn standard_error(&self) -> f64 {
        1.04 / (self.register_count() as f64).sqrt()
    }

    pub fn build_cardinality<H: Hasher + Default>(&self) -> CardinalitySketch<H> {
        CardinalitySketch::with_config(*self)
    }

    pub fn build_similarity<H: Hasher + Default>(&self) -> SimilaritySketch<H> {
        SimilaritySketch::with_config(*self)
    }
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

impl TryFrom<u8> for SketchConfig {
    type Error = SketchError;

    fn try_from(precision: u8) -> Result<Self, Self::Error> {
        Self::new(precision)
    }
}

impl From<SketchConfig> for u8 {
    fn from(config: SketchConfig) -> Self {
        config.precision
    }
}

#[inline]
pub(crate) fn validate_precision(precision: u8) -> Result<(), SketchError> {
    if (MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        Ok(())
    } else {
        Err(SketchError::InvalidPrecision(precision))
    }
}
