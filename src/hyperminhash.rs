//! ## HyperMinHash sketch
//! HyperLogLog variant with `u16` registers that additionally keep a few hash bits per
//! register, which allows estimating Jaccard similarity and intersection of two sketches
//! directly instead of through inclusion-exclusion.
//!
//! [HyperMinHash paper](https://arxiv.org/abs/1710.08436)
//!
//! Register layout (16 bits):
//! - 15..10 bits   - HyperLogLog rank in [1..63] range
//! - 9..0 bits     - lowest `MANTISSA_BITS` bits of the hash
//!
//! Packed values are compared as plain integers, so register-wise maximum still
//! implements union and the rank part alone feeds the cardinality estimator.

use std::fmt::{Debug, Formatter};
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};
use std::io::{Read, Write};
use std::mem::size_of;

use log::debug;
use wyhash::WyHash;

use crate::array::PartitionedArray;
use crate::config::{validate_precision, SketchConfig};
use crate::error::SketchError;
use crate::hyperloglog::{check_same_precision, estimate_registers, is_all_zero, precision_of};
use crate::register::Register;
use crate::sketch::Sketch;

/// Number of hash bits kept in every register next to the rank
pub const MANTISSA_BITS: u32 = 10;
/// Largest rank representable in the upper 6 register bits
pub const MAX_RANK: u32 = (1 << (16 - MANTISSA_BITS)) - 1;
const MANTISSA_MASK: u64 = (1 << MANTISSA_BITS) - 1;

/// HyperMinHash sketch with `u16` registers.
pub struct SimilaritySketch<H: Hasher + Default = WyHash> {
    /// Number of bits used for register index
    precision: u8,
    /// Packed rank and mantissa registers
    registers: PartitionedArray<u16>,
    /// Zero-sized build hasher
    build_hasher: BuildHasherDefault<H>,
}

impl<H: Hasher + Default> SimilaritySketch<H> {
    /// Create new empty sketch with `2^precision` registers.
    pub fn new(precision: u8) -> Result<Self, SketchError> {
        SketchConfig::new(precision).map(Self::with_config)
    }

    /// Create new empty sketch from validated config.
    pub fn with_config(config: SketchConfig) -> Self {
        let precision = config.precision();
        debug!("creating similarity sketch with precision {}", precision);
        Self {
            precision,
            registers: PartitionedArray::with_exponent(u32::from(precision)),
            build_hasher: BuildHasherDefault::default(),
        }
    }

    /// Wrap existing register array, its length defines precision.
    pub fn from_registers(registers: PartitionedArray<u16>) -> Result<Self, SketchError> {
        let precision = precision_of(&registers)?;
        Ok(Self {
            precision,
            registers,
            build_hasher: BuildHasherDefault::default(),
        })
    }

    /// Decode sketch from dense wire format, two big-endian bytes per register.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SketchError> {
        if bytes.len() % u16::BYTES != 0 {
            return Err(SketchError::InvalidLength(bytes.len()));
        }
        let length = bytes.len() / u16::BYTES;
        if !length.is_power_of_two() {
            return Err(SketchError::InvalidLength(length));
        }
        Self::from_registers(PartitionedArray::read_from(&mut &bytes[..], length)?)
    }

    /// Read `2^precision` registers in dense wire format from `reader`.
    pub fn read_from<Rd: Read>(reader: &mut Rd, precision: u8) -> Result<Self, SketchError> {
        validate_precision(precision)?;
        Self::from_registers(PartitionedArray::read_from(reader, 1 << precision)?)
    }

    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Borrow underlying register array
    #[inline]
    pub fn registers(&self) -> &PartitionedArray<u16> {
        &self.registers
    }

    /// Insert a hashable item into the sketch
    #[inline]
    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) {
        let mut hasher = self.build_hasher.build_hasher();
        item.hash(&mut hasher);
        self.insert_hash(hasher.finish());
    }

    /// Insert precomputed 64-bit hash
    #[inline]
    pub fn insert_hash(&mut self, hash: u64) {
        let (idx, packed) = index_and_packed(hash, self.precision);
        self.registers.put_max(idx, packed);
    }

    /// Return bias corrected cardinality estimate, only register ranks are used.
    pub fn estimate(&self) -> f64 {
        estimate_registers(&self.registers, rank_of)
    }

    /// Return cardinality estimate rounded to the nearest integer
    #[inline]
    pub fn size(&self) -> u64 {
        self.estimate().round() as u64
    }

    /// Merge `rhs` into `self`, resulting sketch represents union of both sets.
    pub fn combine(&mut self, rhs: &Self) -> Result<(), SketchError> {
        check_same_precision(self.precision, rhs.precision)?;
        self.registers.merge(&rhs.registers);
        Ok(())
    }

    /// Estimate Jaccard index `|A ∩ B| / |A ∪ B|` of sets represented by both sketches.
    pub fn similarity(&self, rhs: &Self) -> Result<f64, SketchError> {
        check_same_precision(self.precision, rhs.precision)?;

        // registers holding identical non-zero values and registers non-zero in the union
        let mut matches = 0u64;
        let mut occupied = 0u64;
        for pair in self.registers.shards().zip(rhs.registers.shards()) {
            match pair {
                (Some(lhs), Some(rhs)) => {
                    for (&l, &r) in lhs.iter().zip(rhs.iter()) {
                        if l != 0 || r != 0 {
                            occupied += 1;
                            matches += u64::from(l == r);
                        }
                    }
                }
                (Some(shard), None) | (None, Some(shard)) => {
                    occupied += shard.iter().filter(|r| !r.is_zero()).count() as u64;
                }
                (None, None) => {}
            }
        }

        if matches == 0 {
            return Ok(0.0);
        }

        let collisions =
            approx_expected_collision(self.estimate(), rhs.estimate(), self.precision);
        Ok(((matches as f64 - collisions) / occupied as f64).clamp(0.0, 1.0))
    }

    /// Estimate `|A ∩ B|` as Jaccard index times union cardinality.
    pub fn intersection(&self, rhs: &Self) -> Result<u64, SketchError> {
        let similarity = self.similarity(rhs)?;
        let union = self.union(rhs)?;
        Ok((similarity * union.estimate()).round() as u64)
    }

    /// Reset all registers keeping precision
    pub fn clear(&mut self) {
        debug!("clearing similarity sketch with precision {}", self.precision);
        self.registers.clear();
    }

    /// Return whether no element was inserted since creation or last clear
    pub fn is_empty(&self) -> bool {
        is_all_zero(&self.registers)
    }

    /// Write registers in dense wire format
    pub fn write_to<Wr: Write>(&self, writer: &mut Wr) -> Result<(), SketchError> {
        self.registers.write_to(writer)
    }

    /// Return registers encoded in dense wire format
    pub fn to_bytes(&self) -> Vec<u8> {
        self.registers.to_bytes()
    }

    /// Return memory size of the sketch
    pub fn size_of(&self) -> usize {
        size_of::<Self>() - size_of::<PartitionedArray<u16>>() + self.registers.size_of()
    }
}

impl<H: Hasher + Default> Sketch for SimilaritySketch<H> {
    fn precision(&self) -> u8 {
        self.precision
    }

    fn estimate(&self) -> f64 {
        SimilaritySketch::estimate(self)
    }

    fn combine(&mut self, rhs: &Self) -> Result<(), SketchError> {
        SimilaritySketch::combine(self, rhs)
    }
}

impl<H: Hasher + Default> Default for SimilaritySketch<H> {
    fn default() -> Self {
        Self::with_config(SketchConfig::default())
    }
}

impl<H: Hasher + Default> Clone for SimilaritySketch<H> {
    fn clone(&self) -> Self {
        Self {
            precision: self.precision,
            registers: self.registers.clone(),
            build_hasher: BuildHasherDefault::default(),
        }
    }
}

impl<H: Hasher + Default> PartialEq for SimilaritySketch<H> {
    fn eq(&self, rhs: &Self) -> bool {
        self.precision == rhs.precision && self.registers == rhs.registers
    }
}

impl<H: Hasher + Default> Debug for SimilaritySketch<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, estimate: {}, shards: {}/{}, size: {} }}",
            self.precision,
            self.size(),
            self.registers.allocated_shards(),
            self.registers.shard_count(),
            self.size_of()
        )
    }
}

/// Return register index and packed `(rank, mantissa)` register value for `hash`.
///
/// Rank counts leading zeros only in the bits between index and mantissa.
#[inline]
fn index_and_packed(hash: u64, precision: u8) -> (usize, u16) {
    let p = u32::from(precision);
    let idx = (hash >> (64 - p)) as usize;
    let width = 64 - p - MANTISSA_BITS;
    let rank = ((hash << p).leading_zeros().min(width) + 1).min(MAX_RANK);
    let mantissa = (hash & MANTISSA_MASK) as u32;
    (idx, u16::saturating_from((rank << MANTISSA_BITS) | mantissa))
}

#[inline]
fn rank_of(register: u16) -> u32 {
    u32::from(register >> MANTISSA_BITS)
}

/// Expected number of registers equal by chance for two independent sets of
/// cardinalities `n` and `m`.
///
/// Ranks saturate at `MAX_RANK`, so there are `MAX_RANK` levels and the last one
/// holds every hash with at least `MAX_RANK - 1` leading zeros.
fn expected_collision(n: f64, m: f64, precision: u8, mantissa_bits: u32) -> f64 {
    let p = i32::from(precision);
    let r = mantissa_bits as i32;
    let levels = MAX_RANK as i32;
    let r2 = 2f64.powi(r);

    let mut x = 0.0;
    for i in 1..=levels {
        let (den, offset) = if i != levels {
            (2f64.powi(p + r + i), r2)
        } else {
            (2f64.powi(p + r + i - 1), 0.0)
        };
        for j in 1..=(1u32 << mantissa_bits) {
            let j = f64::from(j);
            let b1 = (offset + j) / den;
            let b2 = (offset + j + 1.0) / den;

            let prx = (1.0 - b2).powf(n) - (1.0 - b1).powf(n);
            let pry = (1.0 - b2).powf(m) - (1.0 - b1).powf(m);
            x += prx * pry;
        }
    }

    x * 2f64.powi(p)
}

/// Cheap approximation of `expected_collision` with full mantissa width.
fn approx_expected_collision(n: f64, m: f64, precision: u8) -> f64 {
    let (n, m) = if n < m { (m, n) } else { (n, m) };
    let p = i32::from(precision);
    let r = MANTISSA_BITS as i32;

    if m <= 0.0 || n > 2f64.powi(MAX_RANK as i32 + r) {
        0.0
    } else if n > 2f64.powi(p + 5) {
        let ratio = n / m;
        let phi = 4.0 * ratio / (1.0 + ratio).powi(2);
        0.169_919_487_159_739_1 * 2f64.powi(p - r) * phi
    } else {
        expected_collision(n, m, precision, 0) / 2f64.powi(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case((1 << 58) | 0x3ff, 4 => (0, 0x0bff))]
    #[test_case(0, 4 => (0, 51 << 10))]
    #[test_case(u64::MAX, 4 => (15, (1 << 10) | 0x3ff))]
    #[test_case(0, 24 => (0, 31 << 10))]
    fn test_index_and_packed(hash: u64, precision: u8) -> (usize, u16) {
        index_and_packed(hash, precision)
    }

    #[test]
    fn test_insert_and_estimate() {
        let mut h = SimilaritySketch::<WyHash>::default();
        assert_eq!(h.size(), 0);
        assert!(h.is_empty());

        for item in ["a", "b", "c"] {
            h.insert(item);
        }
        assert_eq!(h.size(), 3);
        h.insert("c");
        assert_eq!(h.size(), 3);

        let mut e = SimilaritySketch::<WyHash>::new(12).unwrap();
        for i in 0..100_000 {
            e.insert(&i);
        }
        let error = (e.estimate() - 100_000.0).abs() / 100_000.0;
        assert!(error < 0.05, "relative error {}", error);
    }

    #[test]
    fn test_similarity_identical() {
        let mut lhs = SimilaritySketch::<WyHash>::new(14).unwrap();
        let mut rhs = SimilaritySketch::<WyHash>::new(14).unwrap();
        for i in 0..10_000 {
            lhs.insert(&i);
            rhs.insert(&i);
        }
        assert_eq!(lhs, rhs);
        let similarity = lhs.similarity(&rhs).unwrap();
        assert!(similarity > 0.95, "similarity {}", similarity);
    }

    #[test]
    fn test_similarity_disjoint() {
        let mut lhs = SimilaritySketch::<WyHash>::new(14).unwrap();
        let mut rhs = SimilaritySketch::<WyHash>::new(14).unwrap();
        for i in 0..10_000 {
            lhs.insert(&format!("a_{}", i));
            rhs.insert(&format!("b_{}", i));
        }
        let similarity = lhs.similarity(&rhs).unwrap();
        assert!(similarity < 0.05, "similarity {}", similarity);
        assert_eq!(SimilaritySketch::<WyHash>::new(14).unwrap().similarity(&lhs).unwrap(), 0.0);
    }

    #[test]
    fn test_intersection() {
        let mut lhs = SimilaritySketch::<WyHash>::new(14).unwrap();
        let mut rhs = SimilaritySketch::<WyHash>::new(14).unwrap();
        for i in 0..20_000 {
            lhs.insert(&i);
        }
        for i in 10_000..30_000 {
            rhs.insert(&i);
        }
        let intersection = lhs.intersection(&rhs).unwrap() as f64;
        let error = (intersection - 10_000.0).abs() / 10_000.0;
        assert!(error < 0.1, "intersection {}", intersection);

        // operands are left untouched
        assert!(lhs.size() < 21_000);
    }

    #[test]
    fn test_precision_mismatch() {
        let lhs = SimilaritySketch::<WyHash>::new(10).unwrap();
        let mut rhs = SimilaritySketch::<WyHash>::new(11).unwrap();
        assert!(matches!(
            lhs.similarity(&rhs),
            Err(SketchError::PrecisionMismatch { left: 10, right: 11 })
        ));
        assert!(matches!(
            rhs.combine(&lhs),
            Err(SketchError::PrecisionMismatch { left: 11, right: 10 })
        ));
    }

    #[test]
    fn test_write_read() {
        let mut h = SimilaritySketch::<WyHash>::new(10).unwrap();
        for i in 0..100 {
            h.insert(&i);
        }

        let mut buf = Vec::new();
        h.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 2 << 10);
        assert_eq!(buf, h.to_bytes());

        let restored = SimilaritySketch::<WyHash>::read_from(&mut buf.as_slice(), 10).unwrap();
        assert_eq!(restored, h);
        assert_eq!(SimilaritySketch::<WyHash>::from_bytes(&buf).unwrap(), h);

        assert!(matches!(
            SimilaritySketch::<WyHash>::from_bytes(&buf[1..]),
            Err(SketchError::InvalidLength(2047))
        ));
        assert!(matches!(
            SimilaritySketch::<WyHash>::from_bytes(&buf[..24]),
            Err(SketchError::InvalidLength(12))
        ));
        assert!(matches!(
            SimilaritySketch::<WyHash>::read_from(&mut &buf[..100], 10),
            Err(SketchError::Serialization(_))
        ));
    }

    #[test]
    fn test_saturated_registers() {
        let packed = (MAX_RANK << MANTISSA_BITS) as u16;
        let bytes: Vec<u8> = std::iter::repeat(packed.to_be_bytes())
            .take(16)
            .flatten()
            .collect();
        let h = SimilaritySketch::<WyHash>::from_bytes(&bytes).unwrap();
        let estimate = h.estimate();
        assert!(estimate.is_finite() && estimate >= 0.0, "estimate {}", estimate);
        assert_eq!(h.size(), u64::MAX);
    }

    #[test]
    fn test_clear() {
        let mut h = SimilaritySketch::<WyHash>::new(8).unwrap();
        h.insert("x");
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h, SimilaritySketch::<WyHash>::new(8).unwrap());
    }

    #[test]
    fn test_expected_collision() {
        // no registers can collide for empty sets
        assert_eq!(approx_expected_collision(0.0, 1000.0, 14), 0.0);
        let small = approx_expected_collision(1000.0, 1000.0, 14);
        let large = approx_expected_collision(100_000.0, 100_000.0, 14);
        assert!(small >= 0.0 && small < 1.0, "small {}", small);
        assert!(large > small, "large {} small {}", large, small);
    }
}
