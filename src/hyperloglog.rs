//! ## HyperLogLog sketch
//! Estimates cardinality of a multiset using `M = 2^P` byte registers stored in a
//! [`PartitionedArray`], so only touched register shards take memory.
//!
//! [Original HyperLogLog paper](http://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf)
//!
//! Hash layout (64 bits):
//! - 63..64-P bits - register index
//! - 63-P..0 bits  - rank is 1 + number of leading zeros in these bits
//!
//! Estimation:
//! - raw estimate `alpha(M) * M^2 / sum(2^-register)`
//! - linear counting `M * ln(M / zeros)` while raw estimate <= 2.5 * M and zero registers remain
//! - large range correction once raw estimate exceeds `2^32 / 30`

use std::fmt::{Debug, Formatter};
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};
use std::io::{Read, Write};
use std::mem::size_of;

use log::{debug, warn};
use wyhash::WyHash;

use crate::array::PartitionedArray;
use crate::config::{validate_precision, SketchConfig};
use crate::error::SketchError;
use crate::register::Register;
use crate::sketch::Sketch;

/// Size of the hash space used by large range correction.
const HASH_SPACE: f64 = 18_446_744_073_709_551_616.0;
/// Raw estimate above which large range correction applies.
const LARGE_RANGE_THRESHOLD: f64 = 4_294_967_296.0 / 30.0;

/// HyperLogLog cardinality sketch with `u8` registers.
pub struct CardinalitySketch<H: Hasher + Default = WyHash> {
    /// Number of bits used for register index
    precision: u8,
    /// Register ranks
    registers: PartitionedArray<u8>,
    /// Zero-sized build hasher
    build_hasher: BuildHasherDefault<H>,
}

impl<H: Hasher + Default> CardinalitySketch<H> {
    /// Create new empty sketch with `2^precision` registers.
    pub fn new(precision: u8) -> Result<Self, SketchError> {
        SketchConfig::new(precision).map(Self::with_config)
    }

    /// Create new empty sketch from validated config.
    pub fn with_config(config: SketchConfig) -> Self {
        let precision = config.precision();
        debug!("creating cardinality sketch with precision {}", precision);
        Self {
            precision,
            registers: PartitionedArray::with_exponent(u32::from(precision)),
            build_hasher: BuildHasherDefault::default(),
        }
    }

    /// Wrap existing register array, its length defines precision.
    pub fn from_registers(registers: PartitionedArray<u8>) -> Result<Self, SketchError> {
        let precision = precision_of(&registers)?;
        Ok(Self {
            precision,
            registers,
            build_hasher: BuildHasherDefault::default(),
        })
    }

    /// Decode sketch from dense wire format, one byte per register.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SketchError> {
        Self::from_registers(PartitionedArray::from_dense(bytes)?)
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
    pub fn registers(&self) -> &PartitionedArray<u8> {
        &self.registers
    }

    /// Insert a hashable item into the sketch
    #[inline]
    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) {
        let mut hasher = self.build_hasher.build_hasher();
        item.hash(&mut hasher);
        self.insert_hash(hasher.finish());
    }

    /// Insert precomputed 64-bit hash, register is only ever raised.
    #[inline]
    pub fn insert_hash(&mut self, hash: u64) {
        let (idx, rank) = index_and_rank(hash, self.precision);
        self.registers.put_max(idx, u8::saturating_from(rank));
    }

    /// Return bias corrected cardinality estimate
    pub fn estimate(&self) -> f64 {
        estimate_registers(&self.registers, u8::to_u32)
    }

    /// Return cardinality estimate rounded to the nearest integer
    #[inline]
    pub fn size(&self) -> u64 {
        self.estimate().round() as u64
    }

    /// Merge `rhs` into `self`, resulting sketch represents union of both sets.
    ///
    /// Fails without touching `self` if precisions differ.
    pub fn combine(&mut self, rhs: &Self) -> Result<(), SketchError> {
        check_same_precision(self.precision, rhs.precision)?;
        self.registers.merge(&rhs.registers);
        Ok(())
    }

    /// Reset all registers keeping precision
    pub fn clear(&mut self) {
        debug!("clearing cardinality sketch with precision {}", self.precision);
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
        size_of::<Self>() - size_of::<PartitionedArray<u8>>() + self.registers.size_of()
    }
}

impl<H: Hasher + Default> Sketch for CardinalitySketch<H> {
    fn precision(&self) -> u8 {
        self.precision
    }

    fn estimate(&self) -> f64 {
        CardinalitySketch::estimate(self)
    }

    fn combine(&mut self, rhs: &Self) -> Result<(), SketchError> {
        CardinalitySketch::combine(self, rhs)
    }
}

impl<H: Hasher + Default> Default for CardinalitySketch<H> {
    fn default() -> Self {
        Self::with_config(SketchConfig::default())
    }
}

impl<H: Hasher + Default> Clone for CardinalitySketch<H> {
    fn clone(&self) -> Self {
        Self {
            precision: self.precision,
            registers: self.registers.clone(),
            build_hasher: BuildHasherDefault::default(),
        }
    }
}

impl<H: Hasher + Default> PartialEq for CardinalitySketch<H> {
    /// Compare sketches by precision and register values
    fn eq(&self, rhs: &Self) -> bool {
        self.precision == rhs.precision && self.registers == rhs.registers
    }
}

impl<H: Hasher + Default> Debug for CardinalitySketch<H> {
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

/// Split hash into register index (top `precision` bits) and rank of the remaining bits.
#[inline]
pub(crate) fn index_and_rank(hash: u64, precision: u8) -> (usize, u32) {
    let p = u32::from(precision);
    let idx = (hash >> (64 - p)) as usize;
    let rank = (hash << p).leading_zeros().min(64 - p) + 1;
    (idx, rank)
}

/// Estimate cardinality from registers, `rank` extracts HyperLogLog rank from a register.
pub(crate) fn estimate_registers<R: Register>(
    registers: &PartitionedArray<R>,
    rank: impl Fn(R) -> u32,
) -> f64 {
    let shard_size = registers.shard_size();
    let mut zeros = 0usize;
    let mut sum = 0.0f64;
    for shard in registers.shards() {
        match shard {
            Some(shard) => {
                for &r in shard {
                    let rank = rank(r);
                    zeros += usize::from(rank == 0);
                    sum += inverse_pow2(rank);
                }
            }
            None => {
                zeros += shard_size;
                sum += shard_size as f64;
            }
        }
    }
    estimate_from_sum(registers.len(), sum, zeros)
}

/// Apply HyperLogLog estimator with small and large range corrections.
#[inline]
fn estimate_from_sum(m: usize, sum: f64, zeros: usize) -> f64 {
    let mf = m as f64;
    let raw = alpha(m) * mf * mf / sum;
    if raw <= 2.5 * mf {
        if zeros > 0 {
            mf * (mf / zeros as f64).ln()
        } else {
            raw
        }
    } else if raw >= HASH_SPACE {
        // saturated registers, correction is undefined past the hash space
        HASH_SPACE
    } else if raw > LARGE_RANGE_THRESHOLD {
        -HASH_SPACE * (-raw / HASH_SPACE).ln_1p()
    } else {
        raw
    }
}

/// Return `2^-rank`
#[inline]
fn inverse_pow2(rank: u32) -> f64 {
    match rank {
        0..=63 => 1.0 / ((1u64 << rank) as f64),
        _ => 0.5f64.powf(f64::from(rank)),
    }
}

/// Parameter for bias correction
#[inline]
pub(crate) fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (m as f64)),
    }
}

/// Derive precision from register array length.
pub(crate) fn precision_of<R: Register>(
    registers: &PartitionedArray<R>,
) -> Result<u8, SketchError> {
    let precision = u8::try_from(registers.len().trailing_zeros()).unwrap_or(u8::MAX);
    validate_precision(precision)?;
    Ok(precision)
}

#[inline]
pub(crate) fn check_same_precision(lhs: u8, rhs: u8) -> Result<(), SketchError> {
    if lhs != rhs {
        warn!("refusing to combine sketches with precisions {} and {}", lhs, rhs);
        return Err(SketchError::PrecisionMismatch {
            left: lhs,
            right: rhs,
        });
    }
    Ok(())
}

pub(crate) fn is_all_zero<R: Register>(registers: &PartitionedArray<R>) -> bool {
    registers
        .shards()
        .flatten()
        .all(|shard| shard.iter().all(|r| r.is_zero()))
}
