//! ## Partitioned register array
//! Fixed-length array of `2^p` registers split into `2^ceil(p/2)` shards of
//! `2^floor(p/2)` registers each. Shards are allocated on the first non-zero write
//! into their address range, so a sketch that saw few elements only pays for the
//! shards it touched plus one pointer-sized slot per shard.
//!
//! Shard layout for `p = 5` (32 registers, 8 shards of 4 registers):
//! - shards[0]     - registers `0..4`
//! - shards[1]     - registers `4..8`
//! - ...
//! - shards[7]     - registers `28..32`
//!
//! Dense wire format:
//! - `length` registers, `R::BYTES` bytes each, big-endian, shard 0 first.
//! - absent shards are written as `shard_size` zero registers.

use std::fmt::{Debug, Formatter};
use std::io::{Read, Write};
use std::mem::{size_of, size_of_val};

use log::trace;

use crate::error::SketchError;
use crate::register::Register;

/// Lazily allocated, square-root sharded array of registers.
#[derive(Clone)]
pub struct PartitionedArray<R: Register> {
    /// Total number of registers
    length: usize,
    /// Number of registers stored in every shard
    shard_size: usize,
    /// Shard slots, `None` means logically all-zero shard
    shards: Vec<Option<Box<[R]>>>,
}

impl<R: Register> PartitionedArray<R> {
    /// Create new array of `length` registers without allocating any shard.
    pub fn new(length: usize) -> Result<Self, SketchError> {
        if !length.is_power_of_two() {
            return Err(SketchError::InvalidLength(length));
        }
        Ok(Self::with_exponent(length.trailing_zeros()))
    }

    /// Create new array of `2^p` registers.
    pub(crate) fn with_exponent(p: u32) -> Self {
        let shard_count: usize = 1 << (p / 2 + p % 2);
        let shard_size = 1 << (p / 2);
        Self {
            length: 1 << p,
            shard_size,
            shards: (0..shard_count).map(|_| None).collect(),
        }
    }

    /// Create array from flat sequence of registers.
    ///
    /// Zero runs are skipped, the first non-zero register found in a shard's address
    /// range causes the whole shard-aligned block to be copied.
    pub fn from_dense(values: &[R]) -> Result<Self, SketchError> {
        let mut array = Self::new(values.len())?;
        let shard_size = array.shard_size;

        let mut i = 0;
        while i < values.len() {
            if values[i].is_zero() {
                i += 1;
                continue;
            }
            let shard_idx = i / shard_size;
            let start = shard_idx * shard_size;
            array.shards[shard_idx] = Some(values[start..start + shard_size].into());
            i = start + shard_size;
        }

        Ok(array)
    }

    /// Read `length` registers in dense wire format from `reader`.
    pub fn read_from<Rd: Read>(reader: &mut Rd, length: usize) -> Result<Self, SketchError> {
        let mut array = Self::new(length)?;
        let mut buf = vec![0u8; array.shard_size * R::BYTES];
        let mut block = Vec::with_capacity(array.shard_size);

        for slot in array.shards.iter_mut() {
            reader.read_exact(&mut buf)?;
            if buf.iter().all(|&b| b == 0) {
                continue;
            }
            block.clear();
            R::decode(&buf, &mut block);
            *slot = Some(block.as_slice().into());
        }

        Ok(array)
    }

    /// Total number of registers
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Return whether the array holds no registers, never true for a constructed array.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of shard slots
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Number of registers in each shard
    #[inline]
    pub fn shard_size(&self) -> usize {
        self.shard_size
    }

    /// Number of shards currently backed by memory
    pub fn allocated_shards(&self) -> usize {
        self.shards.iter().filter(|s| s.is_some()).count()
    }

    /// Return register stored at `index`, zero if its shard is absent.
    #[inline]
    pub fn get(&self, index: usize) -> R {
        match &self.shards[index / self.shard_size] {
            Some(shard) => shard[index % self.shard_size],
            None => R::ZERO,
        }
    }

    /// Store `value` at `index`. Zero writes never allocate a shard.
    #[inline]
    pub fn put(&mut self, index: usize, value: R) {
        if value.is_zero() {
            return;
        }
        let shard_size = self.shard_size;
        let shard_idx = index / shard_size;
        let shard = self.shards[shard_idx].get_or_insert_with(|| {
            trace!("allocating shard {} of {} registers", shard_idx, shard_size);
            vec![R::ZERO; shard_size].into_boxed_slice()
        });
        shard[index % shard_size] = value;
    }

    /// Raise register at `index` to `value` if it is greater than the stored one.
    /// Returns true if register was updated.
    #[inline]
    pub fn put_max(&mut self, index: usize, value: R) -> bool {
        if value > self.get(index) {
            self.put(index, value);
            return true;
        }
        false
    }

    /// Merge `rhs` into `self` by taking register-wise maximum.
    ///
    /// Shards present only in `rhs` are copied, `rhs` is never aliased nor mutated.
    /// Arrays must have equal length, which sketches guarantee by checking precision.
    pub fn merge(&mut self, rhs: &Self) {
        debug_assert_eq!(self.length, rhs.length);
        for (lhs_slot, rhs_slot) in self.shards.iter_mut().zip(rhs.shards.iter()) {
            let Some(rhs) = rhs_slot else {
                continue;
            };
            match lhs_slot {
                Some(lhs) => {
                    for (l, r) in lhs.iter_mut().zip(rhs.iter()) {
                        *l = (*l).max(*r);
                    }
                }
                None => *lhs_slot = Some(rhs.clone()),
            }
        }
    }

    /// Drop all shards, every register becomes zero.
    pub fn clear(&mut self) {
        self.shards.iter_mut().for_each(|s| *s = None);
    }

    /// Iterate over shard slots in address order.
    #[inline]
    pub(crate) fn shards(&self) -> impl Iterator<Item = Option<&[R]>> + '_ {
        self.shards.iter().map(|s| s.as_deref())
    }

    /// Return all registers as a flat vector.
    pub fn to_dense(&self) -> Vec<R> {
        let mut dense = Vec::with_capacity(self.length);
        for shard in self.shards() {
            match shard {
                Some(shard) => dense.extend_from_slice(shard),
                None => dense.resize(dense.len() + self.shard_size, R::ZERO),
            }
        }
        dense
    }

    /// Return registers encoded in dense wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.length * R::BYTES);
        for shard in self.shards() {
            match shard {
                Some(shard) => R::encode(shard, &mut bytes),
                None => bytes.resize(bytes.len() + self.shard_size * R::BYTES, 0),
            }
        }
        bytes
    }

    /// Write registers in dense wire format into `writer`.
    pub fn write_to<Wr: Write>(&self, writer: &mut Wr) -> Result<(), SketchError> {
        // one zero block is shared by all absent shards
        let mut zeros: Option<Vec<u8>> = None;
        let mut buf = Vec::with_capacity(self.shard_size * R::BYTES);
        for shard in self.shards() {
            match shard {
                Some(shard) => {
                    buf.clear();
                    R::encode(shard, &mut buf);
                    writer.write_all(&buf)?;
                }
                None => {
                    let zeros =
                        zeros.get_or_insert_with(|| vec![0u8; self.shard_size * R::BYTES]);
                    writer.write_all(zeros)?;
                }
            }
        }
        Ok(())
    }

    /// Compare shard layouts strictly: an absent shard is not equal to an allocated
    /// all-zero shard. Use `==` to compare register values instead.
    pub fn layout_eq(&self, rhs: &Self) -> bool {
        self.length == rhs.length && self.shards == rhs.shards
    }

    /// Return heap and inline memory used by the array in bytes
    pub fn size_of(&self) -> usize {
        size_of::<Self>()
            + size_of_val(self.shards.as_slice())
            + self.allocated_shards() * self.shard_size * size_of::<R>()
    }
}

impl<R: Register> PartialEq for PartitionedArray<R> {
    /// Compare register values, absent shards are equal to all-zero shards.
    fn eq(&self, rhs: &Self) -> bool {
        if self.length != rhs.length {
            return false;
        }
        self.shards().zip(rhs.shards()).all(|pair| match pair {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            (Some(shard), None) | (None, Some(shard)) => shard.iter().all(|r| r.is_zero()),
            (None, None) => true,
        })
    }
}

impl<R: Register> Eq for PartitionedArray<R> {}

impl<R: Register> Debug for PartitionedArray<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ length: {}, shards: {}/{}, size: {} }}",
            self.length,
            self.allocated_shards(),
            self.shard_count(),
            self.size_of()
        )
    }
}
