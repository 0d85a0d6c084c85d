//! Fixed-width sketch registers.
//!
//! Registers are plain unsigned integers compared by value, so register-wise
//! maximum is the union operator for every sketch built on top of them.
//! On the wire each register is written big-endian using exactly `BYTES` bytes.

use std::fmt::Debug;

/// Register cell stored in a [`PartitionedArray`](crate::array::PartitionedArray).
pub trait Register: Copy + Ord + Default + Debug + Send + Sync + 'static {
    /// Logically empty register, never stored in an absent shard.
    const ZERO: Self;
    /// Number of bytes used by one register in the dense wire format.
    const BYTES: usize;

    /// Convert a rank (or packed value) into a register, saturating at the register width.
    fn saturating_from(value: u32) -> Self;

    /// Widen register into `u32`.
    fn to_u32(self) -> u32;

    /// Append big-endian encoding of `registers` to `buf`.
    fn encode(registers: &[Self], buf: &mut Vec<u8>);

    /// Decode big-endian `bytes` into registers, `bytes.len()` must be a multiple of `BYTES`.
    fn decode(bytes: &[u8], registers: &mut Vec<Self>);

    #[inline]
    fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

macro_rules! impl_register {
    ($t:ty) => {
        impl Register for $t {
            const ZERO: Self = 0;
            const BYTES: usize = std::mem::size_of::<$t>();

            #[inline]
            fn saturating_from(value: u32) -> Self {
                <$t>::try_from(value).unwrap_or(<$t>::MAX)
            }

            #[inline]
            fn to_u32(self) -> u32 {
                u32::from(self)
            }

            #[inline]
            fn encode(registers: &[Self], buf: &mut Vec<u8>) {
                buf.reserve(registers.len() * Self::BYTES);
                for r in registers {
                    buf.extend_from_slice(&r.to_be_bytes());
                }
            }

            #[inline]
            fn decode(bytes: &[u8], registers: &mut Vec<Self>) {
                registers.reserve(bytes.len() / Self::BYTES);
                registers.extend(
                    bytes
                        .chunks_exact(Self::BYTES)
                        // chunks are exactly `BYTES` long
                        .map(|chunk| <$t>::from_be_bytes(chunk.try_into().unwrap_or_default())),
                );
            }
        }
    };
}

impl_register!(u8);
impl_register!(u16);
