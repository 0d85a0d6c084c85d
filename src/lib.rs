//! `partitioned-sketch` estimates the number of distinct elements in a stream or dataset,
//! merges estimates of separate streams and estimates intersections between them.
//!
//! Sketches keep their registers in a [`PartitionedArray`]: a square-root sharded array
//! whose shards are only allocated once a non-zero register lands in them, so large
//! precisions stay cheap for small or sparse inputs.
//!
//! - [`CardinalitySketch`] - HyperLogLog with `u8` registers.
//! - [`SimilaritySketch`] - HyperMinHash with `u16` registers, additionally estimates
//!   Jaccard similarity of two sketches.
//! - [`intersect`](intersection::intersect) - inclusion-exclusion intersection of any
//!   number of sketches of the same kind and precision.
//!
//! ```
//! use partitioned_sketch::{intersect, CardinalitySketch};
//!
//! let mut a = CardinalitySketch::<wyhash::WyHash>::new(14).unwrap();
//! let mut b = CardinalitySketch::<wyhash::WyHash>::new(14).unwrap();
//! for i in 0..1000 {
//!     a.insert(&i);
//!     b.insert(&(i + 500));
//! }
//! let common = intersect(&[&a, &b]).unwrap();
//! assert!(common > 400 && common < 600);
//!
//! a.combine(&b).unwrap();
//! assert!(a.size() > 1400 && a.size() < 1600);
//! ```
pub mod array;
pub mod config;
pub mod error;
pub mod hyperloglog;
pub mod hyperminhash;
pub mod intersection;
pub mod register;
#[cfg(feature = "with_serde")]
mod serde;
pub mod sketch;

pub use array::PartitionedArray;
pub use config::{SketchConfig, DEFAULT_PRECISION, MAX_PRECISION, MIN_PRECISION};
pub use error::SketchError;
pub use hyperloglog::CardinalitySketch;
pub use hyperminhash::SimilaritySketch;
pub use intersection::intersect;
pub use register::Register;
pub use sketch::Sketch;
