//! # Serde module for sketches
//!
//! This module provides serde-based (serialization and deserialization) features for
//! `CardinalitySketch` and `SimilaritySketch`. Both are serialized as a tuple
//! `(precision, registers)`, where `registers` is the dense wire format produced by
//! `to_bytes`: one byte per register for `CardinalitySketch`, two big-endian bytes per
//! register for `SimilaritySketch`.
//!
//! During deserialization the register bytes are decoded back into a sparse array,
//! so untouched shards stay unallocated, and the stored precision is checked against
//! the number of decoded registers.
//!
//! Refer to the serde documentation for more details on custom serialization and deserialization:
//! - [Serialization](https://serde.rs/impl-serialize.html)
//! - [Deserialization](https://serde.rs/impl-deserialize.html)
use std::hash::Hasher;

use serde::de::Error;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize};

use crate::error::SketchError;
use crate::hyperloglog::CardinalitySketch;
use crate::hyperminhash::SimilaritySketch;

impl<H: Hasher + Default> Serialize for CardinalitySketch<H> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.precision())?;
        tup.serialize_element(&self.to_bytes())?;
        tup.end()
    }
}

impl<'de, H: Hasher + Default> Deserialize<'de> for CardinalitySketch<H> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (precision, bytes): (u8, Vec<u8>) = Deserialize::deserialize(deserializer)?;
        let sketch = Self::from_bytes(&bytes).map_err(D::Error::custom)?;
        check_precision(precision, sketch.precision()).map_err(D::Error::custom)?;
        Ok(sketch)
    }
}

impl<H: Hasher + Default> Serialize for SimilaritySketch<H> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.precision())?;
        tup.serialize_element(&self.to_bytes())?;
        tup.end()
    }
}

impl<'de, H: Hasher + Default> Deserialize<'de> for SimilaritySketch<H> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (precision, bytes): (u8, Vec<u8>) = Deserialize::deserialize(deserializer)?;
        let sketch = Self::from_bytes(&bytes).map_err(D::Error::custom)?;
        check_precision(precision, sketch.precision()).map_err(D::Error::custom)?;
        Ok(sketch)
    }
}

/// Stored precision must agree with the number of registers
fn check_precision(stored: u8, decoded: u8) -> Result<(), SketchError> {
    if stored != decoded {
        return Err(SketchError::PrecisionMismatch {
            left: stored,
            right: decoded,
        });
    }
    Ok(())
}
