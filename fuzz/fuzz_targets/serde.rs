#![no_main]

use libfuzzer_sys::fuzz_target;
use partitioned_sketch::{CardinalitySketch, SimilaritySketch};
use wyhash::WyHash;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut sketch) = serde_json::from_slice::<CardinalitySketch<WyHash>>(data) {
        sketch.insert(&1);
        assert!(sketch.size() > 0);
    }
    if let Ok(mut sketch) = serde_json::from_slice::<SimilaritySketch<WyHash>>(data) {
        sketch.insert(&1);
        assert!(sketch.size() > 0);
    }
});
