#![no_main]

use libfuzzer_sys::fuzz_target;
use partitioned_sketch::{CardinalitySketch, PartitionedArray};
use wyhash::WyHash;

fuzz_target!(|data: &[u8]| {
    if let Ok(sketch) = CardinalitySketch::<WyHash>::from_bytes(data) {
        assert_eq!(sketch.to_bytes(), data);
        assert!(sketch.estimate() >= 0.0);
    }

    if data.len().is_power_of_two() {
        let array = PartitionedArray::<u8>::from_dense(data).unwrap();
        assert_eq!(array.to_dense(), data);
    }
});
