#![no_main]

use libfuzzer_sys::fuzz_target;
use partitioned_sketch::{intersect, CardinalitySketch, SimilaritySketch};
use wyhash::{wyhash, WyHash};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let split_index = wyhash(data, 0) as usize % data.len();
    let (first_half, second_half) = data.split_at(split_index);

    let mut sketch1 = CardinalitySketch::<WyHash>::new(10).unwrap();
    let mut similarity1 = SimilaritySketch::<WyHash>::new(10).unwrap();
    for chunk in first_half.chunks(4) {
        sketch1.insert(&chunk);
        similarity1.insert(&chunk);
        assert!(sketch1.size() > 0);
        assert!(similarity1.size() > 0);
    }

    let mut sketch2 = CardinalitySketch::<WyHash>::new(10).unwrap();
    let mut similarity2 = SimilaritySketch::<WyHash>::new(10).unwrap();
    for chunk in second_half.chunks(4) {
        sketch2.insert(&chunk);
        similarity2.insert(&chunk);
    }

    let similarity = similarity1.similarity(&similarity2).unwrap();
    assert!((0.0..=1.0).contains(&similarity));
    let _ = intersect(&[&sketch1, &sketch2]).unwrap();

    let before = sketch1.estimate();
    sketch1.combine(&sketch2).unwrap();
    assert!(sketch1.estimate() >= before);
});
