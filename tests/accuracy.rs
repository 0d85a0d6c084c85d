use partitioned_sketch::{CardinalitySketch, SimilaritySketch};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_case::test_case;
use wyhash::WyHash;

/// Insert `n` random items into fresh sketches over `trials` runs and return
/// `(mean, max)` relative error.
fn measure_error(precision: u8, n: usize, trials: usize, seed: u64) -> (f64, f64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut total = 0.0;
    let mut max = 0.0f64;
    for _ in 0..trials {
        let mut sketch = CardinalitySketch::<WyHash>::new(precision).unwrap();
        for _ in 0..n {
            sketch.insert(&rng.gen::<u64>());
        }
        let error = (sketch.size() as f64 - n as f64).abs() / n as f64;
        total += error;
        max = max.max(error);
    }
    (total / trials as f64, max)
}

#[test_case(10, 50_000; "p10")]
#[test_case(12, 100_000; "p12")]
#[test_case(14, 200_000; "p14")]
fn test_relative_error(precision: u8, n: usize) {
    let standard_error = 1.04 / ((1u64 << precision) as f64).sqrt();
    let (mean, max) = measure_error(precision, n, 8, 12345);
    assert!(
        mean < 1.5 * standard_error,
        "mean error {} vs standard error {}",
        mean,
        standard_error
    );
    assert!(
        max < 4.0 * standard_error,
        "max error {} vs standard error {}",
        max,
        standard_error
    );
}

#[test_case(100; "hundred")]
#[test_case(1_000; "thousand")]
fn test_small_range_is_accurate(n: usize) {
    // linear counting keeps small cardinalities within a fraction of a percent
    let mut sketch = CardinalitySketch::<WyHash>::default();
    for i in 0..n {
        sketch.insert(&i);
    }
    let error = (sketch.size() as f64 - n as f64).abs() / n as f64;
    assert!(error < 0.01, "relative error {}", error);
}

#[test]
fn test_union_equals_superset() {
    // h1 and h3 hold the same items, h2 a subset of them plus items only h3 has
    let mut h1 = CardinalitySketch::<WyHash>::default();
    let mut h2 = CardinalitySketch::<WyHash>::default();
    let mut h3 = CardinalitySketch::<WyHash>::default();
    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..200_000 {
        let item: u64 = rng.gen();
        h1.insert(&item);
        h3.insert(&item);
        if i > 100_000 {
            h2.insert(&item);
        }
    }
    for _ in 0..200_000 {
        let item: u64 = rng.gen();
        h2.insert(&item);
        h3.insert(&item);
    }

    h1.combine(&h2).unwrap();
    assert_eq!(h1, h3);
    assert_eq!(h1.size(), h3.size());

    let error = (h1.size() as f64 - 400_000.0).abs() / 400_000.0;
    assert!(error < 0.01, "relative error {}", error);
}

#[test]
fn test_combine_commutative() {
    let mut a = CardinalitySketch::<WyHash>::new(14).unwrap();
    let mut b = CardinalitySketch::<WyHash>::new(14).unwrap();
    for i in 0..30_000u32 {
        a.insert(&i);
    }
    for i in 20_000..60_000u32 {
        b.insert(&i);
    }

    let mut ab = a.clone();
    ab.combine(&b).unwrap();
    let mut ba = b.clone();
    ba.combine(&a).unwrap();
    assert_eq!(ab, ba);
    assert_eq!(ab.size(), ba.size());

    // combining again changes nothing
    let size = ab.size();
    ab.combine(&b).unwrap();
    assert_eq!(ab.size(), size);

    let error = (size as f64 - 60_000.0).abs() / 60_000.0;
    assert!(error < 0.05, "relative error {}", error);
}

#[test]
fn test_similarity_sketch_tracks_cardinality() {
    let mut hll = CardinalitySketch::<WyHash>::new(12).unwrap();
    let mut hmh = SimilaritySketch::<WyHash>::new(12).unwrap();
    for i in 0..50_000u32 {
        hll.insert(&i);
        hmh.insert(&i);
    }
    // same hash, index and rank bits, so register ranks agree
    assert_eq!(hll.size(), hmh.size());
}
