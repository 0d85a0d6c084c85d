use partitioned_sketch::{intersect, CardinalitySketch, SimilaritySketch};
use wyhash::WyHash;

fn main() {
    let mut sketch1 = CardinalitySketch::<WyHash>::new(14).unwrap();
    for i in 0..10_000 {
        sketch1.insert(&i);
    }
    println!("sketch1 estimate = {}", sketch1.size());

    let mut sketch2 = CardinalitySketch::<WyHash>::new(14).unwrap();
    for i in 5_000..15_000 {
        sketch2.insert(&i);
    }
    println!("sketch2 estimate = {}", sketch2.size());

    let common = intersect(&[&sketch1, &sketch2]).unwrap();
    println!("intersection estimate = {}", common);

    sketch1.combine(&sketch2).unwrap();
    println!("merged estimate = {}", sketch1.size());

    let mut similarity1 = SimilaritySketch::<WyHash>::new(14).unwrap();
    let mut similarity2 = SimilaritySketch::<WyHash>::new(14).unwrap();
    for i in 0..10_000 {
        similarity1.insert(&i);
        similarity2.insert(&(i + 5_000));
    }
    println!(
        "jaccard similarity = {:.3}, intersection = {}",
        similarity1.similarity(&similarity2).unwrap(),
        similarity1.intersection(&similarity2).unwrap()
    );
}
