use rand::Rng;
use rand::seq::SliceRandom;

/// Return a uniformly random permutation of `items` using the thread-local generator.
///
/// The input is left untouched.
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    shuffle_with_rng(items, &mut rand::thread_rng())
}

/// Shuffle a copy of `items` with an injected generator.
///
/// Seeded generators make the order reproducible in tests.
pub fn shuffle_with_rng<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled
}
