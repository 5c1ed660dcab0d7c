use rand::Rng;
use rand::seq::SliceRandom;

/// `count` distinct indices in `0..pool_size`, none equal to `exclude`.
///
/// The caller guarantees `count <= pool_size - 1`.
pub(crate) fn distinct_indices<R: Rng + ?Sized>(
    exclude: usize,
    count: usize,
    pool_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    debug_assert!(count <= pool_size.saturating_sub(1));
    let mut pool: Vec<usize> = (0..pool_size).filter(|&idx| idx != exclude).collect();
    let (picked, _) = pool.partial_shuffle(rng, count);
    picked.to_vec()
}
