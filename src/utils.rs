//! Utility functions for the sequence memory engine.
//!
//! Seeded sampling used when a segment can grow fewer synapses than there are
//! candidate presynaptic cells.

use rand::seq::index;
use rand::Rng;

/// Keep `n` randomly chosen elements of `items`, preserving their relative order.
///
/// When `items.len() <= n` every element is kept and the RNG is not touched, so
/// small candidate sets stay fully deterministic.
///
/// # Examples
///
/// ```
/// use seqmem::utils::sample;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
/// assert_eq!(sample(vec![3, 1, 2], 5, &mut rng), vec![3, 1, 2]);
///
/// let picked = sample((0..100).collect(), 10, &mut rng);
/// assert_eq!(picked.len(), 10);
/// assert!(picked.windows(2).all(|w| w[0] < w[1]));
/// ```
pub fn sample<T, R: Rng>(items: Vec<T>, n: usize, rng: &mut R) -> Vec<T> {
    if items.len() <= n {
        return items;
    }

    let mut keep = index::sample(rng, items.len(), n).into_vec();
    keep.sort_unstable();

    let mut keep_iter = keep.into_iter().peekable();
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if keep_iter.peek() == Some(&i) {
                keep_iter.next();
                Some(item)
            } else {
                None
            }
        })
        .collect()
}
