//! Bounded-concurrency parallel iteration.
//!
//! Wraps rayon's `par_iter` so that at most `max_concurrent` items are in
//! flight at once. Used where each item holds a large working set (a loaded
//! observation, for example) and memory has to stay bounded.

use rayon::prelude::*;

/// Maps `map` over `items` in parallel, at most `max_concurrent` at a time,
/// and folds the partial results into `init` strictly in input order.
///
/// Folding in input order keeps floating-point reductions reproducible
/// regardless of thread scheduling. Stops after the first chunk that
/// produced an error and returns one of that chunk's errors.
///
/// # Panics
///
/// Panics if `max_concurrent` is 0.
pub fn try_par_fold_ordered<T, R, A, E, M, G>(
    items: &[T],
    max_concurrent: usize,
    init: A,
    map: M,
    mut fold: G,
) -> Result<A, E>
where
    T: Sync,
    R: Send,
    E: Send,
    M: Fn(usize, &T) -> Result<R, E> + Sync,
    G: FnMut(A, R) -> Result<A, E>,
{
    assert!(max_concurrent > 0, "max_concurrent must be > 0");

    let mut acc = init;
    for (chunk_idx, chunk) in items.chunks(max_concurrent).enumerate() {
        let offset = chunk_idx * max_concurrent;
        let partials: Result<Vec<R>, E> = chunk
            .par_iter()
            .enumerate()
            .map(|(i, item)| map(offset + i, item))
            .collect();
        for partial in partials? {
            acc = fold(acc, partial)?;
        }
    }
    Ok(acc)
}
