//! Fan-out over independent items.
//!
//! Work on fewer than `threshold` items runs on the calling thread.
//! Larger inputs are split across the *rayon* pool when the `rayon`
//! feature is enabled. Output order always matches input order.

use alloc::vec::Vec;

/// Applies `func` to every item and collects the results in input order.
///
/// # Examples
///
/// ```
/// let squares = vc_utils::batch::map_batch(&[1, 2, 3], 2, |x| x * x);
/// assert_eq!(squares, [1, 4, 9]);
/// ```
pub fn map_batch<T, R, F>(items: &[T], threshold: usize, func: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if items.len() < threshold.max(1) {
        return items.iter().map(func).collect();
    }
    parallel(items, func)
}

#[cfg(feature = "rayon")]
fn parallel<T, R, F>(items: &[T], func: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    use rayon::prelude::*;
    items.par_iter().map(func).collect()
}

#[cfg(not(feature = "rayon"))]
fn parallel<T, R, F>(items: &[T], func: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items.iter().map(func).collect()
}

#[cfg(test)]
mod tests {
    use super::map_batch;
    use alloc::vec::Vec;

    #[test]
    fn keeps_input_order_above_threshold() {
        let input: Vec<u32> = (0..1000).collect();
        let output = map_batch(&input, 16, |x| x + 1);
        assert_eq!(output.len(), 1000);
        assert!(output.iter().enumerate().all(|(i, x)| *x == i as u32 + 1));
    }

    #[test]
    fn empty_input() {
        let output = map_batch::<u8, u8, _>(&[], 0, |x| *x);
        assert!(output.is_empty());
    }
}
