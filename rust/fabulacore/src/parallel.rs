//! Fan-out helper: rayon on native targets, a plain loop on wasm32

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Map every item, keeping input order in the output
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn map_ordered<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items.par_iter().map(f).collect()
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn map_ordered<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    items.iter().map(f).collect()
}
