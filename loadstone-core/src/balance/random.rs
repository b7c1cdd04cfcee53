use crate::backend::Backend;
use crate::pool::PoolState;
use rand::{Rng, rng};
use std::sync::Arc;

/// Uniform pick over the live sequence.
pub(super) fn pick(state: &PoolState) -> Option<Arc<Backend>> {
    if state.live.is_empty() {
        return None;
    }

    let index = rng().random_range(0..state.live.len());

    Some(state.live[index].clone())
}
