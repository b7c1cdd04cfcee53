use crate::backend::Backend;
use crate::pool::PoolState;
use std::sync::Arc;

/// Return `live[index]`, then advance the cursor. Both steps happen under
/// the pool lock, so every caller observes a distinct index.
pub(super) fn pick(state: &mut PoolState) -> Option<Arc<Backend>> {
    if state.live.is_empty() {
        return None;
    }

    let backend = state.live[state.index].clone();
    state.index = (state.index + 1) % state.live.len();

    Some(backend)
}
