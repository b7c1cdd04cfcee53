use crate::backend::Backend;
use crate::pool::PoolState;
use std::sync::Arc;

/// Round robin where the cursor lingers: the backend at `index` is returned
/// for `weight` consecutive selections (`current` counts them, 1-based)
/// before the cursor advances.
pub(super) fn pick(state: &mut PoolState) -> Option<Arc<Backend>> {
    if state.live.is_empty() {
        return None;
    }

    let backend = state.live[state.index].clone();

    if state.current >= backend.weight() {
        state.index = (state.index + 1) % state.live.len();
        state.current = 1;
    } else {
        state.current += 1;
    }

    Some(backend)
}
