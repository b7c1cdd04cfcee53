use crate::backend::Backend;
use crate::pool::PoolState;
use std::sync::Arc;

/// Linear scan for the lowest active-connection count. Ties go to the
/// earliest position in `live` (strictly-less comparison only).
///
/// Each count is a single atomic load; there is no reservation, so two
/// concurrent selectors may pick the same backend. That is acceptable and
/// self-correcting once one of them increments.
pub(super) fn pick(state: &PoolState) -> Option<Arc<Backend>> {
    let mut chosen: Option<&Arc<Backend>> = None;
    let mut min_connections = i64::MAX;

    for backend in &state.live {
        let connections = backend.current_connections();
        if connections < min_connections {
            min_connections = connections;
            chosen = Some(backend);
        }
    }

    chosen.cloned()
}
