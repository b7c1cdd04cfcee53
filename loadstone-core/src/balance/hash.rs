use crate::backend::Backend;
use crate::pool::PoolState;
use std::sync::Arc;

/// CRC32 (IEEE) of the key, modulo the live count.
///
/// Deterministic for a fixed membership. This is not consistent hashing:
/// any membership change re-maps every key, which is fine for the intended
/// pseudo-stickiness but rules out using it for session affinity.
pub(super) fn pick(state: &PoolState, key: Option<&str>) -> Option<Arc<Backend>> {
    if state.live.is_empty() {
        return None;
    }

    let key = key.filter(|k| !k.is_empty())?;
    let index = crc32fast::hash(key.as_bytes()) as usize % state.live.len();

    Some(state.live[index].clone())
}
