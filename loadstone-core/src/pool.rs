use crate::backend::Backend;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Everything the pool lock protects: the two membership sequences and the
/// round-robin cursor. Insertion order in `live` is significant; it is the
/// iteration order of the round-robin policies.
#[derive(Debug, Default)]
pub(crate) struct PoolState {
    pub(crate) live: Vec<Arc<Backend>>,
    pub(crate) down: Vec<Arc<Backend>>,
    /// Position of the next round-robin pick, always `< max(1, live.len())`.
    pub(crate) index: usize,
    /// 1-based request number for the backend at `index` (weighted policy).
    pub(crate) current: u32,
}

/// The live/down membership model. A backend is in exactly one of the two
/// sequences at any observable moment; moves are atomic with respect to
/// readers because every operation holds the single pool mutex.
///
/// Identity is by URL. Mutators take URLs, never indices, so callers holding
/// a stale snapshot cannot corrupt the sequences.
#[derive(Debug)]
pub struct Pool {
    state: Mutex<PoolState>,
}

impl Pool {
    pub fn new(backends: Vec<Arc<Backend>>) -> Self {
        let pool = Self {
            state: Mutex::new(PoolState::default()),
        };
        pool.set_live(backends);
        pool
    }

    // A poisoned lock only means some caller panicked mid-operation; the
    // state itself is still a valid partition, so keep serving.
    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&mut PoolState) -> T) -> T {
        f(&mut self.state())
    }

    /// Initialise `live` in the given order, clear `down`, reset the cursor.
    pub fn set_live(&self, backends: Vec<Arc<Backend>>) {
        let mut state = self.state();
        state.live = backends;
        state.down.clear();
        state.index = 0;
        state.current = 1;
    }

    /// Stable view of the live sequence, safe to iterate without the lock.
    pub fn snapshot_live(&self) -> Vec<Arc<Backend>> {
        self.state().live.clone()
    }

    /// Stable view of the down sequence, safe to iterate without the lock.
    pub fn snapshot_down(&self) -> Vec<Arc<Backend>> {
        self.state().down.clone()
    }

    pub fn is_empty_live(&self) -> bool {
        self.state().live.is_empty()
    }

    /// Move the backend with this URL from live to the tail of down.
    /// No-op when it is not live (repeated demotions are idempotent).
    pub fn demote(&self, url: &str) {
        let mut state = self.state();

        let Some(position) = state.live.iter().position(|b| b.url() == url) else {
            return;
        };

        let backend = state.live.remove(position);
        state.down.push(backend);

        // The cursor may now point past the end of the shrunk sequence.
        if state.live.is_empty() {
            state.index = 0;
        } else {
            state.index %= state.live.len();
        }
    }

    /// Move the backend with this URL from down to the tail of live.
    /// No-op when it is not down (repeated promotions are idempotent).
    pub fn promote(&self, url: &str) {
        let mut state = self.state();

        let Some(position) = state.down.iter().position(|b| b.url() == url) else {
            return;
        };

        let backend = state.down.remove(position);
        state.live.push(backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(url: &str) -> Arc<Backend> {
        Arc::new(Backend::new(url, 1).expect("valid url"))
    }

    fn urls(backends: &[Arc<Backend>]) -> Vec<&str> {
        backends.iter().map(|b| b.url()).collect()
    }

    fn pool_with(names: &[&str]) -> Pool {
        Pool::new(names.iter().map(|url| backend(url)).collect())
    }

    #[test]
    fn every_backend_is_in_exactly_one_sequence() {
        let pool = pool_with(&["a:1", "b:1", "c:1"]);

        pool.demote("b:1");
        pool.demote("a:1");
        pool.promote("b:1");

        let live = pool.snapshot_live();
        let down = pool.snapshot_down();

        assert_eq!(live.len() + down.len(), 3);
        for name in ["a:1", "b:1", "c:1"] {
            let in_live = live.iter().filter(|b| b.url() == name).count();
            let in_down = down.iter().filter(|b| b.url() == name).count();
            assert_eq!(in_live + in_down, 1, "{name} must appear exactly once");
        }
    }

    #[test]
    fn demote_appends_to_down_tail() {
        let pool = pool_with(&["a:1", "b:1", "c:1"]);

        pool.demote("a:1");
        pool.demote("c:1");

        assert_eq!(urls(&pool.snapshot_live()), ["b:1"]);
        assert_eq!(urls(&pool.snapshot_down()), ["a:1", "c:1"]);
    }

    #[test]
    fn promote_appends_to_live_tail() {
        let pool = pool_with(&["a:1", "b:1"]);

        pool.demote("a:1");
        pool.promote("a:1");

        assert_eq!(urls(&pool.snapshot_live()), ["b:1", "a:1"]);
        assert!(pool.snapshot_down().is_empty());
    }

    #[test]
    fn demote_and_promote_are_idempotent() {
        let pool = pool_with(&["a:1", "b:1"]);

        pool.demote("a:1");
        pool.demote("a:1");
        assert_eq!(pool.snapshot_down().len(), 1);

        pool.promote("a:1");
        pool.promote("a:1");
        assert_eq!(pool.snapshot_live().len(), 2);
        assert!(pool.snapshot_down().is_empty());

        // Unknown URLs are ignored outright.
        pool.demote("ghost:9");
        pool.promote("ghost:9");
        assert_eq!(pool.snapshot_live().len(), 2);
    }

    #[test]
    fn demote_clamps_the_cursor() {
        let pool = pool_with(&["a:1", "b:1", "c:1"]);
        pool.with_state(|state| state.index = 2);

        pool.demote("c:1");

        assert_eq!(pool.with_state(|state| state.index), 0);
    }

    #[test]
    fn emptying_live_resets_the_cursor() {
        let pool = pool_with(&["a:1", "b:1"]);
        pool.with_state(|state| state.index = 1);

        pool.demote("a:1");
        pool.demote("b:1");

        assert!(pool.is_empty_live());
        assert_eq!(pool.with_state(|state| state.index), 0);
    }

    #[test]
    fn set_live_resets_cursor_and_clears_down() {
        let pool = pool_with(&["a:1", "b:1"]);
        pool.demote("a:1");
        pool.with_state(|state| {
            state.index = 1;
            state.current = 5;
        });

        pool.set_live(vec![backend("a:1"), backend("b:1")]);

        assert_eq!(urls(&pool.snapshot_live()), ["a:1", "b:1"]);
        assert!(pool.snapshot_down().is_empty());
        assert_eq!(pool.with_state(|state| (state.index, state.current)), (0, 1));
    }
}
