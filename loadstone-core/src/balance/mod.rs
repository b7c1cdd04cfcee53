mod hash;
mod least_connections;
mod random;
mod round_robin;
mod weighted_round_robin;

#[cfg(test)]
mod tests;

use crate::backend::Backend;
use crate::pool::Pool;
use serde::Deserialize;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// The five selection policies. Parsing straight from configuration makes an
/// unknown name a fatal startup error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    RoundRobin,
    WeightedRoundRobin,
    LeastConnections,
    Hash,
    Random,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "round_robin",
            Algorithm::WeightedRoundRobin => "weighted_round_robin",
            Algorithm::LeastConnections => "least_connections",
            Algorithm::Hash => "hash",
            Algorithm::Random => "random",
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pool plus the policy that picks from it.
///
/// `select` takes the pool lock exactly once per call, so a policy's read
/// and its cursor advance are atomic under concurrent callers. Policies
/// never perform I/O while the lock is held.
#[derive(Debug)]
pub struct Balancer {
    algorithm: Algorithm,
    pool: Pool,
}

impl Balancer {
    pub fn new(algorithm: Algorithm, backends: Vec<Arc<Backend>>) -> Self {
        Self {
            algorithm,
            pool: Pool::new(backends),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Replace the membership: the new list becomes `live` in the given
    /// order, `down` empties and any policy cursor resets.
    pub fn set_live(&self, backends: Vec<Arc<Backend>>) {
        self.pool.set_live(backends);
    }

    /// Pick one live backend, or `None` when the live set is empty at the
    /// moment of the call. `key` is only consulted by the keyed hash policy;
    /// a missing or empty key makes that policy yield `None` as well.
    pub fn select(&self, key: Option<&str>) -> Option<Arc<Backend>> {
        self.pool.with_state(|state| match self.algorithm {
            Algorithm::RoundRobin => round_robin::pick(state),
            Algorithm::WeightedRoundRobin => weighted_round_robin::pick(state),
            Algorithm::LeastConnections => least_connections::pick(state),
            Algorithm::Hash => hash::pick(state, key),
            Algorithm::Random => random::pick(state),
        })
    }
}
