//! Mutable exit game state, owned by the host and passed into every operation.

use std::collections::HashMap;

use plasma_primitives::Address;

use crate::claim::{ExitClaim, ExitId, ExitKey, ExitStatus};
use crate::error::ExitGameError;
use crate::events::ExitEvent;
use crate::queue::ExitQueue;

/// Exit registry: claims by id, per-token priority queues and pending events.
///
/// Every registered claim stays in `exits` forever; only pending claims are queued
/// and hold an open key.
#[derive(Debug, Default)]
pub struct ExitGameState {
    exits: HashMap<ExitId, ExitClaim>,
    queues: HashMap<Address, ExitQueue>,
    open_keys: HashMap<ExitKey, ExitId>,
    events: Vec<ExitEvent>,
    last_timestamp: u64,
}

impl ExitGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_exit(&self, exit_id: &ExitId) -> Option<&ExitClaim> {
        self.exits.get(exit_id)
    }

    /// Priority queue of a root token
    pub fn queue(&self, token: &Address) -> Option<&ExitQueue> {
        self.queues.get(token)
    }

    /// Pending exits of `token` in priority order
    pub fn pending_exits(&self, token: &Address) -> Vec<&ExitClaim> {
        self.queues
            .get(token)
            .into_iter()
            .flat_map(|queue| queue.iter())
            .filter_map(|(_, exit_id)| self.exits.get(exit_id))
            .collect()
    }

    /// Take the events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<ExitEvent> {
        std::mem::take(&mut self.events)
    }

    /// Timestamp of the last applied operation
    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    pub(crate) fn check_clock(&self, now: u64) -> Result<(), ExitGameError> {
        if now < self.last_timestamp {
            return Err(ExitGameError::ClockRewound {
                last: self.last_timestamp,
                now,
            });
        }
        Ok(())
    }

    pub(crate) fn advance_clock(&mut self, now: u64) {
        self.last_timestamp = now;
    }

    pub(crate) fn open_exit(&self, key: &ExitKey) -> Option<ExitId> {
        self.open_keys.get(key).copied()
    }

    pub(crate) fn head(&self, token: &Address) -> Option<ExitId> {
        self.queues
            .get(token)
            .and_then(ExitQueue::head)
            .map(|(_, exit_id)| exit_id)
    }

    pub(crate) fn emit(&mut self, event: ExitEvent) {
        self.events.push(event);
    }

    /// Register a new pending claim: stored, queued and keyed in one step
    pub(crate) fn insert(&mut self, claim: ExitClaim) {
        self.queues
            .entry(claim.token)
            .or_default()
            .insert(claim.age, claim.exit_id);
        self.open_keys.insert(claim.key(), claim.exit_id);
        self.exits.insert(claim.exit_id, claim);
    }

    /// Apply `update` to a pending claim, keeping its queue entry in step with its age
    pub(crate) fn update(&mut self, exit_id: &ExitId, update: impl FnOnce(&mut ExitClaim)) {
        let Some(claim) = self.exits.get_mut(exit_id) else {
            return;
        };
        let old_age = claim.age;
        update(claim);
        if claim.age != old_age {
            if let Some(queue) = self.queues.get_mut(&claim.token) {
                queue.remove(old_age, claim.exit_id);
                queue.insert(claim.age, claim.exit_id);
            }
        }
    }

    /// Mark a pending claim resolved: dequeued and its key released
    pub(crate) fn resolve(&mut self, exit_id: &ExitId, status: ExitStatus) {
        let Some(claim) = self.exits.get_mut(exit_id) else {
            return;
        };
        claim.status = status;
        let (token, age, key) = (claim.token, claim.age, claim.key());
        if let Some(queue) = self.queues.get_mut(&token) {
            queue.remove(age, *exit_id);
            if queue.is_empty() {
                self.queues.remove(&token);
            }
        }
        if self.open_keys.get(&key) == Some(exit_id) {
            self.open_keys.remove(&key);
        }
    }
}
