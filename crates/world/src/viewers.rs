//! Open-session tracking for container block entities.
//!
//! The counter holds the set of agents currently viewing a container. Only
//! the boundary crossings (0 -> n, n -> 0) fire open/close notifications;
//! every change of the count fires `on_viewer_count_changed`.

use mdlogistics_core::{BlockPos, SimTick};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of an external agent (a player or similar).
pub type AgentId = u64;

/// External rendering/sound layer hooks.
pub trait ViewerNotifier {
    /// First viewer arrived.
    fn on_open(&mut self, pos: BlockPos);
    /// Last viewer left.
    fn on_close(&mut self, pos: BlockPos);
    /// Viewer count changed from `previous` to `count`.
    fn on_viewer_count_changed(&mut self, pos: BlockPos, previous: usize, count: usize);
}

/// "Is this agent still a valid viewer of the container at `pos`?"
pub trait ViewerValidator {
    /// Validity predicate (distance, open menu identity, ...).
    fn is_valid_viewer(&self, agent: AgentId, pos: BlockPos) -> bool;
}

/// Set of agents viewing one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSessionCounter {
    viewers: BTreeSet<AgentId>,
    #[serde(skip)]
    next_recheck: Option<SimTick>,
}

impl OpenSessionCounter {
    /// No viewers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of viewers.
    pub fn open_count(&self) -> usize {
        self.viewers.len()
    }

    /// Whether `agent` is currently viewing.
    pub fn is_viewing(&self, agent: AgentId) -> bool {
        self.viewers.contains(&agent)
    }

    /// Viewing agents in id order.
    pub fn viewers(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.viewers.iter().copied()
    }

    /// Add `agent`. Re-adding an agent already present changes nothing.
    pub fn increment(&mut self, agent: AgentId, pos: BlockPos, notifier: &mut dyn ViewerNotifier) {
        let previous = self.viewers.len();
        if !self.viewers.insert(agent) {
            return;
        }
        if previous == 0 {
            notifier.on_open(pos);
        }
        notifier.on_viewer_count_changed(pos, previous, self.viewers.len());
    }

    /// Remove `agent`. Removing an unknown agent changes nothing.
    pub fn decrement(&mut self, agent: AgentId, pos: BlockPos, notifier: &mut dyn ViewerNotifier) {
        let previous = self.viewers.len();
        if !self.viewers.remove(&agent) {
            return;
        }
        if self.viewers.is_empty() {
            notifier.on_close(pos);
            self.next_recheck = None;
        }
        notifier.on_viewer_count_changed(pos, previous, self.viewers.len());
    }

    /// Drop every viewer `validator` no longer accepts.
    pub fn recheck(
        &mut self,
        pos: BlockPos,
        validator: &dyn ViewerValidator,
        notifier: &mut dyn ViewerNotifier,
    ) {
        let previous = self.viewers.len();
        self.viewers
            .retain(|&agent| validator.is_valid_viewer(agent, pos));
        let count = self.viewers.len();
        if count == previous {
            return;
        }
        if count == 0 {
            notifier.on_close(pos);
            self.next_recheck = None;
        }
        notifier.on_viewer_count_changed(pos, previous, count);
    }

    /// Periodic driver: rechecks every `interval` ticks while anyone is
    /// viewing. The first recheck happens `interval` ticks after the counter
    /// was first seen non-empty.
    pub fn tick(
        &mut self,
        now: SimTick,
        interval: u64,
        pos: BlockPos,
        validator: &dyn ViewerValidator,
        notifier: &mut dyn ViewerNotifier,
    ) {
        if self.viewers.is_empty() {
            self.next_recheck = None;
            return;
        }
        let interval = interval.max(1);
        match self.next_recheck {
            None => self.next_recheck = Some(now.advance(interval)),
            Some(due) if now >= due => {
                self.recheck(pos, validator, notifier);
                if !self.viewers.is_empty() {
                    self.next_recheck = Some(now.advance(interval));
                }
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        opened: u32,
        closed: u32,
        counts: Vec<(usize, usize)>,
    }

    impl ViewerNotifier for Recorder {
        fn on_open(&mut self, _pos: BlockPos) {
            self.opened += 1;
        }
        fn on_close(&mut self, _pos: BlockPos) {
            self.closed += 1;
        }
        fn on_viewer_count_changed(&mut self, _pos: BlockPos, previous: usize, count: usize) {
            self.counts.push((previous, count));
        }
    }

    struct Only(Vec<AgentId>);

    impl ViewerValidator for Only {
        fn is_valid_viewer(&self, agent: AgentId, _pos: BlockPos) -> bool {
            self.0.contains(&agent)
        }
    }

    const POS: BlockPos = BlockPos::new(0, 64, 0);

    #[test]
    fn boundary_callbacks_fire_once() {
        let mut counter = OpenSessionCounter::new();
        let mut rec = Recorder::default();

        for agent in 1..=3 {
            counter.increment(agent, POS, &mut rec);
        }
        assert_eq!(rec.opened, 1);
        assert_eq!(counter.open_count(), 3);

        for agent in 1..=3 {
            counter.decrement(agent, POS, &mut rec);
        }
        assert_eq!(rec.closed, 1);
        assert_eq!(counter.open_count(), 0);
        assert_eq!(
            rec.counts,
            vec![(0, 1), (1, 2), (2, 3), (3, 2), (2, 1), (1, 0)]
        );
    }

    #[test]
    fn duplicate_and_unknown_agents_are_ignored() {
        let mut counter = OpenSessionCounter::new();
        let mut rec = Recorder::default();
        counter.increment(7, POS, &mut rec);
        counter.increment(7, POS, &mut rec);
        counter.decrement(8, POS, &mut rec);
        assert_eq!(counter.open_count(), 1);
        assert_eq!(rec.counts.len(), 1);
    }

    #[test]
    fn recheck_evicts_stale_viewers_and_closes() {
        let mut counter = OpenSessionCounter::new();
        let mut rec = Recorder::default();
        counter.increment(1, POS, &mut rec);
        counter.increment(2, POS, &mut rec);

        counter.recheck(POS, &Only(vec![2]), &mut rec);
        assert_eq!(counter.open_count(), 1);
        assert_eq!(rec.closed, 0);

        counter.recheck(POS, &Only(vec![]), &mut rec);
        assert_eq!(rec.closed, 1);
        assert_eq!(counter.open_count(), 0);
    }

    #[test]
    fn periodic_recheck_waits_for_interval() {
        let mut counter = OpenSessionCounter::new();
        let mut rec = Recorder::default();
        counter.increment(1, POS, &mut rec);
        let nobody = Only(vec![]);

        for t in 10..15 {
            counter.tick(SimTick(t), 5, POS, &nobody, &mut rec);
            assert_eq!(counter.open_count(), 1, "tick {t}");
        }
        counter.tick(SimTick(15), 5, POS, &nobody, &mut rec);
        assert_eq!(counter.open_count(), 0);
        assert_eq!(rec.closed, 1);
    }
}
