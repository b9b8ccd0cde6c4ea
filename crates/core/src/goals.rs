//! Goal tracker - remaining counts per goal kind
//!
//! Obstacle goals come from the level grid, cube goals from the level file.
//! Counts only go down and never below zero. When a presentation layer is
//! attached, a destruction is parked as a pending collection until the
//! matching `GoalCollectionAnimationComplete` arrives.

use std::collections::BTreeMap;

use crate::types::{GameEvent, ItemKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Goal {
    pub kind: ItemKind,
    pub target: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, Default)]
pub struct GoalTracker {
    obstacles: BTreeMap<ItemKind, Goal>,
    cubes: BTreeMap<ItemKind, Goal>,
    pending: BTreeMap<ItemKind, u32>,
    await_animation: bool,
    win_reported: bool,
}

impl GoalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all goals. Zero-count entries are ignored.
    pub fn seed<O, C>(&mut self, obstacles: O, cubes: C)
    where
        O: IntoIterator<Item = (ItemKind, u32)>,
        C: IntoIterator<Item = (ItemKind, u32)>,
    {
        fn build(entries: impl IntoIterator<Item = (ItemKind, u32)>) -> BTreeMap<ItemKind, Goal> {
            let mut map: BTreeMap<ItemKind, Goal> = BTreeMap::new();
            for (kind, count) in entries.into_iter().filter(|(_, c)| *c > 0) {
                let goal = map.entry(kind).or_insert(Goal {
                    kind,
                    target: 0,
                    remaining: 0,
                });
                goal.target += count;
                goal.remaining += count;
            }
            map
        }
        self.obstacles = build(obstacles);
        self.cubes = build(cubes);
        self.pending.clear();
        self.win_reported = false;
    }

    /// Turning the wait off applies every pending collection at once.
    pub fn set_await_animation(&mut self, enabled: bool, events: &mut Vec<GameEvent>) {
        self.await_animation = enabled;
        if enabled {
            return;
        }
        for (kind, count) in std::mem::take(&mut self.pending) {
            for _ in 0..count {
                self.decrement(kind, events);
            }
        }
    }

    pub fn has_goals(&self) -> bool {
        !self.obstacles.is_empty() || !self.cubes.is_empty()
    }

    /// Obstacle goals first, then cube goals, each in kind order.
    pub fn goals(&self) -> impl Iterator<Item = &Goal> {
        self.obstacles.values().chain(self.cubes.values())
    }

    fn goal_mut(&mut self, kind: ItemKind) -> Option<&mut Goal> {
        if kind.is_obstacle() {
            self.obstacles.get_mut(&kind)
        } else {
            self.cubes.get_mut(&kind)
        }
    }

    pub fn remaining(&self, kind: ItemKind) -> Option<u32> {
        let map = if kind.is_obstacle() {
            &self.obstacles
        } else {
            &self.cubes
        };
        map.get(&kind).map(|g| g.remaining)
    }

    pub fn is_tracked(&self, kind: ItemKind) -> bool {
        self.remaining(kind).is_some()
    }

    /// Record a destroyed item. Returns true if it counted toward a goal
    /// (immediately or as a pending collection).
    pub fn on_destroyed(&mut self, kind: ItemKind, events: &mut Vec<GameEvent>) -> bool {
        match self.remaining(kind) {
            Some(remaining) if remaining > 0 => {}
            _ => return false,
        }
        if self.await_animation {
            *self.pending.entry(kind).or_insert(0) += 1;
            return true;
        }
        self.decrement(kind, events);
        true
    }

    /// A presentation layer finished a collection animation for `kind`.
    pub fn on_collection_complete(&mut self, kind: ItemKind, events: &mut Vec<GameEvent>) -> bool {
        match self.pending.get_mut(&kind) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.pending.remove(&kind);
                }
            }
            _ => {
                log::debug!("unexpected goal animation for {}", kind.as_str());
                return false;
            }
        }
        self.decrement(kind, events);
        true
    }

    fn decrement(&mut self, kind: ItemKind, events: &mut Vec<GameEvent>) {
        if let Some(goal) = self.goal_mut(kind) {
            goal.remaining = goal.remaining.saturating_sub(1);
            let remaining = goal.remaining;
            events.push(GameEvent::GoalUpdated { kind, remaining });
        }
    }

    pub fn pending_animations(&self) -> u32 {
        self.pending.values().sum()
    }

    /// Every goal reached zero.
    pub fn is_complete(&self) -> bool {
        self.has_goals() && self.goals().all(|g| g.remaining == 0)
    }

    /// True exactly once per seeding, the first time goals are complete.
    pub fn take_win(&mut self) -> bool {
        if self.win_reported || !self.is_complete() {
            return false;
        }
        self.win_reported = true;
        true
    }

    /// `GoalUpdated` for every goal, for initial display.
    pub fn announce(&self, events: &mut Vec<GameEvent>) {
        for goal in self.goals() {
            events.push(GameEvent::GoalUpdated {
                kind: goal.kind,
                remaining: goal.remaining,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> GoalTracker {
        let mut t = GoalTracker::new();
        t.seed([(ItemKind::Duck, 2)], [(ItemKind::Red, 1)]);
        t
    }

    #[test]
    fn test_decrements_clamp_at_zero() {
        let mut t = tracker();
        let mut events = Vec::new();
        assert!(t.on_destroyed(ItemKind::Red, &mut events));
        assert!(!t.on_destroyed(ItemKind::Red, &mut events));
        assert_eq!(t.remaining(ItemKind::Red), Some(0));
        assert_eq!(
            events,
            vec![GameEvent::GoalUpdated {
                kind: ItemKind::Red,
                remaining: 0
            }]
        );
    }

    #[test]
    fn test_untracked_kinds_are_ignored() {
        let mut t = tracker();
        let mut events = Vec::new();
        assert!(!t.on_destroyed(ItemKind::Blue, &mut events));
        assert!(!t.on_destroyed(ItemKind::Balloon, &mut events));
        assert!(events.is_empty());
    }

    #[test]
    fn test_win_reported_once() {
        let mut t = tracker();
        let mut events = Vec::new();
        t.on_destroyed(ItemKind::Red, &mut events);
        t.on_destroyed(ItemKind::Duck, &mut events);
        assert!(!t.take_win());
        t.on_destroyed(ItemKind::Duck, &mut events);
        assert!(t.is_complete());
        assert!(t.take_win());
        assert!(!t.take_win());
    }

    #[test]
    fn test_pending_collections_wait_for_animation() {
        let mut t = tracker();
        let mut events = Vec::new();
        t.set_await_animation(true, &mut events);

        assert!(t.on_destroyed(ItemKind::Duck, &mut events));
        assert_eq!(t.pending_animations(), 1);
        assert_eq!(t.remaining(ItemKind::Duck), Some(2));
        assert!(events.is_empty());

        assert!(!t.on_collection_complete(ItemKind::Red, &mut events));
        assert!(t.on_collection_complete(ItemKind::Duck, &mut events));
        assert_eq!(t.pending_animations(), 0);
        assert_eq!(t.remaining(ItemKind::Duck), Some(1));
    }

    #[test]
    fn test_detaching_applies_pending_collections() {
        let mut t = tracker();
        let mut events = Vec::new();
        t.set_await_animation(true, &mut events);
        t.on_destroyed(ItemKind::Duck, &mut events);
        t.on_destroyed(ItemKind::Duck, &mut events);
        assert!(events.is_empty());

        t.set_await_animation(false, &mut events);
        assert_eq!(t.pending_animations(), 0);
        assert_eq!(t.remaining(ItemKind::Duck), Some(0));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_empty_tracker_never_wins() {
        let mut t = GoalTracker::new();
        assert!(!t.has_goals());
        assert!(!t.is_complete());
        assert!(!t.take_win());
    }

    #[test]
    fn test_goals_listed_obstacles_first() {
        let t = tracker();
        let kinds: Vec<_> = t.goals().map(|g| g.kind).collect();
        assert_eq!(kinds, vec![ItemKind::Duck, ItemKind::Red]);
    }
}
