//! Gravity resolver - cascades, buffer refills and duck collection
//!
//! A cascade is a sequence of passes, one per [`GravityResolver::step`]. Each
//! pass refills the top buffer row wherever a cell below it is open, then
//! scans every column bottom-up and drops each item as far as it can go.
//! Passes repeat until nothing moves and no buffer item is still settling.
//!
//! Fall rules, scanning downward from the item:
//!
//! - an empty buffer or visible cell adds one to the distance
//! - collection rows stop everything except ducks
//! - a duck may fall onto a duck resting in a collection row (the resting
//!   one is collected first)
//! - anything else stops the fall
//!
//! A duck that reaches a collection row is removed immediately and reported
//! with `ObstacleDestroyed`.
//!
//! When a cascade settles it refills the buffer once more, emits
//! `GridUpdated` then `GravityCompleted`, and restarts itself (a bounded
//! number of times) if the top visible row still has a gap.

use std::collections::HashSet;

use crate::config::Rules;
use crate::grid::{CellPos, Grid, ItemId};
use crate::rng::BlastRng;
use crate::types::{GameEvent, ItemKind};

/// One item moving down its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallOperation {
    pub item: ItemId,
    pub kind: ItemKind,
    pub from: CellPos,
    pub to: CellPos,
    pub distance: u32,
}

/// Outcome of a single pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub falls: Vec<FallOperation>,
    /// Buffer items that could fall but have not settled yet.
    pub deferred: usize,
    /// Earliest time a deferred item becomes eligible.
    pub retry_at_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Waiting { until_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct GravityResolver {
    phase: Phase,
    passes: u32,
    restarts: u32,
    max_passes: u32,
    max_restarts: u32,
    settle_ms: u64,
    cascades: u64,
}

impl GravityResolver {
    pub fn new(rules: &Rules) -> Self {
        Self {
            phase: Phase::Idle,
            passes: 0,
            restarts: 0,
            max_passes: rules.max_gravity_passes,
            max_restarts: rules.max_gravity_restarts,
            settle_ms: rules.buffer_settle_ms as u64,
            cascades: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Cascades completed since creation (restarts count separately).
    pub fn cascades(&self) -> u64 {
        self.cascades
    }

    /// Drop any cascade in progress without emitting events.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.passes = 0;
        self.restarts = 0;
    }

    /// Start a cascade. A request while one is running is absorbed by it,
    /// since every pass rescans the whole grid.
    pub fn request(&mut self, events: &mut Vec<GameEvent>) -> bool {
        if self.is_running() {
            return false;
        }
        self.phase = Phase::Running;
        self.passes = 0;
        self.restarts = 0;
        events.push(GameEvent::GravityStarted);
        true
    }

    /// Advance the cascade by at most one pass. Returns true on the step
    /// that leaves the resolver idle.
    pub fn step(
        &mut self,
        grid: &mut Grid,
        rng: &mut BlastRng,
        now_ms: u64,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        match self.phase {
            Phase::Idle => return false,
            Phase::Waiting { until_ms } if now_ms < until_ms => return false,
            Phase::Waiting { .. } | Phase::Running => {}
        }

        if self.passes >= self.max_passes {
            log::warn!(
                "gravity pass cap {} reached; completing cascade early",
                self.max_passes
            );
            return self.finish(grid, rng, now_ms, events);
        }

        let report = self.run_pass(grid, rng, now_ms, events);
        if !report.falls.is_empty() {
            self.passes += 1;
            self.phase = Phase::Running;
            return false;
        }
        if let Some(until_ms) = report.retry_at_ms {
            self.phase = Phase::Waiting { until_ms };
            return false;
        }
        self.finish(grid, rng, now_ms, events)
    }

    /// One full scan: refill, then drop every item that can move.
    pub fn run_pass(
        &self,
        grid: &mut Grid,
        rng: &mut BlastRng,
        now_ms: u64,
        events: &mut Vec<GameEvent>,
    ) -> PassReport {
        repopulate_buffer(grid, rng, now_ms, events);

        let mut report = PassReport::default();
        let mut falling: HashSet<ItemId> = HashSet::new();
        for x in 0..grid.width() as i32 {
            for y in (grid.top_y()..grid.bottom_y()).rev() {
                let from = CellPos::new(x, y);
                let Some(id) = grid.item_at(from) else { continue };
                if falling.contains(&id) {
                    continue;
                }
                let Some(item) = grid.item(id) else { continue };
                let kind = item.kind;
                let spawned_at_ms = item.spawned_at_ms;
                if !kind.can_fall() {
                    continue;
                }
                let distance = fall_distance(grid, from, kind);
                if distance == 0 {
                    continue;
                }
                if grid.is_buffer_row(y) {
                    let ready_at = spawned_at_ms + self.settle_ms;
                    if now_ms < ready_at {
                        report.deferred += 1;
                        report.retry_at_ms =
                            Some(report.retry_at_ms.map_or(ready_at, |t| t.min(ready_at)));
                        continue;
                    }
                }

                let to = from.offset(0, distance as i32);
                if kind.is_duck() && grid.is_collection_row(to.y) {
                    collect_duck(grid, to, events);
                }
                if !grid.move_item(from, to) {
                    continue;
                }
                falling.insert(id);
                events.push(GameEvent::ItemFell {
                    kind,
                    from_x: from.x,
                    from_y: from.y,
                    to_x: to.x,
                    to_y: to.y,
                    distance,
                });
                report.falls.push(FallOperation {
                    item: id,
                    kind,
                    from,
                    to,
                    distance,
                });
                if kind.is_duck() && grid.is_collection_row(to.y) {
                    collect_duck(grid, to, events);
                }
            }
        }
        report
    }

    fn finish(
        &mut self,
        grid: &mut Grid,
        rng: &mut BlastRng,
        now_ms: u64,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        for y in grid.height() as i32..=grid.bottom_y() {
            for x in 0..grid.width() as i32 {
                let pos = CellPos::new(x, y);
                if grid.kind_at(pos).is_some_and(|k| k.is_duck()) {
                    collect_duck(grid, pos, events);
                }
            }
        }
        repopulate_buffer(grid, rng, now_ms, events);
        events.push(GameEvent::GridUpdated);
        events.push(GameEvent::GravityCompleted);
        self.cascades += 1;
        log::debug!(
            "gravity cascade settled after {} passes (restart {})",
            self.passes,
            self.restarts
        );

        if top_row_has_gap(grid) && self.restarts < self.max_restarts {
            self.restarts += 1;
            self.passes = 0;
            self.phase = Phase::Running;
            events.push(GameEvent::GravityStarted);
            return false;
        }
        self.phase = Phase::Idle;
        self.passes = 0;
        self.restarts = 0;
        true
    }
}

/// How far the item at `from` can fall.
pub fn fall_distance(grid: &Grid, from: CellPos, kind: ItemKind) -> u32 {
    let mut distance = 0;
    let mut y = from.y + 1;
    while y <= grid.bottom_y() {
        let pos = CellPos::new(from.x, y);
        let in_collection = grid.is_collection_row(y);
        if in_collection && !kind.is_duck() {
            break;
        }
        match grid.kind_at(pos) {
            None => distance += 1,
            Some(resting) if in_collection && resting.is_duck() => distance += 1,
            Some(_) => break,
        }
        y += 1;
    }
    distance
}

/// Spawn random cubes into empty top-buffer cells whose column has an open
/// buffer or visible cell below. Returns how many were spawned.
pub fn repopulate_buffer(
    grid: &mut Grid,
    rng: &mut BlastRng,
    now_ms: u64,
    events: &mut Vec<GameEvent>,
) -> usize {
    let top = grid.top_y();
    let mut spawned = 0;
    for x in 0..grid.width() as i32 {
        let pos = CellPos::new(x, top);
        if !grid.is_empty(pos) {
            continue;
        }
        let open_below = (top + 1..grid.height() as i32).any(|y| grid.is_empty(CellPos::new(x, y)));
        if !open_below {
            continue;
        }
        let kind = rng.cube();
        if grid.spawn(kind, pos, now_ms).is_some() {
            events.push(GameEvent::ItemSpawned {
                kind,
                x: pos.x,
                y: pos.y,
            });
            spawned += 1;
        }
    }
    spawned
}

/// Fill every empty buffer cell unconditionally (level start).
pub fn fill_buffer_rows(
    grid: &mut Grid,
    rng: &mut BlastRng,
    now_ms: u64,
    events: &mut Vec<GameEvent>,
) -> usize {
    let mut spawned = 0;
    for y in grid.top_y()..0 {
        for x in 0..grid.width() as i32 {
            let pos = CellPos::new(x, y);
            if !grid.is_empty(pos) {
                continue;
            }
            let kind = rng.cube();
            if grid.spawn(kind, pos, now_ms).is_some() {
                events.push(GameEvent::ItemSpawned { kind, x, y });
                spawned += 1;
            }
        }
    }
    spawned
}

fn collect_duck(grid: &mut Grid, pos: CellPos, events: &mut Vec<GameEvent>) {
    if let Some(item) = grid.remove_at(pos) {
        events.push(GameEvent::ObstacleDestroyed {
            kind: item.kind,
            x: pos.x,
            y: pos.y,
        });
    }
}

fn top_row_has_gap(grid: &Grid) -> bool {
    (0..grid.width() as i32).any(|x| grid.is_empty(CellPos::new(x, 0)))
}
