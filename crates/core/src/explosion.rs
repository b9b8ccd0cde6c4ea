//! Explosion resolver - rockets, combos and projectiles
//!
//! Tapping a rocket looks for up to two rockets connected to it:
//!
//! | Connected | Effect |
//! |-----------|--------|
//! | 0 | the rocket fires two projectiles along its axis |
//! | 1 | both rockets go off: cross hit on the tapped cell, four projectiles |
//! | 2 | all three go off: 3x3 hit, three parallel lanes in each direction |
//!
//! Rockets are removed from the grid the moment they trigger, so a rocket can
//! never go off twice. Projectiles advance one cell every
//! `projectile_step_ms`, destroying cubes, damaging obstacles and detonating
//! any rocket they meet. Once the last projectile is gone and
//! `projectile_settle_ms` has passed, [`ExplosionResolver::take_settled`]
//! reports true exactly once so gravity can run.

use std::collections::VecDeque;

use arrayvec::ArrayVec;

use crate::config::Rules;
use crate::damage::{hit_cell, HitOutcome};
use crate::grid::{CellPos, Grid};
use crate::types::{Axis, DamageSource, Direction, GameEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projectile {
    pub pos: CellPos,
    pub direction: Direction,
    next_step_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboKind {
    Single,
    Cross,
    Area,
}

#[derive(Debug, Clone)]
pub struct ExplosionResolver {
    projectiles: Vec<Projectile>,
    step_ms: u64,
    settle_ms: u64,
    combo_delay_ms: u64,
    settle_at: Option<u64>,
    launched: u64,
}

impl ExplosionResolver {
    pub fn new(rules: &Rules) -> Self {
        Self {
            projectiles: Vec::new(),
            step_ms: rules.projectile_step_ms as u64,
            settle_ms: rules.projectile_settle_ms as u64,
            combo_delay_ms: rules.combo_projectile_delay_ms as u64,
            settle_at: None,
            launched: 0,
        }
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn in_flight(&self) -> usize {
        self.projectiles.len()
    }

    /// Projectiles in flight or the post-flight settle still pending.
    pub fn is_active(&self) -> bool {
        !self.projectiles.is_empty() || self.settle_at.is_some()
    }

    /// Projectiles launched since creation.
    pub fn launched(&self) -> u64 {
        self.launched
    }

    /// Drop every projectile and pending settle without events.
    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.settle_at = None;
    }

    /// Rockets 4-connected to `origin`, breadth-first, at most two.
    pub fn connected_rockets(&self, grid: &Grid, origin: CellPos) -> ArrayVec<CellPos, 2> {
        let mut found = ArrayVec::new();
        let mut seen = vec![origin];
        let mut queue = VecDeque::from([origin]);
        while let Some(pos) = queue.pop_front() {
            for next in grid.adjacent(pos) {
                if found.is_full() {
                    return found;
                }
                if seen.contains(&next) || !grid.kind_at(next).is_some_and(|k| k.is_rocket()) {
                    continue;
                }
                seen.push(next);
                found.push(next);
                queue.push_back(next);
            }
        }
        found
    }

    /// Detonate the rocket at `origin`. Returns `None` if there is no
    /// visible rocket there.
    pub fn trigger(
        &mut self,
        grid: &mut Grid,
        origin: CellPos,
        now_ms: u64,
        events: &mut Vec<GameEvent>,
    ) -> Option<ComboKind> {
        if !grid.is_visible(origin) || !grid.kind_at(origin).is_some_and(|k| k.is_rocket()) {
            return None;
        }
        let partners = self.connected_rockets(grid, origin);
        let combo = match partners.len() {
            0 => ComboKind::Single,
            1 => ComboKind::Cross,
            _ => ComboKind::Area,
        };
        log::debug!(
            "rocket at ({}, {}) triggers {:?}",
            origin.x,
            origin.y,
            combo
        );

        if combo == ComboKind::Single {
            self.explode_single(grid, origin, now_ms, events);
            return Some(combo);
        }

        self.consume_rocket(grid, origin, true, events);
        for partner in &partners {
            self.consume_rocket(grid, *partner, true, events);
        }

        let launch_at = now_ms + self.combo_delay_ms;
        match combo {
            ComboKind::Cross => {
                let mut cells = vec![origin];
                cells.extend(grid.adjacent(origin));
                for pos in cells {
                    self.hit(grid, pos, now_ms, events);
                }
                for direction in Direction::ALL {
                    self.launch(origin, direction, launch_at, events);
                }
            }
            _ => {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let pos = origin.offset(dx, dy);
                        if grid.is_visible(pos) {
                            self.hit(grid, pos, now_ms, events);
                        }
                    }
                }
                for direction in Direction::ALL {
                    let (px, py) = direction.perpendicular();
                    for lane in -1..=1 {
                        let start = origin.offset(px * lane, py * lane);
                        if grid.is_visible(start) {
                            self.launch(start, direction, launch_at, events);
                        }
                    }
                }
            }
        }
        Some(combo)
    }

    /// A lone rocket: remove it and fire both ways along its axis.
    fn explode_single(
        &mut self,
        grid: &mut Grid,
        pos: CellPos,
        now_ms: u64,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(axis) = self.consume_rocket(grid, pos, false, events) else {
            return;
        };
        for direction in Direction::along(axis) {
            self.launch(pos, direction, now_ms, events);
        }
    }

    fn consume_rocket(
        &mut self,
        grid: &mut Grid,
        pos: CellPos,
        is_combo: bool,
        events: &mut Vec<GameEvent>,
    ) -> Option<Axis> {
        let id = grid.item_at(pos)?;
        let axis = grid.item(id)?.kind.rocket_axis()?;
        let item = grid.destroy(id)?;
        events.push(GameEvent::RocketExploded {
            kind: item.kind,
            x: pos.x,
            y: pos.y,
            is_combo,
        });
        Some(axis)
    }

    fn hit(&mut self, grid: &mut Grid, pos: CellPos, now_ms: u64, events: &mut Vec<GameEvent>) {
        if let HitOutcome::Rocket(_) = hit_cell(grid, pos, DamageSource::Rocket, events) {
            self.explode_single(grid, pos, now_ms, events);
        }
    }

    fn launch(
        &mut self,
        from: CellPos,
        direction: Direction,
        launch_at_ms: u64,
        events: &mut Vec<GameEvent>,
    ) {
        self.projectiles.push(Projectile {
            pos: from,
            direction,
            next_step_ms: launch_at_ms + self.step_ms,
        });
        self.launched += 1;
        self.settle_at = None;
        events.push(GameEvent::ProjectileLaunched {
            x: from.x,
            y: from.y,
            direction,
        });
    }

    /// Advance every projectile that is due, including ones launched by
    /// chain reactions during this call.
    pub fn step(&mut self, grid: &mut Grid, now_ms: u64, events: &mut Vec<GameEvent>) {
        if self.projectiles.is_empty() {
            return;
        }
        let mut i = 0;
        while i < self.projectiles.len() {
            let mut shot = self.projectiles[i];
            let mut finished = false;
            while shot.next_step_ms <= now_ms {
                let (dx, dy) = shot.direction.delta();
                let next = shot.pos.offset(dx, dy);
                if !grid.is_visible(next) {
                    finished = true;
                    break;
                }
                shot.pos = next;
                shot.next_step_ms += self.step_ms;
                self.hit(grid, next, now_ms, events);
            }
            if finished {
                events.push(GameEvent::ProjectileFinished {
                    x: shot.pos.x,
                    y: shot.pos.y,
                    direction: shot.direction,
                });
                self.projectiles.remove(i);
            } else {
                self.projectiles[i] = shot;
                i += 1;
            }
        }
        if self.projectiles.is_empty() {
            self.settle_at = Some(now_ms + self.settle_ms);
        }
    }

    /// True once, when the last projectile has finished and the settle
    /// period has elapsed.
    pub fn take_settled(&mut self, now_ms: u64) -> bool {
        match self.settle_at {
            Some(at) if self.projectiles.is_empty() && now_ms >= at => {
                self.settle_at = None;
                true
            }
            _ => false,
        }
    }
}
