//! Session state machine - levels, moves, the busy gate and win/lose
//!
//! A [`Session`] owns the grid, every resolver and the event bus. It is
//! driven by two entry points: input ([`Session::tap`] /
//! [`Session::handle_input`]) and time ([`Session::tick`]).
//!
//! # Moves
//!
//! An accepted tap spends one move and marks the session busy until the
//! whole move has played out:
//!
//! 1. match settle delay (cube taps only)
//! 2. projectiles land and the explosion settle period passes
//! 3. gravity cascades to rest
//! 4. pending goal collection animations complete
//!
//! Then the lose condition is checked and the busy gate is released. Wins are
//! detected as soon as the last goal reaches zero, even mid-cascade.
//!
//! Events from every component are queued and dispatched to subscribers
//! before the call that produced them returns.

use std::collections::BTreeSet;

use crate::bus::{EventBus, SubscriptionId};
use crate::config::{ConfigError, Rules};
use crate::explosion::ExplosionResolver;
use crate::goals::GoalTracker;
use crate::gravity::{fill_buffer_rows, GravityResolver};
use crate::grid::{CellPos, Grid};
use crate::level::{LevelCatalog, LevelError, Tile};
use crate::matching::MatchResolver;
use crate::rng::BlastRng;
use crate::snapshot::{GoalSnapshot, ProjectileSnapshot, SessionSnapshot};
use crate::types::{GameEvent, InputEvent, ItemKind, SessionState};

/// Result of delivering an input to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    Accepted,
    /// Not in the `Playing` state.
    NotPlaying,
    /// A previous move is still resolving.
    Busy,
    OutOfBounds,
    /// The cell does not hold something the input applies to.
    NoEffect,
    /// The cube's group is below the match threshold.
    NoMatch,
}

impl TapOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TapOutcome::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TapOutcome::Accepted => "accepted",
            TapOutcome::NotPlaying => "not_playing",
            TapOutcome::Busy => "busy",
            TapOutcome::OutOfBounds => "out_of_bounds",
            TapOutcome::NoEffect => "no_effect",
            TapOutcome::NoMatch => "no_match",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MovePhase {
    Idle,
    Settling { until_ms: u64 },
    AwaitCascade,
    AwaitGoalAnimations,
}

pub struct Session {
    rules: Rules,
    catalog: LevelCatalog,
    grid: Grid,
    rng: BlastRng,
    matcher: MatchResolver,
    gravity: GravityResolver,
    explosions: ExplosionResolver,
    goals: GoalTracker,
    bus: EventBus,
    outbox: Vec<GameEvent>,
    state: SessionState,
    level: Option<u32>,
    moves: u32,
    now_ms: u64,
    phase: MovePhase,
    animations: u32,
    presentation_attached: bool,
    completed: BTreeSet<u32>,
}

impl Session {
    pub fn new(rules: Rules, catalog: LevelCatalog) -> Result<Self, ConfigError> {
        rules.validate()?;
        Ok(Self {
            grid: Grid::new(0, 0, rules.buffer_rows, rules.collection_rows),
            rng: BlastRng::new(rules.seed),
            matcher: MatchResolver::new(&rules),
            gravity: GravityResolver::new(&rules),
            explosions: ExplosionResolver::new(&rules),
            goals: GoalTracker::new(),
            bus: EventBus::new(),
            outbox: Vec::new(),
            state: SessionState::MainMenu,
            level: None,
            moves: 0,
            now_ms: 0,
            phase: MovePhase::Idle,
            animations: 0,
            presentation_attached: false,
            completed: BTreeSet::new(),
            rules,
            catalog,
        })
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn goals(&self) -> &GoalTracker {
        &self.goals
    }

    pub fn explosions(&self) -> &ExplosionResolver {
        &self.explosions
    }

    pub fn gravity(&self) -> &GravityResolver {
        &self.gravity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn level(&self) -> Option<u32> {
        self.level
    }

    pub fn moves_remaining(&self) -> u32 {
        self.moves
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_completed(&self, level: u32) -> bool {
        self.completed.contains(&level)
    }

    pub fn subscribe<F>(&mut self, f: F) -> SubscriptionId
    where
        F: FnMut(&GameEvent) + Send + 'static,
    {
        self.bus.subscribe(f)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// A move is resolving or something is still animating.
    pub fn is_busy(&self) -> bool {
        self.phase != MovePhase::Idle
            || self.animations > 0
            || self.gravity.is_running()
            || self.explosions.is_active()
            || self.goals.pending_animations() > 0
    }

    /// Declare whether a presentation layer will report goal collection
    /// animations. While attached, goal decrements wait for them. Detaching
    /// applies whatever was still waiting.
    pub fn set_presentation_attached(&mut self, attached: bool) {
        self.presentation_attached = attached;
        self.goals.set_await_animation(attached, &mut self.outbox);
        self.flush();
        self.advance_move();
        self.flush();
    }

    pub fn is_presentation_attached(&self) -> bool {
        self.presentation_attached
    }

    pub fn begin_animation(&mut self) {
        self.animations += 1;
    }

    pub fn end_animation(&mut self) {
        self.animations = self.animations.saturating_sub(1);
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn start_level(&mut self, number: u32) -> Result<(), LevelError> {
        let level = self
            .catalog
            .get(number)
            .cloned()
            .ok_or(LevelError::UnknownLevel(number))?;
        level.validate()?;

        self.teardown();
        self.grid.reinitialize(level.width(), level.height());
        for (pos, tile) in level.tiles() {
            let kind = match tile {
                Tile::Empty => continue,
                Tile::Item(kind) => kind,
                Tile::RandomCube => self.rng.cube(),
            };
            if self.grid.spawn(kind, pos, self.now_ms).is_some() {
                self.outbox.push(GameEvent::ItemSpawned {
                    kind,
                    x: pos.x,
                    y: pos.y,
                });
            }
        }
        fill_buffer_rows(&mut self.grid, &mut self.rng, self.now_ms, &mut self.outbox);

        self.goals.seed(level.obstacle_goals(), level.cube_goals());
        self.goals
            .set_await_animation(self.presentation_attached, &mut self.outbox);
        self.level = Some(number);
        self.moves = level.moves();

        self.change_state(SessionState::Playing);
        self.outbox.push(GameEvent::LevelStarted { level: number });
        self.outbox.push(GameEvent::MovesChanged {
            remaining: self.moves,
        });
        self.goals.announce(&mut self.outbox);
        self.outbox.push(GameEvent::GridUpdated);
        log::info!(
            "level {} started: {}x{}, {} moves",
            number,
            level.width(),
            level.height(),
            self.moves
        );
        self.flush();
        Ok(())
    }

    /// Restart the current level, or start the first one if none was played.
    pub fn restart_level(&mut self) -> Result<(), LevelError> {
        let number = self
            .level
            .or_else(|| self.catalog.first())
            .ok_or(LevelError::UnknownLevel(0))?;
        self.start_level(number)
    }

    /// Start the level after the current one. Only offered after a win or
    /// from the main menu. Past the last level the session goes to
    /// `Finished` once every level is completed, and back to `MainMenu`
    /// otherwise.
    pub fn next_level(&mut self) -> Result<(), LevelError> {
        if !matches!(self.state, SessionState::GameWon | SessionState::MainMenu) {
            return Err(LevelError::NextLevelUnavailable(self.state));
        }
        let next = match self.level {
            Some(current) => self.catalog.next_after(current),
            None => self.catalog.first(),
        };
        match next {
            Some(number) => self.start_level(number),
            None => {
                if self.all_completed() {
                    self.teardown();
                    self.change_state(SessionState::Finished);
                    self.flush();
                } else {
                    self.return_to_main_menu();
                }
                Ok(())
            }
        }
    }

    fn all_completed(&self) -> bool {
        !self.catalog.is_empty() && self.catalog.numbers().all(|n| self.completed.contains(&n))
    }

    pub fn return_to_main_menu(&mut self) {
        self.teardown();
        if self.state != SessionState::Finished {
            self.change_state(SessionState::MainMenu);
        }
        self.flush();
    }

    pub fn pause(&mut self) -> bool {
        if self.state != SessionState::Playing {
            return false;
        }
        self.change_state(SessionState::Paused);
        self.flush();
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        self.change_state(SessionState::Playing);
        self.flush();
        true
    }

    fn teardown(&mut self) {
        self.explosions.clear();
        self.gravity.reset();
        self.phase = MovePhase::Idle;
        self.animations = 0;
    }

    fn change_state(&mut self, to: SessionState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        self.outbox.push(GameEvent::GameStateChanged { from, to });
    }

    /// Spend one move. No effect outside `Playing`; never below zero.
    pub fn use_move(&mut self) {
        if self.state != SessionState::Playing {
            return;
        }
        self.moves = self.moves.saturating_sub(1);
        self.outbox.push(GameEvent::MovesChanged {
            remaining: self.moves,
        });
    }

    fn win_level(&mut self) {
        let Some(level) = self.level else { return };
        if self.state != SessionState::Playing {
            return;
        }
        self.completed.insert(level);
        self.change_state(if self.all_completed() {
            SessionState::Finished
        } else {
            SessionState::GameWon
        });
        self.outbox.push(GameEvent::LevelWon { level });
        log::info!("level {} won with {} moves left", level, self.moves);
    }

    fn lose_level(&mut self) {
        let Some(level) = self.level else { return };
        if self.state != SessionState::Playing {
            return;
        }
        self.change_state(SessionState::GameLost);
        self.outbox.push(GameEvent::LevelLost { level });
        log::info!("level {} lost", level);
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    pub fn handle_input(&mut self, input: InputEvent) -> TapOutcome {
        match input {
            InputEvent::CubeTapped { x, y, kind } => self.tap_cube(CellPos::new(x, y), Some(kind)),
            InputEvent::RocketTapped { x, y, kind } => {
                self.tap_rocket(CellPos::new(x, y), Some(kind))
            }
            InputEvent::GoalCollectionAnimationComplete { kind, .. } => {
                self.goal_animation_complete(kind)
            }
        }
    }

    /// Tap whatever is at visible `(x, y)`.
    pub fn tap(&mut self, x: i32, y: i32) -> TapOutcome {
        let pos = CellPos::new(x, y);
        match self.grid.kind_at(pos) {
            Some(kind) if kind.is_rocket() => self.tap_rocket(pos, None),
            _ => self.tap_cube(pos, None),
        }
    }

    fn check_tap(&self, pos: CellPos, expected: Option<ItemKind>) -> Result<(), TapOutcome> {
        if self.state != SessionState::Playing {
            return Err(TapOutcome::NotPlaying);
        }
        if self.is_busy() {
            return Err(TapOutcome::Busy);
        }
        if !self.grid.is_visible(pos) {
            return Err(TapOutcome::OutOfBounds);
        }
        if expected.is_some_and(|kind| self.grid.kind_at(pos) != Some(kind)) {
            return Err(TapOutcome::NoEffect);
        }
        Ok(())
    }

    /// A tap carrying a stale `expected` kind (the cell changed since the
    /// sender looked) has no effect.
    fn tap_cube(&mut self, pos: CellPos, expected: Option<ItemKind>) -> TapOutcome {
        if let Err(outcome) = self.check_tap(pos, expected) {
            return outcome;
        }
        if !self.grid.kind_at(pos).is_some_and(|k| k.is_cube()) {
            return TapOutcome::NoEffect;
        }
        if self.matcher.find_group(&self.grid, pos).len() < self.matcher.min_match_size() {
            return TapOutcome::NoMatch;
        }

        self.use_move();
        let result = self.matcher.resolve(
            &mut self.grid,
            pos,
            &mut self.rng,
            self.now_ms,
            &mut self.outbox,
        );
        if result.is_none() {
            // find_group already vetted the tap; nothing was removed.
            log::warn!("match at ({}, {}) resolved to nothing", pos.x, pos.y);
        }
        self.gravity.request(&mut self.outbox);
        self.phase = MovePhase::Settling {
            until_ms: self.now_ms + self.rules.match_settle_ms as u64,
        };
        self.flush();
        TapOutcome::Accepted
    }

    fn tap_rocket(&mut self, pos: CellPos, expected: Option<ItemKind>) -> TapOutcome {
        if let Err(outcome) = self.check_tap(pos, expected) {
            return outcome;
        }
        if !self.grid.kind_at(pos).is_some_and(|k| k.is_rocket()) {
            return TapOutcome::NoEffect;
        }

        self.use_move();
        self.explosions
            .trigger(&mut self.grid, pos, self.now_ms, &mut self.outbox);
        self.phase = MovePhase::AwaitCascade;
        self.flush();
        TapOutcome::Accepted
    }

    fn goal_animation_complete(&mut self, kind: ItemKind) -> TapOutcome {
        if !self.presentation_attached {
            return TapOutcome::NoEffect;
        }
        let counted = self.goals.on_collection_complete(kind, &mut self.outbox);
        self.flush();
        self.advance_move();
        self.flush();
        if counted {
            TapOutcome::Accepted
        } else {
            TapOutcome::NoEffect
        }
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Advance by `elapsed_ms`. Nothing moves while paused.
    pub fn tick(&mut self, elapsed_ms: u32) {
        if self.state == SessionState::Paused {
            return;
        }
        self.now_ms += elapsed_ms as u64;

        self.explosions
            .step(&mut self.grid, self.now_ms, &mut self.outbox);
        if self.explosions.take_settled(self.now_ms) {
            self.gravity.request(&mut self.outbox);
        }
        self.gravity
            .step(&mut self.grid, &mut self.rng, self.now_ms, &mut self.outbox);
        self.flush();

        self.advance_move();
        self.flush();
    }

    fn advance_move(&mut self) {
        loop {
            match self.phase {
                MovePhase::Idle => return,
                MovePhase::Settling { until_ms } => {
                    if self.now_ms < until_ms {
                        return;
                    }
                    self.phase = MovePhase::AwaitCascade;
                }
                MovePhase::AwaitCascade => {
                    if self.explosions.is_active() || self.gravity.is_running() {
                        return;
                    }
                    self.phase = MovePhase::AwaitGoalAnimations;
                }
                MovePhase::AwaitGoalAnimations => {
                    if self.goals.pending_animations() > 0 || self.animations > 0 {
                        return;
                    }
                    self.phase = MovePhase::Idle;
                    self.finish_move();
                }
            }
        }
    }

    fn finish_move(&mut self) {
        if self.state != SessionState::Playing {
            return;
        }
        if self.goals.take_win() {
            self.win_level();
        } else if self.moves == 0 && !self.goals.is_complete() {
            self.lose_level();
        }
        log::debug!("move finished: {} moves left", self.moves);
    }

    /// Dispatch queued events, letting the goal tracker react first.
    fn flush(&mut self) {
        while !self.outbox.is_empty() {
            let batch = std::mem::take(&mut self.outbox);
            for event in &batch {
                self.react(event);
                log::trace!("event {:?}", event);
                self.bus.publish(event);
            }
        }
    }

    fn react(&mut self, event: &GameEvent) {
        match *event {
            GameEvent::ItemDestroyed { kind, .. } | GameEvent::ObstacleDestroyed { kind, .. } => {
                self.goals.on_destroyed(kind, &mut self.outbox);
            }
            GameEvent::GoalUpdated { .. } => {
                if self.state == SessionState::Playing && self.goals.take_win() {
                    self.win_level();
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn snapshot_into(&self, out: &mut SessionSnapshot) {
        out.state = self.state;
        out.level = self.level;
        out.moves = self.moves;
        out.busy = self.is_busy();
        out.width = self.grid.width();
        out.height = self.grid.height();
        out.cells.clear();
        out.cells
            .extend(self.grid.visible_cells().map(|pos| self.grid.kind_at(pos)));
        out.goals.clear();
        out.goals.extend(self.goals.goals().map(|g| GoalSnapshot {
            kind: g.kind,
            target: g.target,
            remaining: g.remaining,
        }));
        out.projectiles.clear();
        out.projectiles
            .extend(self.explosions.projectiles().iter().map(|p| ProjectileSnapshot {
                x: p.pos.x,
                y: p.pos.y,
                direction: p.direction,
            }));
        out.now_ms = self.now_ms;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut s = SessionSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    #[cfg(test)]
    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("level", &self.level)
            .field("moves", &self.moves)
            .field("now_ms", &self.now_ms)
            .field("busy", &self.is_busy())
            .finish()
    }
}
