//! Core types module - shared data structures and constants
//!
//! This module defines the vocabulary shared by the resolution engine, the
//! terminal front-end and the AI adapter. Everything here is plain data with
//! no external dependencies.
//!
//! # Coordinates
//!
//! Public coordinates are *visible* coordinates: `x` grows to the right and
//! `y` grows downward, with `(0, 0)` at the top-left visible cell. Cells in
//! the hidden buffer rows above the board have negative `y`; cells in the
//! collection rows below the board have `y >= height`.
//!
//! # Timing Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `DEFAULT_MIN_MATCH` | 2 | Smallest group a tap clears |
//! | `DEFAULT_ROCKET_MATCH` | 4 | Smallest group that forms a rocket |
//!
//! # Examples
//!
//! ```
//! use cube_blast_types::{Axis, ItemKind};
//!
//! let kind = ItemKind::from_token("R").unwrap();
//! assert_eq!(kind, ItemKind::Red);
//! assert!(kind.is_cube());
//!
//! let rocket = ItemKind::rocket(Axis::Vertical);
//! assert_eq!(rocket.token(), "vro");
//! ```

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Default minimum connected-group size that a tap clears.
pub const DEFAULT_MIN_MATCH: usize = 2;

/// Default group size at which a match produces a rocket.
pub const DEFAULT_ROCKET_MATCH: usize = 4;

/// Default hidden rows above the visible board.
pub const DEFAULT_BUFFER_ROWS: u8 = 1;

/// Default collection rows below the visible board.
pub const DEFAULT_COLLECTION_ROWS: u8 = 1;

/// Rocket orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    /// Unit step along the axis, in visible coordinates.
    ///
    /// Horizontal rockets point along +x, vertical rockets along +y.
    pub fn unit(&self) -> (i32, i32) {
        match self {
            Axis::Horizontal => (1, 0),
            Axis::Vertical => (0, 1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Horizontal => "horizontal",
            Axis::Vertical => "vertical",
        }
    }
}

/// Every kind of item that can occupy a cell.
///
/// The derived ordering is stable and used for deterministic goal iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKind {
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    HorizontalRocket,
    VerticalRocket,
    Balloon,
    Duck,
}

impl ItemKind {
    /// The five cube colours, in token order.
    pub const CUBES: [ItemKind; 5] = [
        ItemKind::Red,
        ItemKind::Green,
        ItemKind::Blue,
        ItemKind::Yellow,
        ItemKind::Purple,
    ];

    /// Parse an item token (case-insensitive).
    ///
    /// `"rand"` is a level-file placeholder, not an item kind, and is not
    /// accepted here.
    ///
    /// # Examples
    ///
    /// ```
    /// use cube_blast_types::ItemKind;
    ///
    /// assert_eq!(ItemKind::from_token("ba"), Some(ItemKind::Balloon));
    /// assert_eq!(ItemKind::from_token("HRO"), Some(ItemKind::HorizontalRocket));
    /// assert_eq!(ItemKind::from_token("rand"), None);
    /// ```
    pub fn from_token(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "r" => Some(ItemKind::Red),
            "g" => Some(ItemKind::Green),
            "b" => Some(ItemKind::Blue),
            "y" => Some(ItemKind::Yellow),
            "p" => Some(ItemKind::Purple),
            "hro" => Some(ItemKind::HorizontalRocket),
            "vro" => Some(ItemKind::VerticalRocket),
            "ba" => Some(ItemKind::Balloon),
            "du" => Some(ItemKind::Duck),
            _ => None,
        }
    }

    /// Short token used in level files and on the wire.
    pub fn token(&self) -> &'static str {
        match self {
            ItemKind::Red => "r",
            ItemKind::Green => "g",
            ItemKind::Blue => "b",
            ItemKind::Yellow => "y",
            ItemKind::Purple => "p",
            ItemKind::HorizontalRocket => "hro",
            ItemKind::VerticalRocket => "vro",
            ItemKind::Balloon => "ba",
            ItemKind::Duck => "du",
        }
    }

    /// Human readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Red => "red",
            ItemKind::Green => "green",
            ItemKind::Blue => "blue",
            ItemKind::Yellow => "yellow",
            ItemKind::Purple => "purple",
            ItemKind::HorizontalRocket => "horizontal_rocket",
            ItemKind::VerticalRocket => "vertical_rocket",
            ItemKind::Balloon => "balloon",
            ItemKind::Duck => "duck",
        }
    }

    pub fn rocket(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => ItemKind::HorizontalRocket,
            Axis::Vertical => ItemKind::VerticalRocket,
        }
    }

    pub fn is_cube(&self) -> bool {
        ItemKind::CUBES.contains(self)
    }

    pub fn is_rocket(&self) -> bool {
        self.rocket_axis().is_some()
    }

    pub fn is_obstacle(&self) -> bool {
        matches!(self, ItemKind::Balloon | ItemKind::Duck)
    }

    pub fn is_duck(&self) -> bool {
        matches!(self, ItemKind::Duck)
    }

    pub fn rocket_axis(&self) -> Option<Axis> {
        match self {
            ItemKind::HorizontalRocket => Some(Axis::Horizontal),
            ItemKind::VerticalRocket => Some(Axis::Vertical),
            _ => None,
        }
    }

    /// Hit points for a freshly placed item.
    pub fn max_health(&self) -> u8 {
        1
    }

    /// Whether gravity moves this item. Every current kind falls.
    pub fn can_fall(&self) -> bool {
        true
    }

    /// Obstacle damage rules. Cubes and rockets are never "damaged"; they
    /// are destroyed or triggered by the resolvers instead.
    ///
    /// ```
    /// use cube_blast_types::{DamageSource, ItemKind};
    ///
    /// assert!(ItemKind::Balloon.can_take_damage_from(DamageSource::AdjacentBlast));
    /// assert!(!ItemKind::Duck.can_take_damage_from(DamageSource::Rocket));
    /// ```
    pub fn can_take_damage_from(&self, source: DamageSource) -> bool {
        match self {
            ItemKind::Balloon => matches!(
                source,
                DamageSource::AdjacentBlast | DamageSource::Rocket
            ),
            _ => false,
        }
    }
}

/// What inflicted damage on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DamageSource {
    /// A cube match next to the item.
    AdjacentBlast,
    /// A rocket explosion or projectile.
    Rocket,
}

/// Projectile travel direction, in visible coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// The two directions a rocket of this axis fires in.
    pub fn along(axis: Axis) -> [Direction; 2] {
        match axis {
            Axis::Horizontal => [Direction::Right, Direction::Left],
            Axis::Vertical => [Direction::Down, Direction::Up],
        }
    }

    /// Unit offset perpendicular to travel, used to fan out parallel lanes.
    pub fn perpendicular(&self) -> (i32, i32) {
        match self {
            Direction::Up | Direction::Down => (1, 0),
            Direction::Left | Direction::Right => (0, 1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    MainMenu,
    Playing,
    Paused,
    GameWon,
    GameLost,
    /// Every level in the catalog has been won.
    Finished,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::MainMenu => "main_menu",
            SessionState::Playing => "playing",
            SessionState::Paused => "paused",
            SessionState::GameWon => "game_won",
            SessionState::GameLost => "game_lost",
            SessionState::Finished => "finished",
        }
    }
}

/// Everything observable that happens in a session.
///
/// Positions are visible coordinates (see the module docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    ItemSpawned {
        kind: ItemKind,
        x: i32,
        y: i32,
    },
    ItemDestroyed {
        kind: ItemKind,
        x: i32,
        y: i32,
    },
    ItemFell {
        kind: ItemKind,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
        distance: u32,
    },
    MatchFound {
        kind: ItemKind,
        size: usize,
    },
    MatchProcessed {
        kind: ItemKind,
        size: usize,
        rocket_created: bool,
    },
    RocketCreated {
        kind: ItemKind,
        x: i32,
        y: i32,
    },
    RocketExploded {
        kind: ItemKind,
        x: i32,
        y: i32,
        is_combo: bool,
    },
    ProjectileLaunched {
        x: i32,
        y: i32,
        direction: Direction,
    },
    ProjectileFinished {
        x: i32,
        y: i32,
        direction: Direction,
    },
    ObstacleDamaged {
        kind: ItemKind,
        x: i32,
        y: i32,
        health: u8,
    },
    ObstacleDestroyed {
        kind: ItemKind,
        x: i32,
        y: i32,
    },
    GravityStarted,
    GravityCompleted,
    GridUpdated,
    GoalUpdated {
        kind: ItemKind,
        remaining: u32,
    },
    MovesChanged {
        remaining: u32,
    },
    GameStateChanged {
        from: SessionState,
        to: SessionState,
    },
    LevelStarted {
        level: u32,
    },
    LevelWon {
        level: u32,
    },
    LevelLost {
        level: u32,
    },
}

impl GameEvent {
    /// Stable snake_case name, used in logs and on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::ItemSpawned { .. } => "item_spawned",
            GameEvent::ItemDestroyed { .. } => "item_destroyed",
            GameEvent::ItemFell { .. } => "item_fell",
            GameEvent::MatchFound { .. } => "match_found",
            GameEvent::MatchProcessed { .. } => "match_processed",
            GameEvent::RocketCreated { .. } => "rocket_created",
            GameEvent::RocketExploded { .. } => "rocket_exploded",
            GameEvent::ProjectileLaunched { .. } => "projectile_launched",
            GameEvent::ProjectileFinished { .. } => "projectile_finished",
            GameEvent::ObstacleDamaged { .. } => "obstacle_damaged",
            GameEvent::ObstacleDestroyed { .. } => "obstacle_destroyed",
            GameEvent::GravityStarted => "gravity_started",
            GameEvent::GravityCompleted => "gravity_completed",
            GameEvent::GridUpdated => "grid_updated",
            GameEvent::GoalUpdated { .. } => "goal_updated",
            GameEvent::MovesChanged { .. } => "moves_changed",
            GameEvent::GameStateChanged { .. } => "game_state_changed",
            GameEvent::LevelStarted { .. } => "level_started",
            GameEvent::LevelWon { .. } => "level_won",
            GameEvent::LevelLost { .. } => "level_lost",
        }
    }
}

/// Player (or automation) input delivered to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// `kind` is what the sender saw in the cell.
    CubeTapped { x: i32, y: i32, kind: ItemKind },
    RocketTapped { x: i32, y: i32, kind: ItemKind },
    /// A presentation layer finished flying a collected item into its goal.
    GoalCollectionAnimationComplete { kind: ItemKind, x: i32, y: i32 },
}
