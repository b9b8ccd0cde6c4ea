//! Core game logic module - pure, deterministic, and testable
//!
//! This crate contains the whole match-3 resolution engine. It has no
//! dependencies on UI or networking; the only I/O is reading level files.
//!
//! - **Deterministic**: one seeded RNG drives refills and rocket orientation
//! - **Tick driven**: all delays are simulated milliseconds advanced by
//!   [`Session::tick`], so tests run instantly
//! - **Observable**: every change is published as a [`GameEvent`](types::GameEvent)
//!
//! # Module Structure
//!
//! - [`grid`]: cell storage with buffer and collection rows, generational item ids
//! - [`matching`]: flood fill, group clearing, rocket creation
//! - [`gravity`]: fall cascades, buffer refills, duck collection
//! - [`explosion`]: rockets, combos and projectiles
//! - [`goals`]: per-kind goal counters
//! - [`session`]: level lifecycle, moves, busy gate, win/lose
//! - [`bus`]: synchronous typed event bus
//! - [`level`]: JSON level files and the level catalog
//! - [`config`]: tunable rules
//!
//! # Example
//!
//! ```
//! use cube_blast_core::{LevelCatalog, LevelData, Rules, Session, TapOutcome};
//! use cube_blast_core::types::{ItemKind, SessionState, TICK_MS};
//!
//! let level = LevelData::from_rows(1, 10, &["r r g", "b b g"], &[(ItemKind::Red, 2)]);
//! let mut session = Session::new(Rules::default(), LevelCatalog::from_levels([level])).unwrap();
//! session.start_level(1).unwrap();
//!
//! assert_eq!(session.tap(0, 0), TapOutcome::Accepted);
//! while session.is_busy() {
//!     session.tick(TICK_MS);
//! }
//! assert_eq!(session.state(), SessionState::Finished);
//! ```

pub mod bus;
pub mod config;
pub mod damage;
pub mod explosion;
pub mod goals;
pub mod gravity;
pub mod grid;
pub mod level;
pub mod matching;
pub mod rng;
pub mod session;
pub mod snapshot;

pub use cube_blast_types as types;

// Re-export commonly used types for convenience
pub use bus::{EventBus, SubscriptionId};
pub use config::{ConfigError, Rules};
pub use explosion::{ComboKind, ExplosionResolver, Projectile};
pub use goals::{Goal, GoalTracker};
pub use gravity::{FallOperation, GravityResolver};
pub use grid::{CellPos, Grid, Item, ItemId};
pub use level::{LevelCatalog, LevelData, LevelError, Tile};
pub use matching::{MatchResolver, MatchResult};
pub use rng::BlastRng;
pub use session::{Session, TapOutcome};
pub use snapshot::{GoalSnapshot, ProjectileSnapshot, SessionSnapshot};
