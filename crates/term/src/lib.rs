//! Terminal "game renderer" module.
//!
//! A small, game-oriented rendering layer: the view draws a
//! [`SessionSnapshot`](core::snapshot::SessionSnapshot) into a plain
//! framebuffer, and the renderer flushes only what changed. No widgets or
//! layout engine.

pub mod fb;
pub mod game_view;
pub mod renderer;

pub use cube_blast_core as core;
pub use cube_blast_types as types;

pub use fb::{Cell, CellStyle, FrameBuffer, Rgb};
pub use game_view::{AdapterStatusView, GameView, Hud, Viewport};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
