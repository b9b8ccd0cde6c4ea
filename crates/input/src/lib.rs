//! Terminal input module.
//!
//! Independent of any UI framework. Maps `crossterm` key events into
//! [`UiCommand`]s and keeps the board cursor that turns a "tap" key into
//! grid coordinates.

pub mod cursor;
pub mod map;

pub use cube_blast_types as types;

pub use cursor::Cursor;
pub use map::{handle_key_event, should_quit, UiCommand};
