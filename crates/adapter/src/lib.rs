//! Adapter module - remote control via TCP socket with JSON protocol
//!
//! Lets an external client (a bot, a test harness, a second UI) play the
//! same session the terminal shows. The game loop stays synchronous and
//! owns the [`Session`](core::Session); this crate runs a tokio server on
//! its own runtime and talks to the loop over channels.
//!
//! # Protocol Overview
//!
//! A **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: client connects (default: 127.0.0.1:7878)
//! 2. **Handshake**: client sends `hello`, server answers `welcome` and then a `snapshot`.
//!    A `hello` with `"presentation": true` makes goal updates wait for that
//!    client's `goal_animation_complete` messages.
//! 3. **Commanding**: `tap`, `restart`, `next_level`, `goal_animation_complete`
//! 4. **Events**: every core event is streamed as an `event` line
//!
//! Every client message carries a `seq` that must strictly increase per
//! connection. Commands are acknowledged by the game loop after they are
//! applied, so an `ack` follows the events the command produced.
//!
//! # Environment Variables
//!
//! - `CUBE_BLAST_AI_HOST`: bind address (default: "127.0.0.1")
//! - `CUBE_BLAST_AI_PORT`: port number (default: 7878)
//! - `CUBE_BLAST_AI_MAX_PENDING`: command queue depth before `backpressure` errors
//! - `CUBE_BLAST_AI_LOG_PATH`: append every wire line to this file
//! - `CUBE_BLAST_AI_DISABLED`: set to "1" or "true" to disable the adapter
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"client":"bot"}
//! Server -> Client: {"type":"welcome","seq":1,"ts":1700000000000,"protocol_version":"1.0.0","client_id":1,"game_id":"cube-blast"}
//! Server -> Client: {"type":"snapshot","ts":1700000000001,"state":"playing","level":1,"moves":20,...}
//! Client -> Server: {"type":"tap","seq":2,"x":3,"y":4}
//! Server -> Client: {"type":"event","ts":1700000000002,"event":{"name":"match_found","kind":"r","size":3}}
//! Server -> Client: {"type":"ack","seq":2,"ts":1700000000003,"accepted":true,"outcome":"accepted"}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use cube_blast_core as core;
pub use cube_blast_types as types;

// Re-export protocol types for convenience
pub use protocol::*;
pub use runtime::{
    apply_command, serve_command, stream_events, Adapter, ClientCommand, CommandOutcome,
    InboundCommand, OutboundMessage,
};
pub use server::*;
