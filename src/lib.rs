//! Cube Blast (workspace facade crate).
//!
//! Re-exports the member crates under one name so binaries, integration
//! tests and benches can write `cube_blast::{core,adapter,term,input,types}`.

pub use cube_blast_adapter as adapter;
pub use cube_blast_core as core;
pub use cube_blast_input as input;
pub use cube_blast_term as term;
pub use cube_blast_types as types;
