//! Secret lifecycle for orchestration blueprints.
//!
//! - `crypto`: scrypt key derivation and AES-256-GCM sealing.
//! - `vault`: a local SQLite store of named, individually sealed secrets.
//! - `tree`: addressing nodes inside JSON configuration trees.
//! - `redact`: strip secrets out of a tree before it is transmitted, and
//!   patch them back in once the tree has round-tripped.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod redact;
pub mod tree;
pub mod vault;
