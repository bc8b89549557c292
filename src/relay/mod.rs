//! Real-time match relay
//!
//! Room discovery by short numeric code, session lifecycle sync, score/death
//! relay with the anti-cheat gate, and idle-room eviction.

pub mod directory;
pub mod engine;
pub mod reaper;
pub mod registry;

pub use engine::{Relay, RelayConfig};
pub use reaper::Reaper;
