//! Chat platform adapters that feed the mapping engine.

#[cfg(feature = "channel-discord")]
pub mod discord;
