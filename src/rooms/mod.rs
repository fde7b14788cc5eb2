//! Room key store: one hybrid key per room, provisioned on request and read by
//! the per-room encrypt/decrypt operations.

pub mod store;

pub use store::{Result, RoomError, RoomKeyStore};
