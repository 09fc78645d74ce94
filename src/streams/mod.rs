//! Stream Key Module
//! Mission: Key registry consulted by the media server's publish hooks

pub mod api;
pub mod store;

pub use api::StreamState;
pub use store::StreamKeyStore;
