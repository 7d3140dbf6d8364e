//! Connector configuration types.

mod profile;

pub use profile::{ConnectionProfile, engine_for_scheme};
