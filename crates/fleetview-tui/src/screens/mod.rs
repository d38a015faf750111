//! Screen components.

pub mod fleet;

pub use fleet::FleetScreen;
