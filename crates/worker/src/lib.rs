//! SchoolDesk dashboard worker: configuration and the periodic refresh loop.

pub mod config;
pub mod refresh;
