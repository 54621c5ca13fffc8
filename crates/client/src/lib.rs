//! SchoolDesk REST client.
//!
//! Typed wrappers for the school API endpoints, environment-driven
//! configuration, at-most-once transition tracking and dashboard boards that
//! keep server-confirmed snapshots with their aggregates.

pub mod api;
pub mod boards;
pub mod config;
pub mod error;
pub mod in_flight;
