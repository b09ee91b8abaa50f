// Library root: re-exports all modules so the CLI and integration tests can
// reach the crate's public API.

pub mod bullpen;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod park_factor;
pub mod store;
pub mod teams;
