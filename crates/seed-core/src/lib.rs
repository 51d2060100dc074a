pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod paths;
pub mod pulse;
pub mod registry;
pub mod status;
pub mod verify;

#[cfg(test)]
mod testutil;

pub use error::{Result, SeedError};
