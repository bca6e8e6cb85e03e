pub mod analysis;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod upload;

pub use error::{Error, Result};
