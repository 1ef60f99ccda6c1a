// Configuration and local persistence
pub mod archive;
pub mod audit;
pub mod config;

// Platform seam
pub mod discord;
pub mod permissions;
pub mod platform;

// Application layer
pub mod commands;

pub use commands::{dispatch, CommandContext};
pub use config::Config;
