pub mod args;
pub mod components;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod node;
pub mod version;
