pub mod address;
pub mod checkpoints;
pub mod config;
pub mod errors;
pub mod genesis;
