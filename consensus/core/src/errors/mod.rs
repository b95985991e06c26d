pub mod address;
pub mod checkpoints;
pub mod genesis;
