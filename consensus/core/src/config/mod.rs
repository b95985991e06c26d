pub mod checkpoints;
pub mod constants;
